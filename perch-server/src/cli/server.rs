use axum::Router;
use perch_core::config::Configuration;
use perch_core::error::PerchResult;
use perch_core::state::{DBPool, PerchState};

pub async fn run_migrations(_config: &Configuration, db_conn: DBPool) -> PerchResult<()> {
    info!("Migrating database");
    sqlx::migrate!("../migrations").run(&db_conn).await?;
    info!("Database migrated!");
    Ok(())
}

pub fn setup_all_routes(router: Router<PerchState>) -> Router<PerchState> {
    let router = crate::api::v1::setup_api_v1(router);
    let router = crate::gateway::setup_gateway(router);

    router
}

pub async fn axum_setup(state: PerchState) -> PerchResult<Router> {
    let router = Router::new();

    let router = setup_all_routes(router);

    Ok(router.with_state(state))
}

pub async fn migrate_only(config: Configuration) -> PerchResult<()> {
    let db_conn = config.db_conn().await?;
    run_migrations(&config, db_conn).await
}

pub async fn server_start(config: Configuration) -> PerchResult<()> {
    info!("Starting with config {:?}", config);
    let state = PerchState::new(config).await?;
    run_migrations(state.config(), state.get_db_pool()).await?;
    debug!("Configuring application server");

    let axum = axum_setup(state.clone()).await?;

    let server = axum.into_make_service();
    let server = axum::Server::bind(&state.config.bind_to).serve(server);
    info!("Chat gateway listening on {}", state.config.bind_to);
    match server.await {
        Ok(()) => error!("server exited cleanly but unexpectedly"),
        Err(e) => error!("server error exit: {:?}", e),
    }
    println!("Perch exited.");
    Ok(())
}

#[cfg(test)]
mod test {
    use axum::Router;
    use perch_core::state::PerchState;

    #[test]
    fn verify_routes_build() {
        let router: Router<PerchState> = Router::new();

        super::setup_all_routes(router);
    }
}
