use perch_models::Client;

use crate::config::Configuration;
use crate::error::PerchResult;
use crate::registry::ConnectionRegistry;

pub type DBPool = sqlx::PgPool;

/// Shared application state, cloned into every handler and every live
/// gateway connection.
#[derive(Clone)]
pub struct PerchState {
    pub config: Configuration,
    pub db_pool: DBPool,
    pub client: Client,
    pub registry: ConnectionRegistry,
}

impl PerchState {
    pub async fn new(config: Configuration) -> PerchResult<Self> {
        debug!("grabbing database pool for application state");
        let db_pool = config.db_conn().await?;
        Ok(Self {
            client: Client::new(db_pool.clone()),
            registry: ConnectionRegistry::new(),
            config,
            db_pool,
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn get_db_pool(&self) -> DBPool {
        self.db_pool.clone()
    }

    pub fn get_db_client(&self) -> Client {
        self.client.clone()
    }
}
