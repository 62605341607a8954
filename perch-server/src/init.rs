use tracing_subscriber::EnvFilter;

pub fn logging() {
    better_panic::install();
    let env_loaded = kankyo::load(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if let Err(e) = env_loaded {
        info!("couldn't load .env file: {}, this is probably fine", e);
    }
}
