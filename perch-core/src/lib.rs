#[macro_use]
extern crate tracing;

pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod state;

pub fn package_full() -> String {
    format!("{} v{}", package_name(), package_version())
}

pub const fn package_name() -> &'static str {
    const NAME: &str = env!("CARGO_PKG_NAME");
    NAME
}

pub const fn package_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    VERSION
}
