#[macro_use]
extern crate tracing;

use perch_core::config::Configuration;
use perch_core::error::PerchResult;
use perch_core::{package_full, package_name, package_version};

mod api;
mod chat;
mod cli;
mod gateway;
mod init;


fn main() -> PerchResult<()> {
    crate::init::logging();
    use tokio::runtime::Builder;
    let runtime = Builder::new_multi_thread()
        .worker_threads(8)
        .thread_name_fn(|| {
            use std::sync::atomic::{AtomicUsize, Ordering};
            static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
            let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
            format!("perch-{}", id)
        })
        .enable_all()
        .build()
        .unwrap();

    use clap::{Arg, Command};
    let app = Command::new(package_name())
        .version(package_version())
        .about("Perch marketplace chat service")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("server").about("starts the chat gateway and REST API"))
        .subcommand(Command::new("migrate").about("run pending database migrations and exit"))
        .subcommand(
            Command::new("mint-token")
                .about("mint a chat credential for a user, printing it to stdout")
                .arg(
                    Arg::new("user")
                        .short('u')
                        .long("user")
                        .required(true)
                        .takes_value(true)
                        .value_name("USER_ID")
                        .help("id of the user the credential belongs to"),
                )
                .arg(
                    Arg::new("days")
                        .short('d')
                        .long("days")
                        .takes_value(true)
                        .value_name("DAYS")
                        .help("validity in days; the credential never expires if omitted"),
                ),
        )
        .subcommand(
            Command::new("list-users").about("list users in the database").arg(
                Arg::new("limit")
                    .short('l')
                    .long("limit")
                    .takes_value(true)
                    .value_name("N")
                    .help("how many users to print, 25 if omitted"),
            ),
        );

    let matches = app.get_matches();

    if matches.subcommand_matches("server").is_some() {
        info!("Starting {}", package_full());
        let config = Configuration::from_env()?;
        runtime.block_on(async move {
            tokio::spawn(async move { crate::cli::server::server_start(config).await }).await
        })??;
        runtime.shutdown_timeout(std::time::Duration::from_secs(10));
        Ok(())
    } else if matches.subcommand_matches("migrate").is_some() {
        let config = Configuration::from_env()?;
        runtime.block_on(async move { crate::cli::server::migrate_only(config).await })?;
        Ok(())
    } else if let Some(matches) = matches.subcommand_matches("mint-token") {
        let config = Configuration::from_env()?;
        let user = matches
            .value_of("user")
            .expect("must have user id")
            .parse::<i64>()
            .map_err(|e| perch_core::error::PerchError::Validation(e.to_string()))?;
        let days = matches
            .value_of("days")
            .map(|d| d.parse::<i64>())
            .transpose()
            .map_err(|e| perch_core::error::PerchError::Validation(e.to_string()))?;
        runtime.block_on(async move { crate::cli::mint_token::mint_token(config, user, days).await })?;
        Ok(())
    } else if let Some(matches) = matches.subcommand_matches("list-users") {
        let config = Configuration::from_env()?;
        let limit = matches
            .value_of("limit")
            .map(|l| l.parse::<u64>())
            .transpose()
            .map_err(|e| perch_core::error::PerchError::Validation(e.to_string()))?;
        runtime.block_on(async move { crate::cli::list_users::list_users(config, limit).await })?;
        Ok(())
    } else {
        error!("No subcommand specified, please tell me what to do or use --help");
        Ok(())
    }
}
