use perch_core::config::Configuration;
use perch_core::error::{PerchError, PerchResult};
use perch_dependencies::chrono::{self, Duration};
use perch_models::{Client, User, UserToken};
use rand::RngCore;

/// Mints an opaque chat credential for a user and prints the hex form a
/// client presents at connect time. Credential issuance normally lives in
/// the auth subsystem; this exists for deployments and testing.
pub async fn mint_token(config: Configuration, user_id: i64, days: Option<i64>) -> PerchResult<()> {
    let db_conn = config.db_conn().await?;
    let mut client = Client::new(db_conn);

    let user = User::get_id(&mut client, user_id)
        .await?
        .ok_or_else(|| PerchError::NotFound("user".to_string()))?;

    let mut token = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut token);

    let expires_at = days.map(|days| chrono::Utc::now().naive_utc() + Duration::days(days));
    let user_token = UserToken::create_chat_token(&mut client, user.id(), &token, expires_at).await?;

    info!(
        "minted chat credential {} for user {} ({})",
        user_token.id,
        user.id(),
        user.displayname()
    );
    match expires_at {
        Some(expires_at) => println!("# expires {}", expires_at),
        None => println!("# never expires"),
    }
    println!("{}", hex::encode(token));
    Ok(())
}
