use perch_core::config::Configuration;
use perch_core::error::PerchResult;
use perch_models::{Client, User};

pub async fn list_users(config: Configuration, limit: Option<u64>) -> PerchResult<()> {
    let db_conn = config.db_conn().await?;
    let mut client = Client::new(db_conn);
    let users = User::get_all(&mut client, None, limit).await?;
    println!("{:>8}  {:<24}  {:<32}  {}", "id", "name", "email", "role");
    for user in users {
        println!(
            "{:>8}  {:<24}  {:<32}  {}",
            user.id, user.name, user.email, user.role
        );
    }
    Ok(())
}
