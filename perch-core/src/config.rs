use std::str::FromStr;

use crate::error::PerchResult;
use crate::state::DBPool;

fn default_bind_to() -> std::net::SocketAddr {
    std::net::SocketAddr::from_str("127.0.0.1:8090").unwrap()
}

fn default_db_pool_size() -> u32 {
    16
}

#[derive(serde::Deserialize, serde::Serialize, Clone, securefmt::Debug)]
pub struct Configuration {
    /// Postgres the chat service stores conversations and messages in;
    /// the users and user_tokens tables are shared with the main
    /// marketplace application.
    #[serde(skip_serializing)]
    #[sensitive]
    pub database_url: url::Url,
    #[serde(default = "default_bind_to")]
    pub bind_to: std::net::SocketAddr,
    #[serde(default = "default_db_pool_size")]
    pub db_pool_size: u32,
    #[serde(skip)]
    #[sensitive]
    pub alt_dbconn: Option<DBPool>,
}

impl Configuration {
    pub fn from_env() -> PerchResult<Self> {
        Ok(envy::from_env::<Self>()?)
    }

    pub async fn db_conn(&self) -> PerchResult<DBPool> {
        if let Some(v) = &self.alt_dbconn {
            return Ok(v.clone());
        }
        let opts = sqlx::postgres::PgConnectOptions::from_str(self.database_url.as_ref())?
            .application_name(&crate::package_full());
        let conn = sqlx::postgres::PgPoolOptions::new()
            .max_connections(self.db_pool_size)
            .connect_with(opts)
            .await?;
        Ok(conn)
    }

    /// Tests hand in their own pool instead of dialing out.
    pub unsafe fn set_alt_dbconn(&mut self, db: DBPool) {
        self.alt_dbconn = Some(db);
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: url::Url::parse("postgres://localhost/perch_dev").unwrap(),
            bind_to: default_bind_to(),
            db_pool_size: default_db_pool_size(),
            alt_dbconn: None,
        }
    }
}
