#[macro_use]
extern crate tracing;

mod models;
pub use models::*;

use perch_dependencies::moka::future::Cache;
use sqlx::{pool::PoolConnection, PgPool, Postgres};

pub type Db = PoolConnection<Postgres>;
pub type ClientRef<'a> = &'a mut Client;

#[derive(thiserror::Error, Debug)]
pub enum PerchModelError {
    #[error("Other error: {}", .0)]
    Other(String),
    #[error("Error in underlying datamodel: {}", .0)]
    SQLx(#[from] sqlx::Error),
    #[error("Could not deserialize row data: {}", .0)]
    SerdeJson(#[from] serde_json::Error),
    #[error("Message content was empty")]
    EmptyMessage,
    #[error("A conversation needs two distinct participants")]
    SelfConversation,
    #[error("{:?}", .0)]
    Context(#[from] anyhow::Error),
}

/// Database client handed to all model operations. Cheap to clone, the
/// user cache is shared between clones so display name lookups during
/// conversation annotation don't hammer the users table.
#[derive(Clone)]
pub struct Client {
    db: PgPool,
    cache_users: Cache<i64, Option<User>>,
}

impl Client {
    pub fn new(db: PgPool) -> Self {
        debug!("creating new database client");
        Self {
            db,
            cache_users: Cache::new(1000),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    pub(crate) async fn cached_user(&self, id: i64) -> Option<Option<User>> {
        self.cache_users.get(&id).await
    }

    pub(crate) async fn cache_user(&self, id: i64, user: Option<User>) {
        self.cache_users.insert(id, user).await;
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("db", &self.db).finish()
    }
}

impl From<PgPool> for Client {
    fn from(p: PgPool) -> Self {
        Client::new(p)
    }
}

impl From<&PgPool> for Client {
    fn from(p: &PgPool) -> Self {
        Client::new(p.clone())
    }
}
