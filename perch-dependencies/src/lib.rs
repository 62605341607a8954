/*
 * This crate pins the third-party stack for the whole workspace.
 * Members import shared dependencies through here so version bumps
 * happen in exactly one place.
 */

pub use async_trait;
pub use axum;
pub use axum_extra;
pub use base64;
pub use chrono;
pub use futures_util;
pub use headers;
pub use hex;
pub use http;
pub use mime;
pub use moka;
pub use once_cell;
pub use rand;
pub use reqwest;
pub use securefmt;
pub use serde;
pub use serde_json;
pub use sqlx;
pub use thiserror;
pub use tokio;
pub use tokio_tungstenite;
pub use tower;
pub use tracing;
pub use url;
pub use uuid;
