use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatClientError {
    #[error("Websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Could not parse server payload: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("Could not parse URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Could not build request header: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
    #[error("Server refused the request: {0}")]
    Api(String),
    #[error("The gateway connection is closed")]
    ConnectionClosed,
}

pub type ChatClientResult<T> = std::result::Result<T, ChatClientError>;
