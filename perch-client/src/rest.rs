use perch_core::protocol::{ConversationSummary, MessageBody};
use serde::de::DeserializeOwned;

use crate::error::{ChatClientError, ChatClientResult};

/// REST fallback surface, used to populate initial state and as the
/// degraded path when no live gateway connection exists.
pub struct ChatRest {
    http: reqwest::Client,
    base: url::Url,
    token: String,
}

#[derive(serde::Serialize)]
struct NewMessage<'a> {
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ApiError {
    error: String,
}

impl ChatRest {
    /// `base` is the service root, e.g. `http://localhost:8090/`.
    pub fn new(base: url::Url, token: String) -> ChatClientResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_millis(500))
            .timeout(std::time::Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http, base, token })
    }

    pub async fn conversations(&self) -> ChatClientResult<Vec<ConversationSummary>> {
        let url = self.base.join("api/v1/conversations")?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn messages(&self, conversation_id: i64) -> ChatClientResult<Vec<MessageBody>> {
        let url = self
            .base
            .join(&format!("api/v1/conversations/{}/messages", conversation_id))?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Sends without a live connection; the stored message comes back in
    /// the response instead of being pushed.
    pub async fn send_message(
        &self,
        recipient_id: i64,
        content: &str,
    ) -> ChatClientResult<MessageBody> {
        let url = self
            .base
            .join(&format!("api/v1/conversations/{}/messages", recipient_id))?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&NewMessage { content })
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> ChatClientResult<T> {
        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ApiError>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(ChatClientError::Api(message));
        }
        Ok(response.json::<T>().await?)
    }
}
