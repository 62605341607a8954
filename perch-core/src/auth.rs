use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use perch_models::{Client, User, UserToken};

use crate::error::{PerchError, PerchResult};
use crate::state::PerchState;

/// The authenticated party behind a request or gateway connection, as
/// yielded by the credential verifier. The id is the only part the chat
/// core reasons about; name and role travel along for consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.name.clone(),
            role: user.role.clone(),
        }
    }
}

/// Pulls the bearer credential out of an Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Validates an opaque bearer credential and resolves the identity it
/// belongs to. Pure validation, no side effects; a connection or request
/// is either admitted on the spot or refused on the spot.
pub async fn verify_token(client: &mut Client, raw: &str) -> PerchResult<Identity> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PerchError::Unauthorized);
    }
    let bytes = hex::decode(raw).map_err(|_| PerchError::InvalidCredential)?;
    let token = UserToken::get_token_for_chat(client, &bytes)
        .await?
        .ok_or(PerchError::InvalidCredential)?;
    if token.expired() {
        debug!("rejecting expired credential for user {}", token.user_id);
        return Err(PerchError::InvalidCredential);
    }
    let user = User::get_id(client, token.user_id)
        .await?
        .ok_or(PerchError::InvalidCredential)?;
    Ok(Identity::from(&user))
}

/// Extractor for REST handlers: resolves the caller from the bearer
/// credential or refuses the request with 401.
pub struct ActiveUser(pub Identity);

#[async_trait]
impl FromRequestParts<PerchState> for ActiveUser {
    type Rejection = PerchError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PerchState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(PerchError::Unauthorized)?;
        let mut client = state.get_db_client();
        let identity = verify_token(&mut client, &token).await?;
        Ok(ActiveUser(identity))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(
            bearer_token(&headers_with("Bearer deadbeef")),
            Some("deadbeef".to_string())
        );
    }

    #[test]
    fn lowercase_scheme_is_accepted() {
        assert_eq!(
            bearer_token(&headers_with("bearer deadbeef")),
            Some("deadbeef".to_string())
        );
    }

    #[test]
    fn missing_header_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn wrong_scheme_and_empty_token_yield_none() {
        assert_eq!(bearer_token(&headers_with("Basic Zm9v")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Bearer    ")), None);
    }
}
