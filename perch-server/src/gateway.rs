use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Router;
use axum_extra::routing::{RouterExt, TypedPath};
use futures_util::{SinkExt, StreamExt};
use perch_core::auth::{self, Identity};
use perch_core::error::{PerchError, PerchResult};
use perch_core::protocol::{ClientEvent, ErrorCode, MessageBody, ServerEvent};
use perch_core::state::PerchState;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(TypedPath, Deserialize)]
#[typed_path("/gateway")]
pub struct PathGateway {}

#[derive(Deserialize)]
pub struct GatewayQuery {
    /// Browsers cannot attach an Authorization header to a websocket
    /// connect, so the credential may arrive as a query parameter too.
    pub token: Option<String>,
}

pub fn setup_gateway(r: Router<PerchState>) -> Router<PerchState> {
    r.typed_get(gateway_ws)
}

/// Handshake: the credential is verified before the protocol upgrade, so
/// a rejected connection never reaches the event phase and never joins
/// the registry.
pub async fn gateway_ws(
    _: PathGateway,
    State(state): State<PerchState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> PerchResult<Response> {
    let token = auth::bearer_token(&headers)
        .or(query.token)
        .ok_or(PerchError::Unauthorized)?;
    let mut client = state.get_db_client();
    let identity = auth::verify_token(&mut client, &token).await?;
    info!(
        "gateway connect: user {} ({})",
        identity.id, identity.username
    );
    Ok(ws
        .on_upgrade(move |socket| run_connection(state, identity, socket))
        .into_response())
}

/// One task per connection. Inbound events are handled in arrival order;
/// everything addressed to this user funnels through the registry channel
/// and leaves through the sink here.
async fn run_connection(state: PerchState, identity: Identity, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let connection = Uuid::new_v4();
    state.registry.join(identity.id, connection, tx.clone()).await;

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_frame(&state, &identity, &tx, &text).await;
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if sink.send(WsMessage::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary and pong frames carry nothing for us
                Some(Err(e)) => {
                    debug!("gateway transport error for user {}: {}", identity.id, e);
                    break;
                }
            },
            outbound = rx.recv() => match outbound {
                Some(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sink.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("could not serialize gateway event: {}", e),
                },
                None => break,
            }
        }
    }

    state.registry.leave(identity.id, connection).await;
    debug!(
        "gateway disconnect: user {} dropped connection {}",
        identity.id, connection
    );
}

async fn handle_frame(
    state: &PerchState,
    identity: &Identity,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    text: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            debug!("unparseable frame from user {}: {}", identity.id, e);
            let _ = tx.send(ServerEvent::Error {
                code: ErrorCode::Validation,
                message: "could not parse event".to_string(),
                client_ref: None,
            });
            return;
        }
    };
    match event {
        ClientEvent::SendMessage {
            recipient_id,
            content,
            client_ref,
        } => handle_send(state, identity, tx, recipient_id, &content, client_ref).await,
    }
}

/// The send pipeline: persist first, emit only after everything is
/// durable. A failure anywhere aborts the whole send, nothing is
/// emitted, and the issuing connection gets an error event instead.
async fn handle_send(
    state: &PerchState,
    identity: &Identity,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    recipient_id: i64,
    content: &str,
    client_ref: Option<String>,
) {
    let mut client = state.get_db_client();
    let message =
        match crate::chat::persist_message(&mut client, identity.id, recipient_id, content).await {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "send from user {} to user {} failed: {}",
                    identity.id, recipient_id, e
                );
                let _ = tx.send(send_failure(&e, client_ref));
                return;
            }
        };

    let body = MessageBody::from(&message);
    // every open tab of either party sees the message; the sender's
    // copies carry the correlation ref so optimistic entries reconcile
    state
        .registry
        .emit_to_user(
            identity.id,
            ServerEvent::NewMessage {
                message: body.clone(),
                own: true,
                client_ref: client_ref.clone(),
            },
        )
        .await;
    state
        .registry
        .emit_to_user(
            recipient_id,
            ServerEvent::NewMessage {
                message: body,
                own: false,
                client_ref: None,
            },
        )
        .await;
    let _ = tx.send(ServerEvent::Ack {
        client_ref,
        message_id: message.id,
    });
}

fn send_failure(error: &PerchError, client_ref: Option<String>) -> ServerEvent {
    let status = error.status();
    let code = if status == axum::http::StatusCode::BAD_REQUEST {
        ErrorCode::Validation
    } else if status == axum::http::StatusCode::FORBIDDEN {
        ErrorCode::Forbidden
    } else if status == axum::http::StatusCode::NOT_FOUND {
        ErrorCode::NotFound
    } else {
        ErrorCode::Internal
    };
    let message = match code {
        // internals never leak over the wire
        ErrorCode::Internal => "internal error".to_string(),
        _ => error.to_string(),
    };
    ServerEvent::Error {
        code,
        message,
        client_ref,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use perch_models::PerchModelError;

    #[test]
    fn validation_failures_reach_the_sender_with_their_ref() {
        let event = send_failure(
            &PerchError::Validation("message content must not be empty".to_string()),
            Some("ref-9".to_string()),
        );
        match event {
            ServerEvent::Error {
                code, client_ref, ..
            } => {
                assert_eq!(code, ErrorCode::Validation);
                assert_eq!(client_ref, Some("ref-9".to_string()));
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[test]
    fn persistence_failures_are_masked_as_internal() {
        let event = send_failure(
            &PerchError::Database(PerchModelError::Other("pool exhausted".to_string())),
            None,
        );
        match event {
            ServerEvent::Error { code, message, .. } => {
                assert_eq!(code, ErrorCode::Internal);
                assert_eq!(message, "internal error");
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[test]
    fn unknown_recipient_maps_to_not_found() {
        let event = send_failure(&PerchError::NotFound("user".to_string()), None);
        match event {
            ServerEvent::Error { code, .. } => assert_eq!(code, ErrorCode::NotFound),
            other => panic!("expected error event, got {:?}", other),
        }
    }
}
