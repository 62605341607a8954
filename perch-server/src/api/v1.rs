use axum::routing::get;
use axum::Router;
use axum_extra::routing::{RouterExt, TypedPath};
use perch_core::state::PerchState;

pub mod conversations;

pub fn setup_api_v1(r: Router<PerchState>) -> Router<PerchState> {
    r.typed_get(conversations::list_conversations).route(
        conversations::PathConversationMessages::PATH,
        get(conversations::list_messages).post(conversations::send_message),
    )
}
