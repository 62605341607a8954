/*
 * Links the SQL tables to their models and re-exports them for ease of use.
 */

mod conversation;
pub use conversation::*;
mod message;
pub use message::*;
mod user;
pub use user::*;
mod user_token;
pub use user_token::*;
