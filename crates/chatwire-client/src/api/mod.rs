//! API endpoint implementations.

mod account;
mod auth;
mod chat;
mod conversations;
mod files;
mod health;
mod models;

pub use account::AccountApi;
pub use auth::AuthApi;
pub use chat::{ChatApi, content_mapper};
pub use conversations::{ConversationsApi, ListConversationsQuery};
pub use files::{FilesApi, MAX_UPLOAD_BYTES};
pub use health::HealthApi;
pub use models::ModelsApi;
