//! Typed HTTP client for the chatwire service.
//!
//! # Example
//!
//! ```no_run
//! use chatwire_client::{ChatRequest, ChatwireClient, Result};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<()> {
//! let client = ChatwireClient::builder()
//!     .base_url("https://chat.example.com")
//!     .bearer("access-token", Some("refresh-token".to_string()))
//!     .build()?;
//!
//! // Full response
//! let response = client.chat().message("Hello!").await?;
//! println!("{}", response.content);
//!
//! // Streamed text deltas
//! let mut stream = client
//!     .chat()
//!     .stream_content(ChatRequest::new("Tell me a story"))
//!     .await?;
//! while let Some(token) = stream.next().await {
//!     print!("{}", token?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Layers
//!
//! - [`sse`]: Server-Sent Events frame parsing
//! - [`stream`]: token assembly, the streaming session state machine,
//!   cancellation and backpressure
//! - [`pipeline`]: attaches credentials from the token store, routes to the
//!   typed or streaming decode path
//! - [`transport`]: the HTTP seam, with a `reqwest` implementation
//! - [`api`]: endpoint groups (auth, chat, conversations, models, account,
//!   files, health)

pub mod api;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod refresh;
pub mod sse;
pub mod stream;
pub mod transport;
pub mod types;

pub use api::{ListConversationsQuery, content_mapper};
pub use client::{ChatwireClient, ClientBuilder};
pub use error::{
    ApiError, Error, FileOperationError, NetworkError, Result, StreamError, ValidationError,
};
pub use refresh::ApiRefresher;
pub use sse::{DONE_SENTINEL, SseEvent};
pub use stream::{ChatStream, StreamAssembler, StreamState};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, StreamingResponse, Transport};
pub use types::*;

pub use chatwire_auth::{AuthStatus, Credential, TokenStore};
