//! Chat API.

use std::sync::Arc;

use crate::client::ChatwireClient;
use crate::error::{Result, StreamError};
use crate::stream::{ChatStream, TokenMapper};
use crate::types::{ChatChunk, ChatRequest, ChatResponse};

/// Chat API client.
pub struct ChatApi {
    client: ChatwireClient,
}

impl ChatApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// Send a chat request and get the full response.
    pub async fn send(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        request.stream = false;
        self.client.pipeline().post("chat/completions", &request).await
    }

    /// Send a message with just text (convenience method).
    pub async fn message(&self, text: impl Into<String>) -> Result<ChatResponse> {
        self.send(ChatRequest::new(text)).await
    }

    /// Stream a chat response.
    ///
    /// Each item is the raw `data` payload of one event, in wire order.
    pub async fn stream(&self, mut request: ChatRequest) -> Result<ChatStream> {
        request.stream = true;
        self.client
            .pipeline()
            .post_stream("chat/completions", &request, None)
            .await
    }

    /// Stream a chat response as decoded text deltas.
    pub async fn stream_content(&self, mut request: ChatRequest) -> Result<ChatStream> {
        request.stream = true;
        self.client
            .pipeline()
            .post_stream("chat/completions", &request, Some(content_mapper()))
            .await
    }

    /// Stream text for a single message (convenience method).
    pub async fn stream_message(&self, text: impl Into<String>) -> Result<ChatStream> {
        self.stream_content(ChatRequest::new(text)).await
    }
}

/// Mapper decoding [`ChatChunk`] payloads into their text.
///
/// Chunks without text (role announcements, usage trailers) are skipped.
pub fn content_mapper() -> TokenMapper {
    Arc::new(|data: String| {
        let chunk: ChatChunk = serde_json::from_str(&data).map_err(|e| {
            StreamError::InvalidFormat(format!("chunk is not valid JSON: {}", e))
        })?;
        Ok(chunk.text())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_mapper() {
        let mapper = content_mapper();
        assert_eq!(
            mapper(r#"{"content": "Hello"}"#.to_string()).unwrap().as_deref(),
            Some("Hello")
        );
        assert_eq!(mapper(r#"{"usage": {}}"#.to_string()).unwrap(), None);
        assert!(matches!(
            mapper("not json".to_string()),
            Err(StreamError::InvalidFormat(_))
        ));
    }
}
