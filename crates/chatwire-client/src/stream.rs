//! Streaming chat responses.
//!
//! A [`StreamAssembler`] turns raw body chunks into tokens, one per SSE
//! `data` payload, stopping at the `[DONE]` sentinel. A [`ChatStream`] runs an
//! assembler on a spawned task that reads the transport body and forwards
//! tokens over a bounded channel: when the consumer falls behind, the task
//! stops polling the body, so nothing is dropped.
//!
//! Session lifecycle: `Idle -> Streaming -> {Completed | Failed | Cancelled}`.
//! Terminal states are final; whichever happens first wins.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, StreamError};
use crate::sse::{self, FrameBuffer};
use crate::transport::ByteStream;

/// Default number of tokens buffered between the reader task and the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default cap on bytes held while waiting for a frame to complete (1 MiB).
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// Maps an event's `data` payload to an output token. `Ok(None)` skips it.
pub type TokenMapper =
    Arc<dyn Fn(String) -> std::result::Result<Option<String>, StreamError> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of one streaming exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembler
// ─────────────────────────────────────────────────────────────────────────────

/// Tokens produced by one call into the assembler.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Feed {
    pub tokens: Vec<String>,
    /// The sentinel was seen; nothing further will be produced.
    pub done: bool,
}

/// Incremental SSE-to-token decoder.
///
/// Keeps only the bytes after the last complete frame, so each byte is parsed
/// once regardless of how the body is chunked.
pub struct StreamAssembler {
    frames: FrameBuffer,
    max_buffer: usize,
    mapper: Option<TokenMapper>,
    done: bool,
}

impl StreamAssembler {
    pub fn new(max_buffer: usize) -> Self {
        Self {
            frames: FrameBuffer::new(),
            max_buffer,
            mapper: None,
            done: false,
        }
    }

    pub fn with_mapper(mut self, mapper: TokenMapper) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one body chunk.
    pub fn push(&mut self, chunk: &[u8]) -> std::result::Result<Feed, StreamError> {
        let mut feed = Feed {
            done: self.done,
            ..Default::default()
        };
        if self.done {
            return Ok(feed);
        }

        self.frames.push(chunk);
        if let Some(complete) = self.frames.take_complete() {
            self.collect(&complete, &mut feed)?;
        }

        if !self.done && self.frames.len() > self.max_buffer {
            return Err(StreamError::BufferOverflow {
                limit: self.max_buffer,
            });
        }
        Ok(feed)
    }

    /// The body ended; decode whatever is left.
    ///
    /// A trailing event without a closing blank line is still delivered, but
    /// a final line cut off before its newline is an incomplete message.
    pub fn finish(&mut self) -> std::result::Result<Feed, StreamError> {
        let mut feed = Feed {
            done: self.done,
            ..Default::default()
        };
        let rest = self.frames.take_remaining();
        if self.done || rest.iter().all(u8::is_ascii_whitespace) {
            return Ok(feed);
        }
        if !rest.ends_with(b"\n") {
            return Err(StreamError::IncompleteMessage);
        }
        self.collect(&rest, &mut feed)?;
        Ok(feed)
    }

    fn collect(&mut self, bytes: &[u8], feed: &mut Feed) -> std::result::Result<(), StreamError> {
        for event in sse::parse_events(bytes)? {
            if event.is_done() {
                self.done = true;
                feed.done = true;
                break;
            }
            if event.data.is_empty() {
                continue;
            }
            let token = match &self.mapper {
                Some(mapper) => mapper(event.data)?,
                None => Some(event.data),
            };
            feed.tokens.extend(token);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for a streaming session.
#[derive(Clone)]
pub struct StreamConfig {
    pub channel_capacity: usize,
    pub max_buffer: usize,
    pub mapper: Option<TokenMapper>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_buffer: DEFAULT_MAX_BUFFER,
            mapper: None,
        }
    }
}

impl std::fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConfig")
            .field("channel_capacity", &self.channel_capacity)
            .field("max_buffer", &self.max_buffer)
            .field("mapper", &self.mapper.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct Session {
    state: Mutex<StreamState>,
    cancel: CancellationToken,
}

impl Session {
    /// Move to `next` unless already terminal. Returns whether it moved.
    fn transition(&self, next: StreamState) -> bool {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        tracing::trace!(from = ?*state, to = ?next, "Stream state change");
        *state = next;
        true
    }

    fn state(&self) -> StreamState {
        *self.state.lock()
    }
}

/// Ordered, cancellable sequence of tokens from one streaming response.
///
/// Yields `Ok(token)` items in wire order. A failure is delivered as the final
/// `Err` item. Dropping the stream, or calling [`ChatStream::cancel`], stops
/// the reader task and drops the transport body.
pub struct ChatStream {
    rx: ReceiverStream<Result<String>>,
    session: Arc<Session>,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

impl ChatStream {
    /// Start consuming `body` on a new task.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(body: ByteStream, config: StreamConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        let session = Arc::new(Session {
            state: Mutex::new(StreamState::Idle),
            cancel: CancellationToken::new(),
        });
        session.transition(StreamState::Streaming);

        let mut assembler = StreamAssembler::new(config.max_buffer);
        if let Some(mapper) = config.mapper {
            assembler = assembler.with_mapper(mapper);
        }

        let task = tokio::spawn(run_session(body, assembler, tx, Arc::clone(&session)));

        Self {
            rx: ReceiverStream::new(rx),
            session,
            task: Some(task),
            finished: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.session.state()
    }

    /// Stop the stream. No further tokens are delivered.
    ///
    /// A no-op once the stream has reached a terminal state.
    pub fn cancel(&mut self) {
        if self.session.transition(StreamState::Cancelled) {
            tracing::debug!("Stream cancelled by consumer");
        }
        self.session.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
        self.finished = true;
    }

    /// Drain the stream into one string, returning the first error.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(token) = self.next().await {
            text.push_str(&token?);
        }
        Ok(text)
    }
}

impl Stream for ChatStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.rx).poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                self.finished = true;
                // The reader always reaches a terminal state before dropping
                // its sender; still streaming means it died.
                if self.session.transition(StreamState::Failed) {
                    return Poll::Ready(Some(Err(StreamError::ClosedUnexpectedly.into())));
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.session.transition(StreamState::Cancelled);
        self.session.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn run_session(
    mut body: ByteStream,
    mut assembler: StreamAssembler,
    tx: mpsc::Sender<Result<String>>,
    session: Arc<Session>,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => {
                session.transition(StreamState::Cancelled);
                return;
            }
            next = body.next() => next,
        };

        let (feed, ended) = match next {
            Some(Ok(chunk)) => (assembler.push(&chunk), false),
            Some(Err(e)) => (Err(StreamError::from(e)), true),
            None => (assembler.finish(), true),
        };

        let feed = match feed {
            Ok(feed) => feed,
            Err(e) => {
                fail(&tx, &session, e).await;
                return;
            }
        };

        for token in feed.tokens {
            if !deliver(&tx, &session, Ok(token)).await {
                return;
            }
        }

        if feed.done || ended {
            if session.transition(StreamState::Completed) {
                tracing::debug!(sentinel = feed.done, "Stream completed");
            }
            return;
        }
    }
}

/// Send one item, giving up if the consumer cancels or goes away.
async fn deliver(tx: &mpsc::Sender<Result<String>>, session: &Session, item: Result<String>) -> bool {
    let sent = tokio::select! {
        biased;
        _ = session.cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    };
    if !sent {
        session.transition(StreamState::Cancelled);
    }
    sent
}

async fn fail(tx: &mpsc::Sender<Result<String>>, session: &Session, error: StreamError) {
    if session.transition(StreamState::Failed) {
        tracing::warn!(error = %error, "Stream failed");
        // Receiver may already be gone; nothing else to tell.
        let _ = tx.send(Err(Error::Stream(error))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use bytes::Bytes;
    use std::time::Duration;

    const CHAT_STREAM: &str = "event: message\ndata: {\"content\": \"Hello\"}\n\nevent: message\ndata: {\"content\": \" World\"}\n\ndata: [DONE]\n\n";

    fn tokens_for_chunks(chunks: &[&[u8]]) -> (Vec<String>, bool) {
        let mut assembler = StreamAssembler::new(DEFAULT_MAX_BUFFER);
        let mut tokens = Vec::new();
        let mut done = false;
        for chunk in chunks {
            let feed = assembler.push(chunk).unwrap();
            tokens.extend(feed.tokens);
            done |= feed.done;
        }
        let feed = assembler.finish().unwrap();
        tokens.extend(feed.tokens);
        (tokens, done || feed.done)
    }

    #[test]
    fn test_assembler_stops_at_sentinel() {
        let (tokens, done) = tokens_for_chunks(&[CHAT_STREAM.as_bytes()]);
        assert_eq!(
            tokens,
            vec![
                r#"{"content": "Hello"}"#.to_string(),
                r#"{"content": " World"}"#.to_string()
            ]
        );
        assert!(done);
    }

    #[test]
    fn test_chunk_boundaries_do_not_change_tokens() {
        let input = format!(
            "{}{}",
            "data: caf\u{e9}\r\n\r\n: ping\n\ndata: a\ndata: b\n\n",
            CHAT_STREAM
        );
        let bytes = input.as_bytes();
        let (expected, _) = tokens_for_chunks(&[bytes]);
        assert_eq!(expected.len(), 4);

        for split in 0..=bytes.len() {
            let (left, right) = bytes.split_at(split);
            assert_eq!(tokens_for_chunks(&[left, right]).0, expected, "split at {}", split);
        }

        let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(tokens_for_chunks(&single_bytes).0, expected);

        let odd_chunks: Vec<&[u8]> = bytes.chunks(7).collect();
        assert_eq!(tokens_for_chunks(&odd_chunks).0, expected);
    }

    #[test]
    fn test_bytes_after_sentinel_are_ignored() {
        let mut assembler = StreamAssembler::new(DEFAULT_MAX_BUFFER);
        let feed = assembler.push(b"data: [DONE]\n\ndata: late\n\n").unwrap();
        assert!(feed.done);
        assert!(feed.tokens.is_empty());

        let feed = assembler.push(b"data: later\n\n").unwrap();
        assert!(feed.done);
        assert!(feed.tokens.is_empty());
    }

    #[test]
    fn test_trailing_event_without_blank_line_is_delivered() {
        let (tokens, done) = tokens_for_chunks(&[b"data: one\n\ndata: two\n"]);
        assert_eq!(tokens, vec!["one", "two"]);
        assert!(!done);
    }

    #[test]
    fn test_truncated_final_line_is_incomplete() {
        let mut assembler = StreamAssembler::new(DEFAULT_MAX_BUFFER);
        assembler.push(b"data: one\n\ndata: tw").unwrap();
        assert_eq!(
            assembler.finish().unwrap_err(),
            StreamError::IncompleteMessage
        );
    }

    #[test]
    fn test_buffer_overflow() {
        let mut assembler = StreamAssembler::new(16);
        let err = assembler.push(b"data: this line never ends").unwrap_err();
        assert_eq!(err, StreamError::BufferOverflow { limit: 16 });
    }

    #[test]
    fn test_mapper_transforms_and_skips() {
        let mapper: TokenMapper = Arc::new(|data: String| {
            if data == "skip" {
                Ok(None)
            } else {
                Ok(Some(data.to_uppercase()))
            }
        });
        let mut assembler = StreamAssembler::new(DEFAULT_MAX_BUFFER).with_mapper(mapper);
        let feed = assembler.push(b"data: a\n\ndata: skip\n\ndata: b\n\n").unwrap();
        assert_eq!(feed.tokens, vec!["A", "B"]);
    }

    // ── ChatStream ────────────────────────────────────────────────────────

    type BodySender = mpsc::Sender<std::result::Result<Bytes, NetworkError>>;

    fn channel_body(capacity: usize) -> (BodySender, ByteStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Box::pin(ReceiverStream::new(rx)))
    }

    fn event(data: &str) -> std::result::Result<Bytes, NetworkError> {
        Ok(Bytes::from(format!("data: {}\n\n", data)))
    }

    #[tokio::test]
    async fn test_stream_delivers_tokens_then_completes() {
        let (tx, body) = channel_body(8);
        let mut stream = ChatStream::spawn(body, StreamConfig::default());
        assert_eq!(stream.state(), StreamState::Streaming);

        tx.send(Ok(Bytes::from_static(CHAT_STREAM.as_bytes())))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, r#"{"content": "Hello"}"#);
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second, r#"{"content": " World"}"#);
        assert!(stream.next().await.is_none());
        assert_eq!(stream.state(), StreamState::Completed);

        // Sentinel closes the session even though the sender is still open.
        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transport_end_without_sentinel_completes() {
        let (tx, body) = channel_body(8);
        let stream = ChatStream::spawn(body, StreamConfig::default());
        tx.send(event("only")).await.unwrap();
        drop(tx);

        assert_eq!(stream.collect_text().await.unwrap(), "only");
    }

    #[tokio::test]
    async fn test_cancel_after_two_tokens_stops_transport() {
        let (tx, body) = channel_body(8);
        let mut stream = ChatStream::spawn(
            body,
            StreamConfig {
                channel_capacity: 1,
                ..Default::default()
            },
        );

        for i in 0..2 {
            tx.send(event(&format!("t{}", i))).await.unwrap();
        }
        assert_eq!(stream.next().await.unwrap().unwrap(), "t0");
        assert_eq!(stream.next().await.unwrap().unwrap(), "t1");

        stream.cancel();
        assert_eq!(stream.state(), StreamState::Cancelled);

        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .expect("transport body should be dropped after cancel");
        for i in 2..5 {
            assert!(tx.send(event(&format!("t{}", i))).await.is_err());
        }
        assert!(stream.next().await.is_none());

        // Idempotent.
        stream.cancel();
        assert_eq!(stream.state(), StreamState::Cancelled);
    }

    #[tokio::test]
    async fn test_drop_cancels_transport() {
        let (tx, body) = channel_body(8);
        let stream = ChatStream::spawn(body, StreamConfig::default());
        drop(stream);

        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let (tx, body) = channel_body(8);
        let mut stream = ChatStream::spawn(body, StreamConfig::default());
        tx.send(event("[DONE]")).await.unwrap();

        assert!(stream.next().await.is_none());
        stream.cancel();
        assert_eq!(stream.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_backpressure_preserves_order() {
        let (tx, body) = channel_body(1);
        let stream = ChatStream::spawn(
            body,
            StreamConfig {
                channel_capacity: 1,
                ..Default::default()
            },
        );

        let producer = tokio::spawn(async move {
            for i in 0..50 {
                tx.send(event(&i.to_string())).await.unwrap();
            }
            tx.send(event("[DONE]")).await.unwrap();
        });

        let tokens: Vec<String> = stream.map(|t| t.unwrap()).collect().await;
        producer.await.unwrap();

        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(tokens, expected);
    }

    #[tokio::test]
    async fn test_transport_error_is_terminal_item() {
        let (tx, body) = channel_body(8);
        let mut stream = ChatStream::spawn(body, StreamConfig::default());
        tx.send(event("partial")).await.unwrap();
        tx.send(Err(NetworkError::ConnectionFailed("reset".to_string())))
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::ConnectionLost(_))));
        assert!(stream.next().await.is_none());
        assert_eq!(stream.state(), StreamState::Failed);
    }

    #[tokio::test]
    async fn test_transport_timeout_maps_to_stream_timeout() {
        let (tx, body) = channel_body(8);
        let mut stream = ChatStream::spawn(body, StreamConfig::default());
        tx.send(Err(NetworkError::Timeout)).await.unwrap();

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Stream(StreamError::TimedOut)));
    }
}
