//! Pull-based streams of byte chunks.
//!
//! A [`ByteStream`] is an owned, single-reader handle: whoever holds the value
//! is the only party able to pull from it. Operations that consume part of a
//! stream take it by value and hand back either the same handle or a wrapper
//! around it, so a stream can never be read from two places at once.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::{Blob, Error, Result};

/// Default read size for [`ByteStream::from_reader`] (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Reason passed along when a stream is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CancelReason(String);

impl CancelReason {
    /// Creates a reason from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The reason's message.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CancelReason {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for CancelReason {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Process-unique identity of a [`ByteStream`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    /// Allocates the next identifier.
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A producer of byte chunks behind a [`ByteStream`].
///
/// Implement this to plug a custom transport in with
/// [`ByteStream::from_source`] when cancellation has to reach the transport.
/// For plain [`Stream`]s use [`ByteStream::new`] or
/// [`ByteStream::with_cancel`] instead.
pub trait ChunkSource: Send {
    /// Polls for the next chunk. `Ready(None)` signals end of stream.
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Blob>>>;

    /// Abandons the source. Called at most once, and never after
    /// `poll_chunk` has returned `Ready(None)`.
    fn cancel(&mut self, reason: CancelReason);
}

/// Cancellation hook attached by [`ByteStream::with_cancel`].
type CancelHook = Box<dyn FnOnce(CancelReason) + Send>;

/// Adapts a boxed [`Stream`] to [`ChunkSource`].
struct StreamSource {
    /// Chunks still to be produced.
    inner: BoxStream<'static, Result<Blob>>,
    /// Invoked on cancellation, if set.
    on_cancel: Option<CancelHook>,
}

impl ChunkSource for StreamSource {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Blob>>> {
        self.inner.poll_next_unpin(cx)
    }

    fn cancel(&mut self, reason: CancelReason) {
        self.inner = stream::empty().boxed();
        if let Some(hook) = self.on_cancel.take() {
            hook(reason);
        }
    }
}

/// An owned, pull-based stream of [`Blob`] chunks.
pub struct ByteStream {
    /// Identity of this handle.
    id: StreamId,
    /// Where chunks come from.
    source: Box<dyn ChunkSource>,
    /// Set once the source has reported end of stream.
    done: bool,
}

impl ByteStream {
    /// Wraps a stream of chunks. Cancelling drops the stream.
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Blob>> + Send + 'static,
    {
        Self::from_source(StreamSource {
            inner: chunks.boxed(),
            on_cancel: None,
        })
    }

    /// Wraps a stream of chunks and calls `hook` with the reason if the
    /// stream is cancelled before it ends.
    pub fn with_cancel<S, F>(chunks: S, hook: F) -> Self
    where
        S: Stream<Item = Result<Blob>> + Send + 'static,
        F: FnOnce(CancelReason) + Send + 'static,
    {
        Self::from_source(StreamSource {
            inner: chunks.boxed(),
            on_cancel: Some(Box::new(hook)),
        })
    }

    /// Wraps a custom [`ChunkSource`].
    pub fn from_source(source: impl ChunkSource + 'static) -> Self {
        Self {
            id: StreamId::next(),
            source: Box::new(source),
            done: false,
        }
    }

    /// Creates a stream that yields the given chunks in order.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Blob>,
    {
        let items: Vec<Result<Blob>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
        Self::new(stream::iter(items))
    }

    /// Creates a stream that ends immediately.
    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// Reads `reader` in chunks of at most `chunk_size` bytes until EOF.
    ///
    /// Reads land in one reusable buffer. A read that fills less than half
    /// of it is copied out, so a short chunk never pins a full buffer.
    /// I/O errors surface as [`Error::Io`] items.
    pub fn from_reader<R>(reader: R, chunk_size: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let cap = chunk_size.max(1);
        let limit = u64::try_from(cap).unwrap_or(u64::MAX);
        let state = (reader, BytesMut::new());
        Self::new(stream::try_unfold(state, move |(mut src, mut buf)| async move {
            buf.reserve(cap);
            let n = (&mut src).take(limit).read_buf(&mut buf).await?;
            if n == 0 {
                return Ok::<_, Error>(None);
            }
            let chunk = if n < cap / 2 {
                let copied = Bytes::copy_from_slice(&buf);
                buf.clear();
                copied
            } else {
                buf.split().freeze()
            };
            Ok(Some((Blob::from(chunk), (src, buf))))
        }))
    }

    /// Identity of this handle.
    pub const fn id(&self) -> StreamId {
        self.id
    }

    /// Pulls the next chunk, or `None` once the stream has ended.
    pub async fn read(&mut self) -> Option<Result<Blob>> {
        future::poll_fn(|cx| self.poll_read(cx)).await
    }

    /// Poll form of [`read`](Self::read).
    pub(crate) fn poll_read(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Blob>>> {
        if self.done {
            return Poll::Ready(None);
        }
        let polled = self.source.poll_chunk(cx);
        if matches!(polled, Poll::Ready(None)) {
            trace!(stream = %self.id, "end of stream");
            self.done = true;
        }
        polled
    }

    /// Abandons the stream, forwarding `reason` to its source.
    ///
    /// Does nothing if the stream has already ended.
    pub fn cancel(mut self, reason: impl Into<CancelReason>) {
        if self.done {
            return;
        }
        let cause = reason.into();
        debug!(stream = %self.id, reason = %cause, "cancelling stream");
        self.done = true;
        self.source.cancel(cause);
    }

    /// Reads every remaining chunk and concatenates them.
    pub async fn drain(mut self) -> Result<Blob> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.read().await {
            chunks.push(chunk?);
        }
        Ok(Blob::concat(chunks))
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("id", &self.id)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Stream for ByteStream {
    type Item = Result<Blob>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_read(cx)
    }
}
