//! Splitting a chunked stream at an exact byte offset.
//!
//! Only as many upstream chunks as needed are pulled. When the offset falls
//! inside a chunk, the chunk's tail is replayed by a continuation stream that
//! then forwards the remaining upstream chunks unmodified.

use std::mem;
use std::task::{Context, Poll};

use tracing::{debug, trace};

use crate::stream::{CancelReason, ChunkSource};
use crate::{Blob, ByteStream, Result};

/// Reads the first `n` bytes of `stream`.
///
/// Returns fewer than `n` bytes if the stream ends first. The remainder is
/// `stream` itself when the split lands on a chunk edge (or the stream ran
/// out), and a [`Continuation`] around it otherwise.
pub(crate) async fn split_stream(mut stream: ByteStream, n: usize) -> Result<(Blob, ByteStream)> {
    let mut chunks = Vec::new();
    let mut remaining = n;
    let mut leftover = None;

    while remaining > 0 {
        let Some(chunk) = stream.read().await.transpose()? else {
            trace!(
                stream = %stream.id(),
                wanted = n,
                short_by = remaining,
                "stream ended before split point"
            );
            break;
        };
        let (head, tail) = chunk.split_at(remaining);
        remaining -= head.len();
        chunks.push(head);
        if !tail.is_empty() {
            leftover = Some(tail);
        }
    }

    trace!(
        stream = %stream.id(),
        chunks = chunks.len(),
        taken = n - remaining,
        "split consumed chunks"
    );
    let taken = Blob::concat(chunks);

    let Some(tail) = leftover else {
        return Ok((taken, stream));
    };

    let rest = ByteStream::from_source(Continuation {
        state: State::Replay(tail, stream),
    });
    debug!(stream = %rest.id(), "split inside a chunk, continuing with leftover");
    Ok((taken, rest))
}

/// Position of a [`Continuation`].
enum State {
    /// The leftover tail has not been emitted yet.
    Replay(Blob, ByteStream),
    /// Upstream chunks are forwarded as-is.
    PassThrough(ByteStream),
    /// Upstream ended or was cancelled and has been released.
    Done,
}

/// Stream remainder that re-emits a partially consumed chunk before
/// resuming the original stream.
struct Continuation {
    /// Current position.
    state: State,
}

impl ChunkSource for Continuation {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Blob>>> {
        match mem::replace(&mut self.state, State::Done) {
            State::Replay(leftover, upstream) => {
                trace!(upstream = %upstream.id(), len = leftover.len(), "replaying leftover");
                self.state = State::PassThrough(upstream);
                Poll::Ready(Some(Ok(leftover)))
            }
            State::PassThrough(mut upstream) => match upstream.poll_read(cx) {
                Poll::Ready(None) => Poll::Ready(None),
                polled => {
                    self.state = State::PassThrough(upstream);
                    polled
                }
            },
            State::Done => Poll::Ready(None),
        }
    }

    fn cancel(&mut self, reason: CancelReason) {
        match mem::replace(&mut self.state, State::Done) {
            State::Replay(_, upstream) | State::PassThrough(upstream) => {
                debug!(upstream = %upstream.id(), %reason, "forwarding cancel upstream");
                upstream.cancel(reason);
            }
            State::Done => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::StreamExt;
    use futures::stream;
    use proptest::prelude::*;

    use super::*;

    /// Stream over `chunks` that logs every cancellation it receives.
    fn recording(chunks: &[&'static str]) -> (ByteStream, Arc<Mutex<Vec<CancelReason>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let items: Vec<Result<Blob>> = chunks.iter().map(|c| Ok(Blob::from(*c))).collect();
        let s = ByteStream::with_cancel(stream::iter(items), move |reason| {
            sink.lock().unwrap().push(reason);
        });
        (s, log)
    }

    /// Collects the remaining chunks without joining them.
    async fn chunks_of(s: ByteStream) -> Vec<Vec<u8>> {
        s.map(|c| c.unwrap().to_vec()).collect().await
    }

    #[tokio::test]
    async fn split_inside_chunk() {
        let s = ByteStream::from_chunks(["ab", "cd", "ef"]);
        let (head, rest) = split_stream(s, 3).await.unwrap();
        assert_eq!(head.as_bytes(), b"abc");
        assert_eq!(rest.drain().await.unwrap().as_bytes(), b"def");
    }

    #[tokio::test]
    async fn later_chunks_pass_through_uncut() {
        let s = ByteStream::from_chunks(["ab", "cd", "ef"]);
        let (_, rest) = split_stream(s, 3).await.unwrap();
        assert_eq!(chunks_of(rest).await, vec![b"d".to_vec(), b"ef".to_vec()]);
    }

    #[tokio::test]
    async fn split_on_chunk_edge_returns_original() {
        let s = ByteStream::from_chunks(["ab", "cd"]);
        let id = s.id();
        let (head, rest) = split_stream(s, 2).await.unwrap();
        assert_eq!(head.as_bytes(), b"ab");
        assert_eq!(rest.id(), id);
        assert_eq!(rest.drain().await.unwrap().as_bytes(), b"cd");
    }

    #[tokio::test]
    async fn short_source() {
        let s = ByteStream::from_chunks(["ab"]);
        let (head, rest) = split_stream(s, 5).await.unwrap();
        assert_eq!(head.as_bytes(), b"ab");
        assert!(rest.drain().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_bytes_pulls_nothing() {
        let s = ByteStream::from_chunks(["ab"]);
        let id = s.id();
        let (head, rest) = split_stream(s, 0).await.unwrap();
        assert!(head.is_empty());
        assert_eq!(rest.id(), id);
        assert_eq!(rest.drain().await.unwrap().as_bytes(), b"ab");
    }

    #[tokio::test]
    async fn repeated_splits_chain() {
        let s = ByteStream::from_chunks(["abcdef", "gh"]);
        let (a, after_a) = split_stream(s, 1).await.unwrap();
        let (b, after_b) = split_stream(after_a, 2).await.unwrap();
        let (c, after_c) = split_stream(after_b, 4).await.unwrap();
        assert_eq!(a.as_bytes(), b"a");
        assert_eq!(b.as_bytes(), b"bc");
        assert_eq!(c.as_bytes(), b"defg");
        assert_eq!(after_c.drain().await.unwrap().as_bytes(), b"h");
    }

    #[tokio::test]
    async fn cancel_forwards_reason_once() {
        let (s, log) = recording(&["ab", "cd", "ef"]);
        let (_, rest) = split_stream(s, 3).await.unwrap();
        rest.cancel("shutdown");
        assert_eq!(*log.lock().unwrap(), vec![CancelReason::new("shutdown")]);
    }

    #[tokio::test]
    async fn cancel_after_partial_drain() {
        let (s, log) = recording(&["ab", "cd", "ef"]);
        let (_, mut rest) = split_stream(s, 3).await.unwrap();
        assert_eq!(rest.read().await.unwrap().unwrap().as_bytes(), b"d");
        assert_eq!(rest.read().await.unwrap().unwrap().as_bytes(), b"ef");
        rest.cancel("enough");
        assert_eq!(*log.lock().unwrap(), vec![CancelReason::new("enough")]);
    }

    #[tokio::test]
    async fn cancel_after_exhaustion_is_quiet() {
        let (s, log) = recording(&["abc"]);
        let (_, mut rest) = split_stream(s, 1).await.unwrap();
        while rest.read().await.is_some() {}
        rest.cancel("late");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upstream_error_fails_split() {
        let items: Vec<Result<Blob>> = vec![
            Ok(Blob::from("ab")),
            Err(std::io::Error::other("reset").into()),
        ];
        let s = ByteStream::new(stream::iter(items));
        assert!(matches!(split_stream(s, 4).await, Err(crate::Error::Io(_))));
    }

    /// Cuts `data` into consecutive chunks at the given offsets.
    fn chunked(data: &[u8], cuts: &[usize]) -> ByteStream {
        let mut offsets: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
        offsets.push(0);
        offsets.push(data.len());
        offsets.sort_unstable();
        let chunks: Vec<Blob> = offsets
            .windows(2)
            .map(|w| Blob::from(data[w[0]..w[1]].to_vec()))
            .collect();
        ByteStream::from_chunks(chunks)
    }

    proptest! {
        #[test]
        fn split_preserves_every_byte(
            data in proptest::collection::vec(any::<u8>(), 0..64),
            cuts in proptest::collection::vec(any::<usize>(), 0..8),
            n in 0usize..80,
        ) {
            let (head, tail) = futures::executor::block_on(async {
                let (head, rest) = split_stream(chunked(&data, &cuts), n).await.unwrap();
                (head, rest.drain().await.unwrap())
            });
            prop_assert_eq!(head.len(), n.min(data.len()));
            prop_assert_eq!([head.as_bytes(), tail.as_bytes()].concat(), data);
        }
    }
}
