//! Length-prefixed frame codec over any [`Source`].
//!
//! Each frame is: `[u32 little-endian length][payload]`. A producer may put
//! an uncounted prefix in front of the header; readers never expect one.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::{Blob, Error, Result, Source};

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 4;

/// Options for [`read_blob_with`].
///
/// The defaults read any declared length and accept a truncated payload,
/// which is what [`read_blob`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Largest declared payload length accepted.
    max_payload: u32,
    /// Fail instead of returning a payload shorter than declared.
    exact: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOptions {
    /// Creates options with no payload limit and short payloads allowed.
    pub const fn new() -> Self {
        Self {
            max_payload: u32::MAX,
            exact: false,
        }
    }

    /// Rejects frames whose header declares more than `limit` bytes.
    #[must_use]
    pub const fn max_payload(mut self, limit: u32) -> Self {
        self.max_payload = limit;
        self
    }

    /// Fails with [`Error::ShortRead`] when the source ends inside the
    /// payload.
    #[must_use]
    pub const fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }
}

/// Frames `payload` behind a length header.
pub fn pack(payload: impl Into<Blob>) -> Result<Blob> {
    frame(None, &payload.into())
}

/// Frames `payload` and puts `prefix` in front of the header.
///
/// The prefix is not counted in the length and must be stripped by the
/// consumer before [`read_blob`].
pub fn pack_with_prefix(payload: impl Into<Blob>, prefix: impl Into<Blob>) -> Result<Blob> {
    frame(Some(&prefix.into()), &payload.into())
}

/// Serializes `value` as JSON and frames it.
pub fn pack_json<T: Serialize + ?Sized>(value: &T) -> Result<Blob> {
    pack(serde_json::to_vec(value)?)
}

/// Serializes `value` as JSON and frames it behind `prefix`.
pub fn pack_json_with_prefix<T: Serialize + ?Sized>(
    value: &T,
    prefix: impl Into<Blob>,
) -> Result<Blob> {
    pack_with_prefix(serde_json::to_vec(value)?, prefix)
}

/// Builds `[prefix][header][payload]`.
fn frame(prefix: Option<&Blob>, payload: &Blob) -> Result<Blob> {
    let len = u32::try_from(payload.len()).map_err(|_| Error::FrameTooLarge {
        size: widen(payload.len()),
        max: u64::from(u32::MAX),
    })?;
    let prefix_len = prefix.map_or(0, Blob::len);

    let mut buf = BytesMut::with_capacity(prefix_len + HEADER_LEN + payload.len());
    if let Some(p) = prefix {
        buf.extend_from_slice(p.as_bytes());
    }
    buf.put_u32_le(len);
    buf.extend_from_slice(payload.as_bytes());
    Ok(buf.into())
}

/// Converts a byte count for error reporting.
fn widen(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Splits off the first `n` bytes of `source`.
///
/// Returns fewer bytes if the source ends first; use [`read_bytes_exact`]
/// when that must be an error.
pub async fn read_bytes<S: Source>(source: S, n: usize) -> Result<(Blob, S)> {
    source.read_bytes(n).await
}

/// Like [`read_bytes`], but fails with [`Error::ShortRead`] if fewer than
/// `n` bytes are available.
pub async fn read_bytes_exact<S: Source>(source: S, n: usize) -> Result<(Blob, S)> {
    let (bytes, rest) = source.read_bytes(n).await?;
    if bytes.len() < n {
        return Err(Error::ShortRead {
            expected: n,
            got: bytes.len(),
        });
    }
    Ok((bytes, rest))
}

/// Reads one frame and returns its payload and the rest of `source`.
///
/// A payload cut short by the end of the source is returned as-is; check
/// its length or use [`read_blob_with`] with [`ReadOptions::exact`].
pub async fn read_blob<S: Source>(source: S) -> Result<(Blob, S)> {
    read_blob_with(source, ReadOptions::default()).await
}

/// Reads one frame under the given options.
pub async fn read_blob_with<S: Source>(source: S, opts: ReadOptions) -> Result<(Blob, S)> {
    let (header, rest) = source.read_bytes(HEADER_LEN).await?;
    let Ok(raw) = <[u8; HEADER_LEN]>::try_from(header.as_bytes()) else {
        return Err(Error::IncompleteHeader { got: header.len() });
    };

    let size = u32::from_le_bytes(raw);
    if size > opts.max_payload {
        return Err(Error::FrameTooLarge {
            size: u64::from(size),
            max: u64::from(opts.max_payload),
        });
    }
    trace!(size, "frame header decoded");

    let len = usize::try_from(size).unwrap_or(usize::MAX);
    if opts.exact {
        read_bytes_exact(rest, len).await
    } else {
        rest.read_bytes(len).await
    }
}

/// Reads one frame and decodes its payload as UTF-8.
pub async fn read_text<S: Source>(source: S) -> Result<(String, S)> {
    let (blob, rest) = read_blob(source).await?;
    Ok((blob.text()?.to_owned(), rest))
}

/// Reads one frame and parses its payload as JSON.
///
/// Use [`serde_json::Value`] for `T` to accept any document.
pub async fn read_json<T: DeserializeOwned, S: Source>(source: S) -> Result<(T, S)> {
    let (text, rest) = read_text(source).await?;
    Ok((serde_json::from_str(&text)?, rest))
}
