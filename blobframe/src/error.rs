//! Error types for framing operations.

use std::str::Utf8Error;

/// Alias for `Result<T, blobframe::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by framing, splitting and decoding operations.
///
/// A short read is not an error unless a strict operation was requested;
/// see [`read_bytes_exact`](crate::read_bytes_exact) and
/// [`ReadOptions::exact`](crate::ReadOptions::exact).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The source ended before a full length header could be read.
    #[error("incomplete header: got {got} of {} bytes", crate::HEADER_LEN)]
    IncompleteHeader {
        /// Number of header bytes that were available.
        got: usize,
    },

    /// A strict read ended before the requested byte count.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead {
        /// Requested byte count.
        expected: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// A payload does not fit the header or exceeds the configured limit.
    #[error("frame of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Payload size in bytes.
        size: u64,
        /// Largest accepted payload size.
        max: u64,
    },

    /// The payload is not valid UTF-8.
    #[error("invalid UTF-8 payload")]
    Utf8(#[from] Utf8Error),

    /// JSON serialization or parsing failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The underlying transport failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
