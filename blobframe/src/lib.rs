//! Length-prefixed framing over in-memory blobs and pull-based byte streams.
//!
//! A frame is a 4-byte little-endian length followed by that many payload
//! bytes. [`pack`] builds frames; [`read_blob`], [`read_text`] and
//! [`read_json`] read exactly one frame off the front of a [`Blob`] or a
//! [`ByteStream`] and return the unconsumed remainder in the same shape.
//!
//! Streams are split without buffering past the frame: only the chunks
//! needed are pulled, and a chunk straddling the boundary is replayed by the
//! remainder before upstream chunks resume.
//!
//! # Quick start
//!
//! ```
//! use blobframe::{ByteStream, pack, read_text};
//!
//! # futures::executor::block_on(async {
//! let wire = pack("hello")?;
//! let chunks = [wire.slice(..3), wire.slice(3..)];
//!
//! let (text, rest) = read_text(ByteStream::from_chunks(chunks)).await?;
//! assert_eq!(text, "hello");
//! assert!(rest.drain().await?.is_empty());
//! # Ok::<(), blobframe::Error>(())
//! # }).unwrap();
//! ```

mod blob;
mod codec;
mod error;
mod source;
mod split;
mod stream;

pub use blob::Blob;
pub use codec::{
    HEADER_LEN, ReadOptions, pack, pack_json, pack_json_with_prefix, pack_with_prefix, read_blob,
    read_blob_with, read_bytes, read_bytes_exact, read_json, read_text,
};
pub use error::{Error, Result};
pub use source::{AnySource, Source};
pub use stream::{ByteStream, CancelReason, ChunkSource, DEFAULT_CHUNK_SIZE, StreamId};
