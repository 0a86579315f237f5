//! Byte sources that framed data can be read from.
//!
//! Every read returns a remainder of the same kind as its input: a [`Blob`]
//! leaves a `Blob`, a [`ByteStream`] leaves a `ByteStream`, and an
//! [`AnySource`] keeps its variant.

use std::future;

use crate::split::split_stream;
use crate::{Blob, ByteStream, Result};

/// Seals [`Source`] to the types in this crate.
mod private {
    /// Marker for types allowed to implement [`Source`](super::Source).
    pub trait Sealed {}

    impl Sealed for crate::Blob {}
    impl Sealed for crate::ByteStream {}
    impl Sealed for super::AnySource {}
}

/// Something the first `n` bytes can be split off of.
pub trait Source: private::Sealed + Sized + Send {
    /// Splits off up to `n` bytes from the front.
    ///
    /// Returns `(result, remainder)`. `result` holds `min(n, available)`
    /// bytes; running out early is not an error.
    fn read_bytes(self, n: usize) -> impl Future<Output = Result<(Blob, Self)>> + Send;
}

impl Source for Blob {
    fn read_bytes(self, n: usize) -> impl Future<Output = Result<(Self, Self)>> + Send {
        future::ready(Ok(self.split_at(n)))
    }
}

impl Source for ByteStream {
    fn read_bytes(self, n: usize) -> impl Future<Output = Result<(Blob, Self)>> + Send {
        split_stream(self, n)
    }
}

/// Either kind of source, chosen at run time.
#[derive(Debug)]
#[allow(clippy::exhaustive_enums)]
pub enum AnySource {
    /// In-memory bytes.
    Blob(Blob),
    /// Incremental chunks.
    Stream(ByteStream),
}

impl AnySource {
    /// Returns `true` for the [`Blob`](Self::Blob) variant.
    pub const fn is_blob(&self) -> bool {
        matches!(self, Self::Blob(_))
    }

    /// The blob, if this is the blob variant.
    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Self::Blob(b) => Some(b),
            Self::Stream(_) => None,
        }
    }

    /// The stream, if this is the stream variant.
    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            Self::Stream(s) => Some(s),
            Self::Blob(_) => None,
        }
    }

    /// Collects everything left in the source.
    pub async fn drain(self) -> Result<Blob> {
        match self {
            Self::Blob(b) => Ok(b),
            Self::Stream(s) => s.drain().await,
        }
    }
}

impl Source for AnySource {
    async fn read_bytes(self, n: usize) -> Result<(Blob, Self)> {
        match self {
            Self::Blob(b) => {
                let (head, tail) = b.split_at(n);
                Ok((head, Self::Blob(tail)))
            }
            Self::Stream(s) => {
                let (head, tail) = split_stream(s, n).await?;
                Ok((head, Self::Stream(tail)))
            }
        }
    }
}

impl From<Blob> for AnySource {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<ByteStream> for AnySource {
    fn from(stream: ByteStream) -> Self {
        Self::Stream(stream)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blob_split_mirrors_kind() {
        let (head, rest) = Blob::from("abcdef").read_bytes(4).await.unwrap();
        assert_eq!(head.as_bytes(), b"abcd");
        assert_eq!(rest.as_bytes(), b"ef");
    }

    #[tokio::test]
    async fn any_source_keeps_variant() {
        let blob = AnySource::from(Blob::from("abc"));
        let (head, rest) = blob.read_bytes(1).await.unwrap();
        assert_eq!(head.as_bytes(), b"a");
        assert!(rest.is_blob());

        let stream = AnySource::from(ByteStream::from_chunks(["ab", "c"]));
        let (head2, rest2) = stream.read_bytes(1).await.unwrap();
        assert_eq!(head2.as_bytes(), b"a");
        assert!(!rest2.is_blob());
        assert_eq!(rest2.drain().await.unwrap().as_bytes(), b"bc");
    }

    #[tokio::test]
    async fn both_kinds_split_identically() {
        let data = b"hello, framed world";
        for n in [0, 1, 5, 19, 40] {
            let (from_blob, blob_rest) = Blob::from(data).read_bytes(n).await.unwrap();
            let stream = ByteStream::from_chunks([&data[..3], &data[3..11], &data[11..]]);
            let (from_stream, stream_rest) = stream.read_bytes(n).await.unwrap();
            assert_eq!(from_blob, from_stream);
            assert_eq!(blob_rest, stream_rest.drain().await.unwrap());
        }
    }
}
