//! Immutable, sliceable byte container.

use std::fmt;
use std::ops::{Bound, RangeBounds};

use bytes::{Bytes, BytesMut};

use crate::Result;

/// An immutable sequence of bytes with a known length.
///
/// Cloning and slicing are cheap: every slice shares the storage of the blob
/// it was cut from, and no operation mutates an existing blob.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(Bytes);

impl Blob {
    /// Creates an empty blob.
    pub const fn new() -> Self {
        Self(Bytes::new())
    }

    /// Number of bytes in the blob.
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the blob holds no bytes.
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the bytes in `range`, clamped to the blob's length.
    ///
    /// Out-of-range bounds never panic: a start past the end yields an empty
    /// blob and an end past the end stops at the last byte.
    #[must_use]
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        let len = self.0.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .clamp(start, len);
        Self(self.0.slice(start..end))
    }

    /// Splits into the first `n` bytes and everything after them.
    ///
    /// `n` is clamped to the blob's length.
    pub fn split_at(&self, n: usize) -> (Self, Self) {
        (self.slice(..n), self.slice(n..))
    }

    /// Concatenates `parts` into one blob.
    ///
    /// A single part is returned as-is without copying.
    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut iter = parts.into_iter();
        let Some(first) = iter.next() else {
            return Self::new();
        };
        let Some(second) = iter.next() else {
            return first;
        };

        let mut buf = BytesMut::with_capacity(first.len() + second.len());
        buf.extend_from_slice(&first.0);
        buf.extend_from_slice(&second.0);
        for part in iter {
            buf.extend_from_slice(&part.0);
        }
        Self(buf.freeze())
    }

    /// Decodes the blob as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        Ok(std::str::from_utf8(&self.0)?)
    }

    /// Borrows the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the underlying [`Bytes`].
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Copies the bytes into a new vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Blob").field(&self.0).finish()
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromIterator<Self> for Blob {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        Self::concat(iter)
    }
}

impl From<Bytes> for Blob {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<BytesMut> for Blob {
    fn from(bytes: BytesMut) -> Self {
        Self(bytes.freeze())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<String> for Blob {
    fn from(text: String) -> Self {
        Self(Bytes::from(text))
    }
}

impl From<&'static [u8]> for Blob {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for Blob {
    fn from(bytes: &'static [u8; N]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Blob {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

impl From<Blob> for Bytes {
    fn from(blob: Blob) -> Self {
        blob.0
    }
}
