//! Frame: a single owned message part.
//!
//! Ownership transfer on send is modeled by move: `Socket::try_send`
//! consumes the frame, so a frame handle can never be reused or
//! double-released after a successful send. On a would-block condition the
//! socket keeps the frame in its staging buffer; the caller never gets a
//! half-owned handle back.

use bytes::Bytes;

/// One message part: a contiguous byte payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    data: Bytes,
}

impl Frame {
    /// Create a new empty frame.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Bytes::new() }
    }

    /// Create a frame from static bytes without copying.
    #[must_use]
    pub const fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    /// Create a frame by copying the given slice.
    #[must_use]
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Byte length of the frame payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the frame payload.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, returning its payload.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for Frame {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

impl From<String> for Frame {
    fn from(data: String) -> Self {
        Self { data: data.into() }
    }
}

impl From<&'static [u8]> for Frame {
    fn from(data: &'static [u8]) -> Self {
        Self::from_static(data)
    }
}

impl From<&'static str> for Frame {
    fn from(data: &'static str) -> Self {
        Self::from_static(data.as_bytes())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl PartialEq<[u8]> for Frame {
    fn eq(&self, other: &[u8]) -> bool {
        self.data == other
    }
}

impl PartialEq<&[u8]> for Frame {
    fn eq(&self, other: &&[u8]) -> bool {
        self.data == *other
    }
}
