//! Message builder for ergonomic multipart message construction.
//!
//! A message is an ordered sequence of [`Frame`]s; insertion order is wire
//! order. Sending a message consumes it, so every contained frame is
//! released exactly once no matter whether it was sent or dropped.

use std::io;

use crate::frame::Frame;

/// A multipart message: ordered frames linked by the more flag on the wire.
///
/// # Examples
///
/// ```
/// use driveshaft::message::Message;
///
/// let msg = Message::new()
///     .push_str("topic")
///     .push(&b"data"[..]);
/// assert_eq!(msg.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Message {
    frames: Vec<Frame>,
}

impl Message {
    /// Create a new empty message.
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Create a message from existing frames.
    #[must_use]
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Add a frame from any type that can be converted to [`Frame`].
    #[must_use]
    pub fn push(mut self, frame: impl Into<Frame>) -> Self {
        self.frames.push(frame.into());
        self
    }

    /// Add a string frame (UTF-8 encoded, copied).
    #[must_use]
    pub fn push_str(mut self, s: &str) -> Self {
        self.frames.push(Frame::copy_from_slice(s.as_bytes()));
        self
    }

    /// Add an empty frame (useful for envelope delimiters).
    ///
    /// ```
    /// # use driveshaft::message::Message;
    /// // ROUTER envelope: [identity] [empty] [data]
    /// let msg = Message::new()
    ///     .push(&b"client-id"[..])
    ///     .push_empty()
    ///     .push_str("request");
    /// # assert_eq!(msg.len(), 3);
    /// ```
    #[must_use]
    pub fn push_empty(mut self) -> Self {
        self.frames.push(Frame::new());
        self
    }

    /// Get the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the message has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Get a reference to the frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Get a single frame by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Consume the message and return the frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Try to parse a frame as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame doesn't exist or isn't valid UTF-8.
    pub fn parse_frame_str(&self, index: usize) -> io::Result<&str> {
        let frame = self.frames.get(index).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "Frame index out of bounds")
        })?;

        std::str::from_utf8(frame.as_slice())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl From<Vec<Frame>> for Message {
    fn from(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl From<Message> for Vec<Frame> {
    fn from(msg: Message) -> Self {
        msg.frames
    }
}

impl IntoIterator for Message {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
