//! Level-triggered readiness polling over socket sets.
//!
//! [`poll`] repeatedly scans a slice of [`PollItem`]s until at least one
//! socket reports readiness or the timeout elapses. Readiness is
//! level-triggered: a readable socket keeps reporting readable until the
//! pending message is consumed, so a caller that skips a ready socket sees
//! it again on the next poll.

use std::ops::BitOr;
use std::time::{Duration, Instant};

use crate::error::{DriveshaftError, Result};
use crate::socket::Socket;

/// Sleep slice between readiness scans.
const SCAN_INTERVAL: Duration = Duration::from_micros(500);

/// Readiness interest mask.
///
/// # Examples
///
/// ```
/// use driveshaft::poll::Interest;
///
/// let both = Interest::READABLE | Interest::WRITABLE;
/// assert!(both.contains(Interest::READABLE));
/// assert!(!Interest::NONE.contains(Interest::WRITABLE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interest(u8);

impl Interest {
    /// No interest; also the "nothing ready" result.
    pub const NONE: Self = Self(0);
    /// Interested in a complete message being available.
    pub const READABLE: Self = Self(1);
    /// Interested in outbound queue capacity.
    pub const WRITABLE: Self = Self(2);
    /// Both directions.
    pub const BOTH: Self = Self(3);

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Interest {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One socket in a poll set, with its interest and last observed readiness.
#[derive(Debug)]
pub struct PollItem<'s> {
    socket: &'s mut Socket,
    interest: Interest,
    ready: Interest,
}

impl<'s> PollItem<'s> {
    /// Watch a socket for the given interests.
    #[must_use]
    pub fn new(socket: &'s mut Socket, interest: Interest) -> Self {
        Self {
            socket,
            interest,
            ready: Interest::NONE,
        }
    }

    /// Watch a socket for readability only.
    #[must_use]
    pub fn readable(socket: &'s mut Socket) -> Self {
        Self::new(socket, Interest::READABLE)
    }

    /// Whether the last poll observed a complete pending message.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.ready.contains(Interest::READABLE)
    }

    /// Whether the last poll observed outbound capacity.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.ready.contains(Interest::WRITABLE)
    }

    /// The watched socket.
    pub fn socket(&mut self) -> &mut Socket {
        self.socket
    }
}

/// Wait until at least one item is ready.
///
/// Returns `Ok(true)` when some item became ready (inspect each item's
/// `is_readable`/`is_writable`), `Ok(false)` on timeout. A timeout of
/// `None` waits indefinitely; `Some(Duration::ZERO)` performs a single
/// non-blocking scan.
///
/// Transient per-socket errors during the scan are retried on the next
/// pass; `Terminated` and fatal errors abort the poll.
///
/// # Errors
///
/// `InvalidState` for an empty item set, `Terminated` once the owning
/// context shuts down.
pub fn poll(items: &mut [PollItem<'_>], timeout: Option<Duration>) -> Result<bool> {
    if items.is_empty() {
        return Err(DriveshaftError::InvalidState(
            "poll requires at least one socket",
        ));
    }
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        let mut any_ready = false;
        for item in items.iter_mut() {
            item.ready = match item.socket.poll_ready(item.interest) {
                Ok(ready) => ready,
                Err(DriveshaftError::Interrupted) => Interest::NONE,
                Err(e) => return Err(e),
            };
            if !item.ready.is_empty() {
                any_ready = true;
            }
        }
        if any_ready {
            return Ok(true);
        }
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(false);
                }
                std::thread::sleep(SCAN_INTERVAL.min(deadline - now));
            }
            None => std::thread::sleep(SCAN_INTERVAL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::message::Message;
    use crate::socket::SocketKind;

    #[test]
    fn test_interest_mask() {
        assert!(Interest::BOTH.contains(Interest::READABLE));
        assert!(Interest::BOTH.contains(Interest::WRITABLE));
        assert!((Interest::READABLE | Interest::WRITABLE).contains(Interest::BOTH));
        assert!(Interest::NONE.is_empty());
        assert!(!Interest::READABLE.is_empty());
    }

    #[test]
    fn test_poll_empty_set_rejected() {
        assert!(matches!(
            poll(&mut [], Some(Duration::ZERO)),
            Err(DriveshaftError::InvalidState(_))
        ));
    }

    #[test]
    fn test_poll_timeout_elapses() {
        let ctx = Context::new();
        let mut socket = Socket::new(&ctx, SocketKind::Pair);
        socket.bind("inproc://poll-timeout").unwrap();

        let mut items = [PollItem::readable(&mut socket)];
        let ready = poll(&mut items, Some(Duration::from_millis(10))).unwrap();
        assert!(!ready);
        assert!(!items[0].is_readable());
    }

    #[test]
    fn test_poll_sees_pending_message() {
        let ctx = Context::new();
        let mut server = Socket::new(&ctx, SocketKind::Pair);
        server.bind("inproc://poll-ready").unwrap();
        let mut client = Socket::new(&ctx, SocketKind::Pair);
        client.connect("inproc://poll-ready").unwrap();
        client.send_message(Message::new().push_str("hi")).unwrap();

        let mut items = [PollItem::readable(&mut server)];
        let ready = poll(&mut items, Some(Duration::from_secs(1))).unwrap();
        assert!(ready);
        assert!(items[0].is_readable());

        // level-triggered: the message is still there on the next poll
        let mut items = [PollItem::readable(&mut server)];
        assert!(poll(&mut items, Some(Duration::ZERO)).unwrap());
        let msg = items[0].socket().recv_message().unwrap();
        assert_eq!(msg.parse_frame_str(0).unwrap(), "hi");
    }

    #[test]
    fn test_poll_writable() {
        let ctx = Context::new();
        let mut server = Socket::new(&ctx, SocketKind::Pair);
        server.bind("inproc://poll-writable").unwrap();
        let mut client = Socket::new(&ctx, SocketKind::Pair);
        client.connect("inproc://poll-writable").unwrap();

        let mut items = [PollItem::new(&mut client, Interest::WRITABLE)];
        assert!(poll(&mut items, Some(Duration::ZERO)).unwrap());
        assert!(items[0].is_writable());
    }

    #[test]
    fn test_poll_terminated_context() {
        let ctx = Context::new();
        let mut socket = Socket::new(&ctx, SocketKind::Pair);
        socket.bind("inproc://poll-terminated").unwrap();
        ctx.terminate();

        let mut items = [PollItem::readable(&mut socket)];
        assert!(matches!(
            poll(&mut items, Some(Duration::from_millis(10))),
            Err(DriveshaftError::Terminated)
        ));
    }
}
