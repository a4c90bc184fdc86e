//! Socket configuration options
//!
//! Options are plain data on the socket; [`SocketOption`] is the typed
//! mutation surface used by [`crate::setup::SocketSetup`] to queue option
//! changes before a device starts.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{DriveshaftError, Result};

/// Socket configuration options.
///
/// # Examples
///
/// ```
/// use driveshaft::options::SocketOptions;
/// use std::time::Duration;
///
/// let opts = SocketOptions::default()
///     .with_recv_timeout(Duration::from_secs(5))
///     .with_recv_hwm(100);
/// ```
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Receive timeout used by blocking receive helpers.
    ///
    /// - `None`: block until a message arrives or the context terminates
    /// - `Some(duration)`: wait up to duration before reporting would-block
    pub recv_timeout: Option<Duration>,

    /// Send timeout used by blocking send helpers.
    ///
    /// Same semantics as `recv_timeout`, applied while waiting for
    /// outbound queue capacity.
    pub send_timeout: Option<Duration>,

    /// How long close spends flushing retained outbound messages before
    /// discarding them.
    pub linger: Duration,

    /// High water mark for receiving.
    ///
    /// Per-peer inbound queue depth in messages. Applies to links created
    /// after the option is set.
    pub recv_hwm: usize,

    /// High water mark for sending.
    ///
    /// Per-peer outbound queue depth in messages. When reached, sends report
    /// would-block (or drop, for PUB sockets).
    pub send_hwm: usize,

    /// Socket identity announced to ROUTER/STREAM peers.
    ///
    /// If `None`, the context assigns one on connect.
    pub routing_id: Option<Bytes>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            recv_timeout: None,
            send_timeout: None,
            linger: Duration::ZERO,
            recv_hwm: 1000,
            send_hwm: 1000,
            routing_id: None,
        }
    }
}

impl SocketOptions {
    /// Create new socket options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set receive timeout.
    #[must_use]
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Set send timeout.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set the close-time flush allowance.
    #[must_use]
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Set receive high water mark.
    #[must_use]
    pub fn with_recv_hwm(mut self, hwm: usize) -> Self {
        self.recv_hwm = hwm;
        self
    }

    /// Set send high water mark.
    #[must_use]
    pub fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.send_hwm = hwm;
        self
    }

    /// Set socket routing identity.
    #[must_use]
    pub fn with_routing_id(mut self, id: Bytes) -> Self {
        self.routing_id = Some(id);
        self
    }

    /// Apply a single typed option mutation.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid values (e.g. an oversized routing ID).
    pub fn apply(&mut self, option: SocketOption) -> Result<()> {
        match option {
            SocketOption::RecvTimeout(timeout) => self.recv_timeout = timeout,
            SocketOption::SendTimeout(timeout) => self.send_timeout = timeout,
            SocketOption::Linger(linger) => self.linger = linger,
            SocketOption::RecvHighWaterMark(hwm) => self.recv_hwm = hwm,
            SocketOption::SendHighWaterMark(hwm) => self.send_hwm = hwm,
            SocketOption::RoutingId(id) => {
                validate_routing_id(&id)?;
                self.routing_id = Some(id);
            }
        }
        Ok(())
    }
}

/// Typed socket option mutations.
///
/// A closed set of selector+value pairs, dispatched through
/// [`SocketOptions::apply`].
#[derive(Debug, Clone)]
pub enum SocketOption {
    /// Receive timeout for blocking receive helpers.
    RecvTimeout(Option<Duration>),
    /// Send timeout for blocking send helpers.
    SendTimeout(Option<Duration>),
    /// Close-time flush allowance for retained outbound messages.
    Linger(Duration),
    /// Per-peer inbound queue depth in messages.
    RecvHighWaterMark(usize),
    /// Per-peer outbound queue depth in messages.
    SendHighWaterMark(usize),
    /// Identity announced to ROUTER/STREAM peers.
    RoutingId(Bytes),
}

/// Validate a routing identity.
///
/// Identities must be 1-255 bytes and must not start with a null byte,
/// which is reserved for context-assigned identities.
pub fn validate_routing_id(id: &[u8]) -> Result<()> {
    if id.is_empty() {
        return Err(DriveshaftError::invalid_argument(
            "routing ID cannot be empty",
        ));
    }

    if id.len() > 255 {
        return Err(DriveshaftError::invalid_argument(format!(
            "routing ID cannot exceed 255 bytes (got {})",
            id.len()
        )));
    }

    if id[0] == 0x00 {
        return Err(DriveshaftError::invalid_argument(
            "routing ID cannot start with null byte (reserved for assigned IDs)",
        ));
    }

    Ok(())
}
