//! Deferred socket configuration for device sockets.
//!
//! A device owns its sockets on a background thread, so callers cannot
//! touch them directly. [`SocketSetup`] records option changes,
//! subscriptions, and endpoint addresses while the device is still being
//! assembled; the device applies the recorded configuration to the real
//! socket before its engine loop starts.
//!
//! Address strings are validated for shape when queued and resolved when
//! applied: a bind to an occupied endpoint or a connect to an unbound one
//! fails the device launch instead of being silently retried.

use bytes::Bytes;
use tracing::debug;

use crate::error::{DriveshaftError, Result};
use crate::options::SocketOption;
use crate::socket::Socket;

/// A recorded configuration step, replayed in insertion order.
#[derive(Debug, Clone)]
enum SetupAction {
    Option(SocketOption),
    Subscribe(Bytes),
    SubscribeAll,
}

/// Deferred configuration for one device socket.
///
/// # Examples
///
/// ```
/// use driveshaft::setup::SocketSetup;
/// use driveshaft::options::SocketOption;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let mut setup = SocketSetup::new();
/// setup.set_option(SocketOption::SendHighWaterMark(100));
/// setup.bind("inproc://frontend")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SocketSetup {
    actions: Vec<SetupAction>,
    binds: Vec<String>,
    connects: Vec<String>,
    configured: bool,
}

impl SocketSetup {
    /// Create an empty setup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a typed option change.
    pub fn set_option(&mut self, option: SocketOption) -> &mut Self {
        self.actions.push(SetupAction::Option(option));
        self
    }

    /// Queue a subscription prefix (SUB frontends).
    pub fn subscribe(&mut self, prefix: impl Into<Bytes>) -> &mut Self {
        self.actions.push(SetupAction::Subscribe(prefix.into()));
        self
    }

    /// Queue a subscribe-to-everything.
    pub fn subscribe_all(&mut self) -> &mut Self {
        self.actions.push(SetupAction::SubscribeAll);
        self
    }

    /// Queue an address to bind when the device launches.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty address. Resolution (scheme, endpoint
    /// availability) happens at launch.
    pub fn bind(&mut self, addr: &str) -> Result<&mut Self> {
        if addr.is_empty() {
            return Err(DriveshaftError::invalid_argument(
                "bind address cannot be empty",
            ));
        }
        self.binds.push(addr.to_string());
        Ok(self)
    }

    /// Queue an address to connect when the device launches.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty address.
    pub fn connect(&mut self, addr: &str) -> Result<&mut Self> {
        if addr.is_empty() {
            return Err(DriveshaftError::invalid_argument(
                "connect address cannot be empty",
            ));
        }
        self.connects.push(addr.to_string());
        Ok(self)
    }

    /// Whether any bind or connect address has been queued.
    #[must_use]
    pub fn has_endpoints(&self) -> bool {
        !self.binds.is_empty() || !self.connects.is_empty()
    }

    /// Apply recorded options and subscriptions to the socket.
    ///
    /// Runs once; later calls are no-ops so a relaunched device does not
    /// duplicate subscriptions.
    ///
    /// # Errors
    ///
    /// `NoEndpoint` if no address was ever queued; option validation errors
    /// surface here.
    pub fn configure(&mut self, socket: &mut Socket) -> Result<()> {
        if !self.has_endpoints() {
            return Err(DriveshaftError::NoEndpoint);
        }
        if self.configured {
            return Ok(());
        }
        for action in &self.actions {
            match action {
                SetupAction::Option(option) => socket.set_option(option.clone())?,
                SetupAction::Subscribe(prefix) => socket.subscribe(prefix.clone())?,
                SetupAction::SubscribeAll => socket.subscribe_all()?,
            }
        }
        self.configured = true;
        Ok(())
    }

    /// Bind then connect every queued address, failing fast on the first
    /// error.
    pub fn bind_connect(&self, socket: &mut Socket) -> Result<()> {
        for addr in &self.binds {
            socket.bind(addr)?;
        }
        for addr in &self.connects {
            socket.connect(addr)?;
        }
        Ok(())
    }

    /// Undo every queued address, best effort.
    ///
    /// Used during engine teardown; failures are logged, not propagated.
    pub fn unbind_disconnect(&self, socket: &mut Socket) {
        for addr in &self.connects {
            if let Err(e) = socket.disconnect(addr) {
                debug!(endpoint = %addr, error = %e, "disconnect during teardown failed");
            }
        }
        for addr in &self.binds {
            if let Err(e) = socket.unbind(addr) {
                debug!(endpoint = %addr, error = %e, "unbind during teardown failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::socket::SocketKind;

    #[test]
    fn test_empty_address_rejected() {
        let mut setup = SocketSetup::new();
        assert!(setup.bind("").is_err());
        assert!(setup.connect("").is_err());
        assert!(!setup.has_endpoints());
    }

    #[test]
    fn test_configure_without_endpoints() {
        let ctx = Context::new();
        let mut socket = Socket::new(&ctx, SocketKind::Sub);
        let mut setup = SocketSetup::new();
        setup.subscribe_all();
        assert!(matches!(
            setup.configure(&mut socket),
            Err(DriveshaftError::NoEndpoint)
        ));
    }

    #[test]
    fn test_configure_applies_once() {
        let ctx = Context::new();
        let mut socket = Socket::new(&ctx, SocketKind::Sub);
        let mut setup = SocketSetup::new();
        setup.subscribe(&b"topic"[..]);
        setup.connect("inproc://feed").unwrap();

        setup.configure(&mut socket).unwrap();
        setup.configure(&mut socket).unwrap();
        assert_eq!(socket.subscriptions().len(), 1);
    }

    #[test]
    fn test_bind_connect_fails_fast() {
        let ctx = Context::new();
        let mut first = Socket::new(&ctx, SocketKind::Pair);
        first.bind("inproc://setup-taken").unwrap();

        let mut socket = Socket::new(&ctx, SocketKind::Pair);
        let mut setup = SocketSetup::new();
        setup.bind("inproc://setup-taken").unwrap();
        assert!(matches!(
            setup.bind_connect(&mut socket),
            Err(DriveshaftError::AddrInUse(_))
        ));
    }

    #[test]
    fn test_bind_connect_roundtrip() {
        let ctx = Context::new();
        let mut server = Socket::new(&ctx, SocketKind::Pair);
        let mut server_setup = SocketSetup::new();
        server_setup.bind("inproc://setup-rt").unwrap();
        server_setup.configure(&mut server).unwrap();
        server_setup.bind_connect(&mut server).unwrap();

        let mut client = Socket::new(&ctx, SocketKind::Pair);
        let mut client_setup = SocketSetup::new();
        client_setup
            .set_option(SocketOption::SendHighWaterMark(4))
            .connect("inproc://setup-rt")
            .unwrap();
        client_setup.configure(&mut client).unwrap();
        client_setup.bind_connect(&mut client).unwrap();
        assert_eq!(client.options().send_hwm, 4);

        client_setup.unbind_disconnect(&mut client);
        server_setup.unbind_disconnect(&mut server);
    }
}
