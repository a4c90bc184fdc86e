//! Messaging context: endpoint registry plus termination signal.
//!
//! A `Context` is an explicit object passed to every socket, actor, and
//! device constructor; there is no ambient global instance. Cloning is
//! cheap and every clone refers to the same registry and termination flag.
//!
//! Terminating a context makes every subsequent socket and poll operation
//! fail with [`DriveshaftError::Terminated`]; running devices and actors
//! observe it within one polling interval and unwind cleanly.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{DriveshaftError, Result};
use crate::socket::PeerLink;

/// Shared messaging context.
///
/// # Examples
///
/// ```
/// use driveshaft::context::Context;
///
/// let ctx = Context::new();
/// assert!(!ctx.is_terminated());
/// ctx.terminate();
/// assert!(ctx.is_terminated());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug, Default)]
struct ContextInner {
    /// inproc endpoint name -> accept channel of the bound socket
    registry: DashMap<String, flume::Sender<PeerLink>>,
    terminated: AtomicBool,
    serial: AtomicU32,
}

impl Context {
    /// Create a fresh context with an empty endpoint registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal shutdown to everything built on this context.
    ///
    /// Irreversible. Sockets report `Terminated` from the next operation on;
    /// blocked polls observe it within their spin interval.
    pub fn terminate(&self) {
        if !self.inner.terminated.swap(true, Ordering::SeqCst) {
            debug!("context terminated");
            self.inner.registry.clear();
        }
    }

    /// Check whether the context has been terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::SeqCst)
    }

    /// Fail with `Terminated` if shutdown was signalled.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_terminated() {
            Err(DriveshaftError::Terminated)
        } else {
            Ok(())
        }
    }

    /// Next context-unique serial, used for actor endpoint names.
    pub(crate) fn next_serial(&self) -> u32 {
        self.inner.serial.fetch_add(1, Ordering::Relaxed)
    }

    /// Assign a peer identity: a null byte followed by a serial.
    ///
    /// The null prefix marks the identity as context-assigned; caller-set
    /// routing IDs are forbidden from using it.
    pub(crate) fn next_identity(&self) -> Bytes {
        let serial = self.next_serial();
        let mut id = Vec::with_capacity(5);
        id.push(0x00);
        id.extend_from_slice(&serial.to_be_bytes());
        Bytes::from(id)
    }

    /// Register a bound inproc endpoint.
    pub(crate) fn register(&self, name: &str, accept: flume::Sender<PeerLink>) -> Result<()> {
        self.check()?;
        use dashmap::mapref::entry::Entry;
        match self.inner.registry.entry(name.to_string()) {
            Entry::Occupied(_) => Err(DriveshaftError::AddrInUse(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(accept);
                Ok(())
            }
        }
    }

    /// Look up a bound inproc endpoint's accept channel.
    pub(crate) fn lookup(&self, name: &str) -> Result<flume::Sender<PeerLink>> {
        self.check()?;
        self.inner
            .registry
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DriveshaftError::AddrNotFound(name.to_string()))
    }

    /// Remove a bound inproc endpoint. Missing entries are ignored.
    pub(crate) fn unregister(&self, name: &str) {
        self.inner.registry.remove(name);
    }
}
