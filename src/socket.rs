//! Channel-backed message sockets for the in-process transport.
//!
//! A [`Socket`] exchanges complete multipart units over bounded flume
//! channels registered in the owning [`Context`]. Frame-level send/receive
//! is layered on top through per-socket staging buffers, so a multipart
//! message is always delivered atomically: either every frame crosses the
//! wire in order or none does.
//!
//! Sockets are single-owner objects. They are `Send` (a device moves its
//! sockets onto the engine thread) but must never be shared between
//! threads; only the channel endpoints underneath are cross-thread safe.
//!
//! Error categories follow the crate taxonomy: `WouldBlock` for "not ready
//! right now", `Terminated` once the context shuts down, and everything
//! else is fatal.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::error::{DriveshaftError, Result};
use crate::frame::Frame;
use crate::message::Message;
use crate::monitor::{MonitorReceiver, MonitorSender, SocketEvent};
use crate::options::{SocketOption, SocketOptions};
use crate::poll::Interest;

/// One complete multipart message on the wire.
pub(crate) type WireUnit = Vec<Bytes>;

/// Link handed from a connecting socket to the bound socket's accept queue.
#[derive(Debug)]
pub(crate) struct PeerLink {
    /// Identity the accepting side uses for this peer.
    pub identity: Bytes,
    /// Channel toward the connecting socket.
    pub tx: flume::Sender<WireUnit>,
    /// Channel from the connecting socket.
    pub rx: flume::Receiver<WireUnit>,
    /// Address the connector dialed, for monitoring.
    pub endpoint: String,
}

/// Socket kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Exclusive bidirectional point-to-point link (actor control channels).
    Pair,
    /// Publish to every connected subscriber.
    Pub,
    /// Receive publications matching a subscription prefix.
    Sub,
    /// Distribute messages round-robin to pullers.
    Push,
    /// Fair-queue messages from pushers.
    Pull,
    /// Round-robin send, fair-queue receive.
    Dealer,
    /// Route by identity: receives are identity-prefixed, sends are
    /// identity-addressed.
    Router,
    /// Raw-stream emulation: identity-prefixed 2-frame units, outbound
    /// units terminated by an empty delimiter frame.
    Stream,
}

impl SocketKind {
    /// Get the socket kind as a string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Push => "PUSH",
            Self::Pull => "PULL",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Stream => "STREAM",
        }
    }

    /// Whether this kind can send application messages.
    pub const fn can_send(&self) -> bool {
        !matches!(self, Self::Sub | Self::Pull)
    }

    /// Whether this kind can receive application messages.
    pub const fn can_recv(&self) -> bool {
        !matches!(self, Self::Pub | Self::Push)
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a sealed outbound unit goes.
#[derive(Debug)]
enum Route {
    /// Next available peer, round-robin.
    AnyPeer,
    /// The peer with this identity, or dropped if unknown.
    Peer(Bytes),
    /// Every connected peer (PUB fan-out, slow peers skipped).
    Broadcast,
}

#[derive(Debug)]
struct Peer {
    identity: Bytes,
    tx: flume::Sender<WireUnit>,
    rx: flume::Receiver<WireUnit>,
    endpoint: String,
}

/// Sleep slice for the bounded blocking receive helpers.
const RETRY_INTERVAL: Duration = Duration::from_micros(200);

/// An in-process message socket.
///
/// # Examples
///
/// ```
/// use driveshaft::context::Context;
/// use driveshaft::message::Message;
/// use driveshaft::socket::{Socket, SocketKind};
/// use std::time::Duration;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut server = Socket::new(&ctx, SocketKind::Pair);
/// server.bind("inproc://demo")?;
///
/// let mut client = Socket::new(&ctx, SocketKind::Pair);
/// client.connect("inproc://demo")?;
/// client.send_message(Message::new().push_str("hello"))?;
///
/// let msg = server.recv_message_timeout(Duration::from_secs(1))?;
/// assert_eq!(msg.parse_frame_str(0).unwrap(), "hello");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Socket {
    ctx: Context,
    kind: SocketKind,
    options: SocketOptions,
    peers: Vec<Peer>,
    /// One accept queue per bound endpoint, keyed by inproc name.
    accepts: Vec<(String, flume::Receiver<PeerLink>)>,
    subscriptions: Vec<Bytes>,
    /// Remaining frames of the incoming unit currently being consumed.
    inbound: VecDeque<Bytes>,
    /// Frames of the outgoing unit currently being assembled.
    staged: SmallVec<[Bytes; 4]>,
    /// Sealed units waiting for channel capacity.
    outbox: VecDeque<(Route, WireUnit)>,
    next_recv: usize,
    next_send: usize,
    last_endpoint: Option<String>,
    events: Option<MonitorSender>,
    closed: bool,
}

impl Socket {
    /// Create a socket of the given kind on a context.
    #[must_use]
    pub fn new(ctx: &Context, kind: SocketKind) -> Self {
        Self {
            ctx: ctx.clone(),
            kind,
            options: SocketOptions::default(),
            peers: Vec::new(),
            accepts: Vec::new(),
            subscriptions: Vec::new(),
            inbound: VecDeque::new(),
            staged: SmallVec::new(),
            outbox: VecDeque::new(),
            next_recv: 0,
            next_send: 0,
            last_endpoint: None,
            events: None,
            closed: false,
        }
    }

    /// Socket kind.
    #[must_use]
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// The owning context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Current option values.
    #[must_use]
    pub fn options(&self) -> &SocketOptions {
        &self.options
    }

    /// Apply a typed option mutation.
    ///
    /// High-water marks affect links created afterwards; existing links
    /// keep their queue depth.
    pub fn set_option(&mut self, option: SocketOption) -> Result<()> {
        self.options.apply(option)
    }

    /// The most recent address passed to a successful bind or connect.
    #[must_use]
    pub fn last_endpoint(&self) -> Option<&str> {
        self.last_endpoint.as_deref()
    }

    /// Enable monitoring and return the event stream.
    ///
    /// Replaces any previous monitor channel.
    pub fn monitored(&mut self) -> MonitorReceiver {
        let (tx, rx) = flume::unbounded();
        self.events = Some(tx);
        rx
    }

    /// Subscribe to publications whose first frame starts with `prefix`.
    ///
    /// Only valid on SUB sockets. A SUB socket with no subscription
    /// receives nothing.
    pub fn subscribe(&mut self, prefix: impl Into<Bytes>) -> Result<()> {
        if self.kind != SocketKind::Sub {
            return Err(DriveshaftError::Unsupported(
                "subscribe is only valid on SUB sockets",
            ));
        }
        self.subscriptions.push(prefix.into());
        Ok(())
    }

    /// Subscribe to every publication.
    pub fn subscribe_all(&mut self) -> Result<()> {
        self.subscribe(Bytes::new())
    }

    pub(crate) fn subscriptions(&self) -> &[Bytes] {
        &self.subscriptions
    }

    /// Bind to an endpoint, registering it in the context.
    ///
    /// # Errors
    ///
    /// `AddrInUse` if the endpoint is already bound, `Unsupported` for
    /// non-inproc transports, `Terminated` after context shutdown.
    pub fn bind(&mut self, addr: &str) -> Result<()> {
        self.ctx.check()?;
        let name = match self.inproc_name(addr) {
            Ok(name) => name,
            Err(e) => {
                self.emit(SocketEvent::BindFailed {
                    endpoint: addr.to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        let (accept_tx, accept_rx) = flume::unbounded();
        if let Err(e) = self.ctx.register(&name, accept_tx) {
            self.emit(SocketEvent::BindFailed {
                endpoint: addr.to_string(),
                reason: e.to_string(),
            });
            return Err(e);
        }
        self.accepts.push((name, accept_rx));
        self.last_endpoint = Some(addr.to_string());
        debug!(endpoint = addr, kind = %self.kind, "socket bound");
        self.emit(SocketEvent::Bound(addr.to_string()));
        Ok(())
    }

    /// Connect to a bound endpoint.
    ///
    /// # Errors
    ///
    /// `AddrNotFound` if nothing is bound there (connect-before-bind is
    /// rejected, not queued), `Unsupported` for non-inproc transports.
    pub fn connect(&mut self, addr: &str) -> Result<()> {
        self.ctx.check()?;
        let result = self.connect_inner(addr);
        if let Err(e) = &result {
            self.emit(SocketEvent::ConnectFailed {
                endpoint: addr.to_string(),
                reason: e.to_string(),
            });
        }
        result
    }

    fn connect_inner(&mut self, addr: &str) -> Result<()> {
        if self.kind == SocketKind::Pair && !self.peers.is_empty() {
            return Err(DriveshaftError::InvalidState(
                "pair socket already has a peer",
            ));
        }
        let name = self.inproc_name(addr)?;
        let accept = self.ctx.lookup(&name)?;

        let my_identity = self
            .options
            .routing_id
            .clone()
            .unwrap_or_else(|| self.ctx.next_identity());
        let peer_identity = self.ctx.next_identity();

        let (out_tx, out_rx) = flume::bounded(self.options.send_hwm.max(1));
        let (in_tx, in_rx) = flume::bounded(self.options.recv_hwm.max(1));

        let link = PeerLink {
            identity: my_identity,
            tx: in_tx,
            rx: out_rx,
            endpoint: addr.to_string(),
        };
        if accept.send(link).is_err() {
            // binder dropped its accept queue between lookup and send
            return Err(DriveshaftError::AddrNotFound(addr.to_string()));
        }

        self.peers.push(Peer {
            identity: peer_identity,
            tx: out_tx,
            rx: in_rx,
            endpoint: addr.to_string(),
        });
        self.last_endpoint = Some(addr.to_string());
        debug!(endpoint = addr, kind = %self.kind, "socket connected");
        self.emit(SocketEvent::Connected(addr.to_string()));
        Ok(())
    }

    /// Remove a bound endpoint from the context registry.
    ///
    /// Peers already accepted through it stay connected.
    pub fn unbind(&mut self, addr: &str) -> Result<()> {
        let name = self.inproc_name(addr)?;
        let Some(pos) = self.accepts.iter().position(|(n, _)| *n == name) else {
            return Err(DriveshaftError::AddrNotFound(addr.to_string()));
        };
        self.accepts.remove(pos);
        self.ctx.unregister(&name);
        debug!(endpoint = addr, "socket unbound");
        Ok(())
    }

    /// Drop every peer link created by connecting to `addr`.
    pub fn disconnect(&mut self, addr: &str) -> Result<()> {
        let before = self.peers.len();
        let mut dropped = Vec::new();
        self.peers.retain(|peer| {
            if peer.endpoint == addr {
                dropped.push(peer.endpoint.clone());
                false
            } else {
                true
            }
        });
        if self.peers.is_empty() {
            self.next_recv = 0;
            self.next_send = 0;
        } else {
            self.next_recv %= self.peers.len();
            self.next_send %= self.peers.len();
        }
        for endpoint in dropped {
            self.emit(SocketEvent::Disconnected(endpoint));
        }
        if self.peers.len() == before {
            return Err(DriveshaftError::AddrNotFound(addr.to_string()));
        }
        debug!(endpoint = addr, "socket disconnected");
        Ok(())
    }

    /// Close the socket: unbind everything, drop every peer link.
    ///
    /// Spends up to the `linger` option flushing retained outbound
    /// messages, then discards whatever is left. Idempotent; also invoked
    /// on drop.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.outbox.is_empty() && !self.options.linger.is_zero() {
            let deadline = Instant::now() + self.options.linger;
            while Instant::now() < deadline {
                match self.flush() {
                    Ok(()) => break,
                    Err(e) if e.is_transient() => std::thread::sleep(RETRY_INTERVAL),
                    Err(_) => break,
                }
            }
        }
        for (name, _) in self.accepts.drain(..) {
            self.ctx.unregister(&name);
        }
        self.peers.clear();
        self.inbound.clear();
        self.staged.clear();
        self.outbox.clear();
        debug!(kind = %self.kind, "socket closed");
        self.emit(SocketEvent::Closed);
    }

    /// Receive one frame without blocking.
    ///
    /// Returns the frame and whether more frames of the same message
    /// follow. Readiness is message-granular: once the first frame of a
    /// unit is returned, the remaining frames never report would-block.
    pub fn try_recv(&mut self) -> Result<(Frame, bool)> {
        self.ctx.check()?;
        if self.inbound.is_empty() {
            self.fetch_unit()?;
        }
        match self.inbound.pop_front() {
            Some(data) => Ok((Frame::from(data), !self.inbound.is_empty())),
            None => Err(DriveshaftError::WouldBlock),
        }
    }

    /// Send one frame without blocking, consuming it.
    ///
    /// `more` links the frame to the next one of the same message; the
    /// message is delivered atomically when its last frame arrives. On a
    /// would-block condition the sealed message is retained inside the
    /// socket (nothing is lost) and a later [`flush`](Self::flush) or send
    /// retries delivery.
    pub fn try_send(&mut self, frame: Frame, more: bool) -> Result<()> {
        self.ctx.check()?;
        if !self.kind.can_send() {
            return Err(DriveshaftError::Unsupported(
                "socket kind does not send application messages",
            ));
        }
        let bytes = frame.into_bytes();
        let sealed = if self.kind == SocketKind::Stream {
            self.stage_stream(bytes, more)
        } else {
            self.staged.push(bytes);
            if more {
                false
            } else {
                self.seal_staged();
                true
            }
        };
        if sealed {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// Retry delivery of retained outbound messages.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while a destination queue is still full; the messages
    /// stay retained.
    pub fn flush(&mut self) -> Result<()> {
        self.ctx.check()?;
        self.accept_pending();
        while let Some((route, unit)) = self.outbox.pop_front() {
            if let Some(retained) = self.deliver(route, unit) {
                self.outbox.push_front(retained);
                return Err(DriveshaftError::WouldBlock);
            }
        }
        Ok(())
    }

    /// Whether sealed messages are waiting for channel capacity.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.outbox.is_empty()
    }

    /// Send a whole message, consuming it.
    ///
    /// On `WouldBlock` the message has been accepted and retained; it goes
    /// out on the next flush.
    pub fn send_message(&mut self, msg: Message) -> Result<()> {
        let mut frames = msg.into_frames().into_iter().peekable();
        while let Some(frame) = frames.next() {
            let more = frames.peek().is_some();
            self.try_send(frame, more)?;
        }
        Ok(())
    }

    /// Send a whole message, waiting for capacity per the `send_timeout`
    /// option.
    ///
    /// With no timeout configured this waits until the message is
    /// delivered or the context terminates.
    pub fn send_message_wait(&mut self, msg: Message) -> Result<()> {
        match self.send_message(msg) {
            Err(e) if e.is_transient() => {}
            other => return other,
        }
        let deadline = self.options.send_timeout.map(|t| Instant::now() + t);
        loop {
            match self.flush() {
                Err(e) if e.is_transient() => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return Err(DriveshaftError::WouldBlock);
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                other => return other,
            }
        }
    }

    /// Receive a whole message without blocking.
    pub fn recv_message(&mut self) -> Result<Message> {
        let (frame, mut more) = self.try_recv()?;
        let mut frames = vec![frame];
        while more {
            let (frame, m) = self.try_recv()?;
            frames.push(frame);
            more = m;
        }
        Ok(Message::from_frames(frames))
    }

    /// Receive a whole message, waiting up to `timeout`.
    pub fn recv_message_timeout(&mut self, timeout: Duration) -> Result<Message> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.recv_message() {
                Err(e) if e.is_transient() => {
                    if Instant::now() >= deadline {
                        return Err(DriveshaftError::WouldBlock);
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                other => return other,
            }
        }
    }

    /// Receive a whole message, honoring the `recv_timeout` option.
    ///
    /// With no timeout configured this waits until a message arrives or
    /// the context terminates.
    pub fn recv_message_wait(&mut self) -> Result<Message> {
        match self.options.recv_timeout {
            Some(timeout) => self.recv_message_timeout(timeout),
            None => loop {
                match self.recv_message() {
                    Err(e) if e.is_transient() => std::thread::sleep(RETRY_INTERVAL),
                    other => return other,
                }
            },
        }
    }

    /// Level-triggered readiness for the requested interests.
    ///
    /// Readable means a whole matching unit is available; the check may
    /// prefetch it (and, for SUB sockets, discard units matching no
    /// subscription). Writable means retained messages flushed and at
    /// least one peer has queue capacity.
    pub fn poll_ready(&mut self, interest: Interest) -> Result<Interest> {
        self.ctx.check()?;
        self.accept_pending();
        let mut ready = Interest::NONE;
        if interest.contains(Interest::READABLE) && self.recv_ready()? {
            ready = ready | Interest::READABLE;
        }
        if interest.contains(Interest::WRITABLE) && self.send_ready() {
            ready = ready | Interest::WRITABLE;
        }
        Ok(ready)
    }

    fn recv_ready(&mut self) -> Result<bool> {
        if !self.kind.can_recv() {
            return Ok(false);
        }
        if !self.inbound.is_empty() {
            return Ok(true);
        }
        match self.fetch_unit() {
            Ok(()) => Ok(true),
            Err(DriveshaftError::WouldBlock) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn send_ready(&mut self) -> bool {
        if !self.kind.can_send() {
            return false;
        }
        if !self.outbox.is_empty() && self.flush().is_err() {
            return false;
        }
        if self.kind == SocketKind::Pub {
            return true;
        }
        self.peers.iter().any(|peer| !peer.tx.is_full())
    }

    /// Pull newly connected peers off every accept queue.
    fn accept_pending(&mut self) {
        let mut links = Vec::new();
        for (_, rx) in &self.accepts {
            while let Ok(link) = rx.try_recv() {
                links.push(link);
            }
        }
        for link in links {
            // PAIR is exclusive: one peer, everyone else is turned away
            if self.kind == SocketKind::Pair && !self.peers.is_empty() {
                debug!(endpoint = %link.endpoint, "rejecting extra peer on pair socket");
                self.emit(SocketEvent::ConnectFailed {
                    endpoint: link.endpoint,
                    reason: "pair socket already has a peer".to_string(),
                });
                continue;
            }
            trace!(endpoint = %link.endpoint, kind = %self.kind, "accepted peer");
            self.emit(SocketEvent::Accepted(link.endpoint.clone()));
            self.peers.push(Peer {
                identity: link.identity,
                tx: link.tx,
                rx: link.rx,
                endpoint: link.endpoint,
            });
        }
    }

    /// Load the next deliverable unit into the inbound buffer.
    fn fetch_unit(&mut self) -> Result<()> {
        if !self.kind.can_recv() {
            return Err(DriveshaftError::Unsupported(
                "socket kind does not receive application messages",
            ));
        }
        self.accept_pending();
        if self.peers.is_empty() {
            return Err(DriveshaftError::WouldBlock);
        }

        let len = self.peers.len();
        let mut dead = Vec::new();
        let mut fetched = false;
        'scan: for step in 0..len {
            let idx = (self.next_recv + step) % len;
            loop {
                match self.peers[idx].rx.try_recv() {
                    Ok(mut unit) => {
                        if unit.is_empty() {
                            continue;
                        }
                        if self.kind == SocketKind::Sub && !self.matches_subscription(&unit[0]) {
                            trace!("discarding unit matching no subscription");
                            continue;
                        }
                        if matches!(self.kind, SocketKind::Router | SocketKind::Stream) {
                            unit.insert(0, self.peers[idx].identity.clone());
                        }
                        self.inbound.extend(unit);
                        self.next_recv = (idx + 1) % len;
                        fetched = true;
                        break 'scan;
                    }
                    Err(flume::TryRecvError::Empty) => break,
                    Err(flume::TryRecvError::Disconnected) => {
                        dead.push(idx);
                        break;
                    }
                }
            }
        }
        self.remove_peers(dead);
        if fetched {
            Ok(())
        } else {
            Err(DriveshaftError::WouldBlock)
        }
    }

    fn matches_subscription(&self, first: &Bytes) -> bool {
        self.subscriptions
            .iter()
            .any(|prefix| first.starts_with(prefix))
    }

    /// Stream staging: an empty frame terminates the unit, a lone
    /// identity followed by an empty frame is the peer-close signal.
    /// Returns whether a unit was sealed.
    fn stage_stream(&mut self, bytes: Bytes, more: bool) -> bool {
        if bytes.is_empty() {
            return match self.staged.len() {
                0 => false,
                1 => {
                    self.staged.clear();
                    false
                }
                _ => {
                    self.seal_staged();
                    true
                }
            };
        }
        self.staged.push(bytes);
        if !more && self.staged.len() >= 2 {
            self.seal_staged();
            return true;
        }
        false
    }

    /// Move the staged frames into the outbox as one routed unit.
    fn seal_staged(&mut self) {
        let mut frames: Vec<Bytes> = self.staged.drain(..).collect();
        match self.kind {
            SocketKind::Pub => self.outbox.push_back((Route::Broadcast, frames)),
            SocketKind::Router => {
                if frames.is_empty() {
                    return;
                }
                let identity = frames.remove(0);
                if frames.is_empty() {
                    debug!("dropping routed message with no body");
                    return;
                }
                self.outbox.push_back((Route::Peer(identity), frames));
            }
            SocketKind::Stream => {
                if frames.len() < 2 {
                    return;
                }
                let identity = frames.remove(0);
                let payload = concat_frames(frames);
                self.outbox.push_back((Route::Peer(identity), vec![payload]));
            }
            _ => self.outbox.push_back((Route::AnyPeer, frames)),
        }
    }

    /// Attempt delivery of one unit; returns it back when every candidate
    /// queue is full.
    fn deliver(&mut self, route: Route, unit: WireUnit) -> Option<(Route, WireUnit)> {
        match route {
            Route::Broadcast => {
                let mut dead = Vec::new();
                for (idx, peer) in self.peers.iter().enumerate() {
                    match peer.tx.try_send(unit.clone()) {
                        Ok(()) => {}
                        Err(flume::TrySendError::Full(_)) => {
                            trace!("dropping publication for slow peer");
                        }
                        Err(flume::TrySendError::Disconnected(_)) => dead.push(idx),
                    }
                }
                self.remove_peers(dead);
                None
            }
            Route::Peer(identity) => {
                let Some(idx) = self.peers.iter().position(|p| p.identity == identity) else {
                    debug!("dropping message addressed to unknown peer");
                    return None;
                };
                match self.peers[idx].tx.try_send(unit) {
                    Ok(()) => None,
                    Err(flume::TrySendError::Full(unit)) => Some((Route::Peer(identity), unit)),
                    Err(flume::TrySendError::Disconnected(_)) => {
                        self.remove_peers(vec![idx]);
                        None
                    }
                }
            }
            Route::AnyPeer => {
                if self.peers.is_empty() {
                    return Some((Route::AnyPeer, unit));
                }
                let mut unit = unit;
                let mut dead = Vec::new();
                let len = self.peers.len();
                for step in 0..len {
                    let idx = (self.next_send + step) % len;
                    if dead.contains(&idx) {
                        continue;
                    }
                    match self.peers[idx].tx.try_send(unit) {
                        Ok(()) => {
                            self.next_send = (idx + 1) % len;
                            self.remove_peers(dead);
                            return None;
                        }
                        Err(flume::TrySendError::Full(u)) => unit = u,
                        Err(flume::TrySendError::Disconnected(u)) => {
                            unit = u;
                            dead.push(idx);
                        }
                    }
                }
                self.remove_peers(dead);
                Some((Route::AnyPeer, unit))
            }
        }
    }

    fn remove_peers(&mut self, mut indices: Vec<usize>) {
        if indices.is_empty() {
            return;
        }
        indices.sort_unstable();
        for idx in indices.into_iter().rev() {
            let peer = self.peers.remove(idx);
            debug!(endpoint = %peer.endpoint, "peer disconnected");
            self.emit(SocketEvent::Disconnected(peer.endpoint));
        }
        if self.peers.is_empty() {
            self.next_recv = 0;
            self.next_send = 0;
        } else {
            self.next_recv %= self.peers.len();
            self.next_send %= self.peers.len();
        }
    }

    fn inproc_name(&self, addr: &str) -> Result<String> {
        match Endpoint::parse(addr)? {
            Endpoint::Inproc(name) => Ok(name),
            Endpoint::Tcp(_) => Err(DriveshaftError::Unsupported(
                "tcp transport is not available in this build",
            )),
        }
    }

    fn emit(&self, event: SocketEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}

fn concat_frames(frames: Vec<Bytes>) -> Bytes {
    if frames.len() == 1 {
        return frames.into_iter().next().unwrap_or_default();
    }
    let mut buf = BytesMut::with_capacity(frames.iter().map(Bytes::len).sum());
    for frame in frames {
        buf.extend_from_slice(&frame);
    }
    buf.freeze()
}
