//! Atomic message forwarding between two sockets.
//!
//! The relay primitive under every device: move exactly one complete
//! multipart message from a source socket to a destination socket. Frames
//! stream through one at a time, so only a single frame is held in flight
//! regardless of message size, and the destination's staging buffer
//! guarantees the peer sees either the whole message or nothing.

use tracing::trace;

use crate::error::{DriveshaftError, Result};
use crate::socket::Socket;

/// What a forward pass accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// One complete message moved from source to destination.
    Forwarded,
    /// The source had no complete message available.
    Idle,
    /// The destination cannot accept more right now; the partial or whole
    /// message is retained inside the destination socket and goes out on a
    /// later flush.
    Blocked,
}

/// Forward one complete message from `src` to `dst`.
///
/// Retries a retained backlog on `dst` before pulling new data, so a
/// previously blocked message is never overtaken. `Interrupted` from
/// either side is retried in place; `Terminated` and fatal errors
/// propagate.
pub fn forward_message(src: &mut Socket, dst: &mut Socket) -> Result<ForwardOutcome> {
    if dst.has_pending() {
        match dst.flush() {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                trace!("destination backlog still blocked");
                return Ok(ForwardOutcome::Blocked);
            }
            Err(e) => return Err(e),
        }
    }

    let mut moved_any = false;
    loop {
        let (frame, more) = match src.try_recv() {
            Ok(pair) => pair,
            Err(DriveshaftError::WouldBlock) if !moved_any => return Ok(ForwardOutcome::Idle),
            Err(e) if e.is_transient() => continue,
            Err(e) => return Err(e),
        };
        moved_any = true;
        match dst.try_send(frame, more) {
            Ok(()) if !more => return Ok(ForwardOutcome::Forwarded),
            Ok(()) => {}
            // the frame was accepted and staged; delivery waits on capacity
            Err(e) if e.is_transient() => {
                if !more {
                    return Ok(ForwardOutcome::Blocked);
                }
            }
            Err(e) => return Err(e),
        }
    }
}
