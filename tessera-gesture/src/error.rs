//! Contract violations of the gesture pipeline.
//!
//! Gesture ordering is load-bearing for every consumer above this crate, so a
//! malformed packet or ack sequence is never recovered from. Lower layers
//! report a [`GestureProtocolViolation`]; the provider and recognizer layers
//! escalate it through [`fatal`], which panics.
//!
//! Recoverable conditions, such as a stale touch event rejected by the
//! detector, are reported as `succeeded == false` results instead and never
//! reach this module.

use thiserror::Error;

use crate::packet::GestureSource;

/// Prefix of every panic raised by [`fatal`].
pub const PROTOCOL_VIOLATION_PANIC_PREFIX: &str = "gesture protocol violation";

/// A broken invariant of the touch/gesture protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GestureProtocolViolation {
    /// A packet was acknowledged after it had already been resolved.
    #[error("packet for touch event {unique_touch_event_id} was acked twice")]
    AlreadyAcked {
        /// The id of the touch event the packet belongs to.
        unique_touch_event_id: u32,
    },
    /// An ack arrived while no touch packet was waiting for one.
    #[error("ack for touch event {unique_touch_event_id} with no pending packet")]
    NoPendingPacket {
        /// The id carried by the ack.
        unique_touch_event_id: u32,
    },
    /// An ack arrived for a packet that is not at the head of the queue.
    #[error("ack for touch event {received} arrived while {expected} is pending")]
    AckOutOfOrder {
        /// The id of the packet at the head of the queue.
        expected: u32,
        /// The id carried by the ack.
        received: u32,
    },
    /// A packet with a source that can never be queued reached the filter.
    #[error("packet with source {0:?} cannot be filtered")]
    InvalidPacketSource(GestureSource),
    /// A packet was requested before any touch event was applied.
    #[error("no touch event to build a packet from")]
    NoTouchEvent,
    /// A motion event reported an impossible number of touch points.
    #[error("motion event has an invalid pointer count {0}")]
    InvalidPointerCount(usize),
}

/// Escalates a protocol violation into a panic.
///
/// The panic message always starts with [`PROTOCOL_VIOLATION_PANIC_PREFIX`] so
/// it stays distinguishable from unrelated panics.
#[cold]
#[track_caller]
pub fn fatal(violation: GestureProtocolViolation) -> ! {
    tracing::error!(%violation, "gesture pipeline invariant broken");
    panic!("{PROTOCOL_VIOLATION_PANIC_PREFIX}: {violation}")
}

/// Extension for unwrapping pipeline results into [`fatal`].
pub(crate) trait OrFatal<T> {
    /// Returns the value, or panics through [`fatal`] on a violation.
    fn or_fatal(self) -> T;
}

impl<T> OrFatal<T> for Result<T, GestureProtocolViolation> {
    #[track_caller]
    fn or_fatal(self) -> T {
        match self {
            Ok(value) => value,
            Err(violation) => fatal(violation),
        }
    }
}
