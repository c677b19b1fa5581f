//! Batches of gestures attributed to one touch event or one timer firing.
//!
//! A [`GestureEventDataPacket`] is the unit the disposition filter queues.
//! Insertion order of its gestures is dispatch order. The packet starts
//! [`AckState::Pending`] and is resolved exactly once through
//! [`GestureEventDataPacket::ack`]; timeout packets have no touch event to
//! wait for and are created already resolved.

use std::time::Instant;

use smallvec::SmallVec;

use crate::{
    error::GestureProtocolViolation,
    gesture_event::GestureEventData,
    geometry::GesturePoint,
    motion_event::{MotionAction, MotionEventState},
};

/// What produced the gestures of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureSource {
    /// Not yet determined.
    Undefined,
    /// Produced from an event that cannot be attributed.
    Invalid,
    /// The first contact of a stream went down.
    TouchSequenceStart,
    /// The last contact of a stream lifted.
    TouchSequenceEnd,
    /// The stream was cancelled.
    TouchSequenceCancel,
    /// An additional contact went down.
    TouchStart,
    /// A contact moved.
    TouchMove,
    /// A contact lifted while others remain down.
    TouchEnd,
    /// A detector timer fired.
    TouchTimeout,
}

impl From<MotionAction> for GestureSource {
    fn from(action: MotionAction) -> Self {
        match action {
            MotionAction::Down => GestureSource::TouchSequenceStart,
            MotionAction::Move => GestureSource::TouchMove,
            MotionAction::Up => GestureSource::TouchSequenceEnd,
            MotionAction::Cancel => GestureSource::TouchSequenceCancel,
            MotionAction::PointerDown => GestureSource::TouchStart,
            MotionAction::PointerUp => GestureSource::TouchEnd,
        }
    }
}

/// Disposition of the touch event a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckState {
    /// The touch event has not been acknowledged yet.
    Pending,
    /// The consumer handled the touch event itself.
    Consumed,
    /// The consumer did not handle the touch event.
    Unconsumed,
}

/// The gestures produced in response to a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEventDataPacket {
    timestamp: Instant,
    gesture_source: GestureSource,
    touch_location: GesturePoint,
    raw_touch_location: GesturePoint,
    gestures: SmallVec<[GestureEventData; 2]>,
    ack_state: AckState,
    unique_touch_event_id: u32,
}

impl GestureEventDataPacket {
    fn new(
        timestamp: Instant,
        gesture_source: GestureSource,
        touch_location: GesturePoint,
        raw_touch_location: GesturePoint,
        unique_touch_event_id: u32,
    ) -> Self {
        Self {
            timestamp,
            gesture_source,
            touch_location,
            raw_touch_location,
            gestures: SmallVec::new(),
            ack_state: AckState::Pending,
            unique_touch_event_id,
        }
    }

    /// Builds the empty packet of the touch event last applied to `state`.
    ///
    /// The source follows from the derived action, and the location is the
    /// position of the contact that changed.
    pub fn from_touch(state: &MotionEventState) -> Result<Self, GestureProtocolViolation> {
        let timestamp = state
            .event_time()
            .ok_or(GestureProtocolViolation::NoTouchEvent)?;
        let pointer = state
            .action_pointer()
            .ok_or(GestureProtocolViolation::InvalidPointerCount(
                state.pointer_count(),
            ))?;
        Ok(Self::new(
            timestamp,
            GestureSource::from(state.action()),
            pointer.location,
            pointer.root_location,
            state.unique_event_id(),
        ))
    }

    /// Wraps a timer-produced gesture.
    ///
    /// The packet keeps the gesture's attribution and is already resolved.
    pub fn from_touch_timeout(gesture: GestureEventData) -> Self {
        let mut packet = Self::new(
            gesture.time,
            GestureSource::TouchTimeout,
            gesture.location,
            gesture.raw_location,
            gesture.unique_touch_event_id,
        );
        packet.ack_state = AckState::Unconsumed;
        packet.gestures.push(gesture);
        packet
    }

    /// Appends a gesture, attributing it to this packet's touch event.
    pub fn push(&mut self, mut gesture: GestureEventData) {
        gesture.unique_touch_event_id = self.unique_touch_event_id;
        self.gestures.push(gesture);
    }

    /// Resolves the packet.
    ///
    /// `non_blocking` is copied onto every contained gesture. Resolving a
    /// packet twice is a protocol violation.
    pub fn ack(
        &mut self,
        consumed: bool,
        non_blocking: bool,
    ) -> Result<(), GestureProtocolViolation> {
        if self.ack_state != AckState::Pending {
            return Err(GestureProtocolViolation::AlreadyAcked {
                unique_touch_event_id: self.unique_touch_event_id,
            });
        }
        self.ack_state = if consumed {
            AckState::Consumed
        } else {
            AckState::Unconsumed
        };
        for gesture in &mut self.gestures {
            gesture.non_blocking = non_blocking;
        }
        Ok(())
    }

    /// When the source happened.
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// What produced the gestures.
    pub fn gesture_source(&self) -> GestureSource {
        self.gesture_source
    }

    /// Position of the contact that produced the packet.
    pub fn touch_location(&self) -> GesturePoint {
        self.touch_location
    }

    /// Root position of the contact that produced the packet.
    pub fn raw_touch_location(&self) -> GesturePoint {
        self.raw_touch_location
    }

    /// The gestures, in dispatch order.
    pub fn gestures(&self) -> &[GestureEventData] {
        &self.gestures
    }

    /// Disposition of the originating touch event.
    pub fn ack_state(&self) -> AckState {
        self.ack_state
    }

    /// Id of the originating touch event.
    pub fn unique_touch_event_id(&self) -> u32 {
        self.unique_touch_event_id
    }

    pub(crate) fn into_gestures(self) -> SmallVec<[GestureEventData; 2]> {
        self.gestures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::GestureRect,
        gesture_event::GestureType,
        touch_event::{TouchEvent, TouchEventKind},
    };

    fn gesture(details: GestureType) -> GestureEventData {
        GestureEventData::new(
            details,
            1,
            Instant::now(),
            GesturePoint::ZERO,
            GesturePoint::ZERO,
            1,
            GestureRect::ZERO,
        )
    }

    fn state_after(kinds: &[(TouchEventKind, i32)]) -> (MotionEventState, u32) {
        let mut state = MotionEventState::new(16);
        let mut last_id = 0;
        for &(kind, id) in kinds {
            state.cleanup_removed_pointers();
            let event = TouchEvent::new(kind, id, GesturePoint::new(3.0, 4.0), Instant::now());
            last_id = event.unique_event_id;
            assert!(state.on_touch(&event));
        }
        (state, last_id)
    }

    #[test]
    fn test_source_from_action() {
        use TouchEventKind::*;
        let cases = [
            (vec![(Pressed, 1)], GestureSource::TouchSequenceStart),
            (vec![(Pressed, 1), (Moved, 1)], GestureSource::TouchMove),
            (vec![(Pressed, 1), (Released, 1)], GestureSource::TouchSequenceEnd),
            (vec![(Pressed, 1), (Cancelled, 1)], GestureSource::TouchSequenceCancel),
            (vec![(Pressed, 1), (Pressed, 2)], GestureSource::TouchStart),
            (
                vec![(Pressed, 1), (Pressed, 2), (Released, 2)],
                GestureSource::TouchEnd,
            ),
        ];
        for (events, expected) in cases {
            let (state, id) = state_after(&events);
            let packet = GestureEventDataPacket::from_touch(&state).expect("valid state");
            assert_eq!(packet.gesture_source(), expected);
            assert_eq!(packet.unique_touch_event_id(), id);
            assert_eq!(packet.ack_state(), AckState::Pending);
            assert_eq!(packet.touch_location(), GesturePoint::new(3.0, 4.0));
        }
    }

    #[test]
    fn test_from_touch_without_event_is_violation() {
        let state = MotionEventState::new(16);
        assert_eq!(
            GestureEventDataPacket::from_touch(&state),
            Err(GestureProtocolViolation::NoTouchEvent)
        );
    }

    #[test]
    fn test_from_touch_after_cleanup_is_violation() {
        let (mut state, _) = state_after(&[
            (TouchEventKind::Pressed, 1),
            (TouchEventKind::Released, 1),
        ]);
        state.cleanup_removed_pointers();
        assert_eq!(
            GestureEventDataPacket::from_touch(&state),
            Err(GestureProtocolViolation::InvalidPointerCount(0))
        );
    }

    #[test]
    fn test_push_attributes_gestures() {
        let (state, id) = state_after(&[(TouchEventKind::Pressed, 1)]);
        let mut packet = GestureEventDataPacket::from_touch(&state).expect("valid state");
        packet.push(gesture(GestureType::TapDown));
        packet.push(gesture(GestureType::ShowPress));
        assert_eq!(packet.gestures().len(), 2);
        assert!(packet.gestures().iter().all(|g| g.unique_touch_event_id == id));
        assert_eq!(packet.gestures()[1].kind(), crate::GestureKind::ShowPress);
    }

    #[test]
    fn test_ack_once() {
        let (state, id) = state_after(&[(TouchEventKind::Pressed, 1)]);
        let mut packet = GestureEventDataPacket::from_touch(&state).expect("valid state");
        packet.push(gesture(GestureType::TapDown));
        assert_eq!(packet.ack(true, true), Ok(()));
        assert_eq!(packet.ack_state(), AckState::Consumed);
        assert!(packet.gestures()[0].non_blocking);
        assert_eq!(
            packet.ack(false, false),
            Err(GestureProtocolViolation::AlreadyAcked {
                unique_touch_event_id: id
            })
        );
        assert_eq!(packet.ack_state(), AckState::Consumed);
    }

    #[test]
    fn test_timeout_packet_is_resolved() {
        let mut long_press = gesture(GestureType::LongPress);
        long_press.unique_touch_event_id = 42;
        let packet = GestureEventDataPacket::from_touch_timeout(long_press);
        assert_eq!(packet.gesture_source(), GestureSource::TouchTimeout);
        assert_ne!(packet.ack_state(), AckState::Pending);
        assert_eq!(packet.unique_touch_event_id(), 42);
        assert_eq!(packet.gestures().len(), 1);
    }
}
