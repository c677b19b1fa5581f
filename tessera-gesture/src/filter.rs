//! Ack-gated release of gesture packets.
//!
//! [`TouchDispositionGestureFilter`] keeps one packet per touch event in
//! arrival order and only releases the gestures of the head packet once the
//! touch event it belongs to has been acknowledged. Gesture delivery therefore
//! lags touch acks; this back-pressure is what lets a consumer that handles
//! touches itself suppress the gestures those touches would produce.
//!
//! # Suppression
//!
//! Released packets pass through a per-sequence handling state:
//!
//! - if the first touch of a sequence was consumed, every gesture of that
//!   sequence is dropped;
//! - if the current touch was consumed, every gesture that does not close an
//!   ongoing stream is dropped;
//! - a gesture whose antecedent was dropped (a scroll update after a dropped
//!   scroll begin, a tap after a dropped tap down) is dropped.
//!
//! Streams the consumer has seen begin are always closed: a tap cancel is
//! synthesized when a gesture is dropped after a delivered tap down, and a
//! scroll end when a sequence finishes while a delivered scroll is open.
//!
//! # Timeouts
//!
//! Timer packets have no touch event to wait for. They bypass the queue and
//! are released immediately, ahead of any packet still pending.

use std::{collections::VecDeque, time::Instant};

use tracing::{debug, trace};

use crate::{
    error::GestureProtocolViolation,
    geometry::GesturePoint,
    gesture_event::{GESTURE_KIND_COUNT, GestureEventData, GestureKind, GestureType},
    packet::{AckState, GestureEventDataPacket, GestureSource},
};

/// Gestures released by the filter, in dispatch order.
pub type FilteredGestures = Vec<GestureEventData>;

/// Consumption of the touch sequence currently being released.
#[derive(Debug, Clone, Default)]
struct GestureHandlingState {
    start_touch_consumed: bool,
    current_touch_consumed: bool,
    dropped: [bool; GESTURE_KIND_COUNT],
}

impl GestureHandlingState {
    fn on_touch_event_ack(&mut self, consumed: bool, is_sequence_start: bool) {
        if is_sequence_start {
            self.start_touch_consumed = consumed;
        }
        self.current_touch_consumed = consumed;
    }

    /// Returns `true` if a gesture of `kind` must be dropped.
    fn filter(&mut self, kind: GestureKind) -> bool {
        let antecedent_dropped = kind
            .antecedent()
            .is_some_and(|antecedent| self.dropped[antecedent.index()]);
        let drop = antecedent_dropped
            || self.start_touch_consumed
            || (self.current_touch_consumed && !kind.is_terminating());
        self.dropped[kind.index()] = drop;
        drop
    }
}

/// Releases gesture packets in touch order, once their touch is acked.
#[derive(Debug, Default)]
pub struct TouchDispositionGestureFilter {
    queue: VecDeque<GestureEventDataPacket>,
    state: GestureHandlingState,
    /// A delivered tap down that has not been closed, kept as the template
    /// for a synthesized tap cancel.
    open_tap: Option<GestureEventData>,
    /// A delivered scroll begin that has not been closed.
    open_scroll: Option<GestureEventData>,
}

impl TouchDispositionGestureFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits the packet of a touch event or timer.
    ///
    /// Returns the gestures that can be released right away: those of a
    /// timeout packet, or those of queued packets that were already resolved.
    pub fn on_gesture_packet(
        &mut self,
        packet: GestureEventDataPacket,
    ) -> Result<FilteredGestures, GestureProtocolViolation> {
        let mut out = FilteredGestures::new();
        match packet.gesture_source() {
            source @ (GestureSource::Undefined | GestureSource::Invalid) => {
                return Err(GestureProtocolViolation::InvalidPacketSource(source));
            }
            GestureSource::TouchTimeout => {
                // The handling state trails any queued packet, so it only
                // applies when nothing is queued.
                let apply_state = self.queue.is_empty();
                self.send_timeout_packet(packet, apply_state, &mut out);
            }
            _ => {
                self.queue.push_back(packet);
                self.send_acked_events(&mut out);
            }
        }
        Ok(out)
    }

    /// Resolves the packet of the touch event `unique_touch_event_id`.
    ///
    /// Acks must arrive in the order the touch events were submitted, except
    /// that the newest packet may be acked ahead of older ones. Its gestures
    /// are still held until everything before it is released. The returned
    /// gestures are those of every packet that became releasable.
    pub fn on_touch_event_ack(
        &mut self,
        unique_touch_event_id: u32,
        consumed: bool,
        non_blocking: bool,
    ) -> Result<FilteredGestures, GestureProtocolViolation> {
        let Some(expected) = self.queue.front().map(|head| head.unique_touch_event_id()) else {
            return Err(GestureProtocolViolation::NoPendingPacket {
                unique_touch_event_id,
            });
        };
        // Synthetic events are acked as soon as they are dispatched, possibly
        // while an earlier platform event still waits for its ack. Their
        // packet is always the newest one.
        let packet = if expected == unique_touch_event_id {
            self.queue.front_mut()
        } else {
            self.queue
                .back_mut()
                .filter(|tail| tail.unique_touch_event_id() == unique_touch_event_id)
        };
        let Some(packet) = packet else {
            return Err(GestureProtocolViolation::AckOutOfOrder {
                expected,
                received: unique_touch_event_id,
            });
        };
        packet.ack(consumed, non_blocking)?;

        let mut out = FilteredGestures::new();
        self.send_acked_events(&mut out);
        Ok(out)
    }

    /// Forgets the consumption history of the current sequence.
    ///
    /// Used when the stream changes hands and earlier suppression decisions
    /// no longer apply.
    pub fn reset_gesture_handling_state(&mut self) {
        self.state = GestureHandlingState::default();
        self.open_tap = None;
        self.open_scroll = None;
    }

    /// Whether no packet is waiting for an ack.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of packets waiting for an ack or behind one that is.
    pub fn pending_packet_count(&self) -> usize {
        self.queue.len()
    }

    fn send_acked_events(&mut self, out: &mut FilteredGestures) {
        while self
            .queue
            .front()
            .is_some_and(|head| head.ack_state() != AckState::Pending)
        {
            if let Some(packet) = self.queue.pop_front() {
                self.filter_and_send_packet(packet, out);
            }
        }
    }

    fn filter_and_send_packet(
        &mut self,
        packet: GestureEventDataPacket,
        out: &mut FilteredGestures,
    ) {
        let source = packet.gesture_source();
        let consumed = packet.ack_state() == AckState::Consumed;
        if source == GestureSource::TouchSequenceStart {
            self.state = GestureHandlingState::default();
        }
        self.state
            .on_touch_event_ack(consumed, source == GestureSource::TouchSequenceStart);

        let template = SynthesisTemplate::of(&packet);
        for gesture in packet.into_gestures() {
            if self.state.filter(gesture.kind()) {
                trace!(kind = ?gesture.kind(), consumed, "gesture suppressed");
                self.cancel_tap_if_necessary(&template, out);
                continue;
            }
            self.send_gesture(gesture, out);
        }

        if matches!(
            source,
            GestureSource::TouchSequenceEnd | GestureSource::TouchSequenceCancel
        ) {
            self.end_scroll_if_necessary(&template, out);
            self.cancel_tap_if_necessary(&template, out);
        }
    }

    fn send_timeout_packet(
        &mut self,
        packet: GestureEventDataPacket,
        apply_state: bool,
        out: &mut FilteredGestures,
    ) {
        let template = SynthesisTemplate::of(&packet);
        for gesture in packet.into_gestures() {
            if apply_state && self.state.filter(gesture.kind()) {
                trace!(kind = ?gesture.kind(), "timeout gesture suppressed");
                self.cancel_tap_if_necessary(&template, out);
                continue;
            }
            self.send_gesture(gesture, out);
        }
    }

    fn send_gesture(&mut self, gesture: GestureEventData, out: &mut FilteredGestures) {
        match gesture.kind() {
            GestureKind::TapDown => self.open_tap = Some(gesture.clone()),
            GestureKind::Tap
            | GestureKind::DoubleTap
            | GestureKind::TapCancel
            | GestureKind::LongTap => self.open_tap = None,
            GestureKind::ScrollBegin => self.open_scroll = Some(gesture.clone()),
            GestureKind::ScrollEnd | GestureKind::FlingStart => self.open_scroll = None,
            _ => {}
        }
        out.push(gesture);
    }

    fn cancel_tap_if_necessary(
        &mut self,
        template: &SynthesisTemplate,
        out: &mut FilteredGestures,
    ) {
        if let Some(tap_down) = self.open_tap.take() {
            debug!(
                unique_touch_event_id = template.unique_touch_event_id,
                "synthesizing tap cancel"
            );
            out.push(template.build(GestureType::TapCancel, &tap_down));
        }
    }

    fn end_scroll_if_necessary(
        &mut self,
        template: &SynthesisTemplate,
        out: &mut FilteredGestures,
    ) {
        if let Some(scroll_begin) = self.open_scroll.take() {
            debug!(
                unique_touch_event_id = template.unique_touch_event_id,
                "synthesizing scroll end"
            );
            out.push(template.build(GestureType::ScrollEnd, &scroll_begin));
        }
    }
}

/// Where and when synthesized terminators of a packet are placed.
struct SynthesisTemplate {
    unique_touch_event_id: u32,
    timestamp: Instant,
    location: GesturePoint,
    raw_location: GesturePoint,
}

impl SynthesisTemplate {
    fn of(packet: &GestureEventDataPacket) -> Self {
        Self {
            unique_touch_event_id: packet.unique_touch_event_id(),
            timestamp: packet.timestamp(),
            location: packet.touch_location(),
            raw_location: packet.raw_touch_location(),
        }
    }

    fn build(&self, details: GestureType, opener: &GestureEventData) -> GestureEventData {
        let mut gesture = GestureEventData::with_details(details, opener);
        gesture.time = self.timestamp;
        gesture.location = self.location;
        gesture.raw_location = self.raw_location;
        gesture.unique_touch_event_id = self.unique_touch_event_id;
        gesture
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        geometry::GestureRect,
        motion_event::MotionEventState,
        touch_event::{TouchEvent, TouchEventKind},
    };

    /// Builds packets the way the provider does, from a real pointer table.
    struct PacketSource {
        state: MotionEventState,
        start: Instant,
        elapsed: u64,
    }

    impl PacketSource {
        fn new() -> Self {
            Self {
                state: MotionEventState::new(16),
                start: Instant::now(),
                elapsed: 0,
            }
        }

        fn packet(
            &mut self,
            kind: TouchEventKind,
            id: i32,
            gestures: &[GestureType],
        ) -> GestureEventDataPacket {
            self.elapsed += 10;
            let time = self.start + Duration::from_millis(self.elapsed);
            let event = TouchEvent::new(kind, id, GesturePoint::new(1.0, 2.0), time);
            assert!(self.state.on_touch(&event));
            let mut packet = GestureEventDataPacket::from_touch(&self.state).expect("valid");
            for &details in gestures {
                packet.push(GestureEventData::new(
                    details,
                    id,
                    time,
                    GesturePoint::new(1.0, 2.0),
                    GesturePoint::new(1.0, 2.0),
                    1,
                    GestureRect::ZERO,
                ));
            }
            self.state.cleanup_removed_pointers();
            packet
        }
    }

    fn kinds(gestures: &[GestureEventData]) -> Vec<GestureKind> {
        gestures.iter().map(GestureEventData::kind).collect()
    }

    const SCROLL_BEGIN: GestureType = GestureType::ScrollBegin {
        delta_x_hint: 0.0,
        delta_y_hint: 20.0,
    };
    const SCROLL_UPDATE: GestureType = GestureType::ScrollUpdate {
        delta_x: 0.0,
        delta_y: 20.0,
    };

    #[test]
    fn test_gestures_wait_for_ack() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        let down = source.packet(TouchEventKind::Pressed, 1, &[GestureType::TapDown]);
        let down_id = down.unique_touch_event_id();
        assert!(filter.on_gesture_packet(down).expect("ok").is_empty());

        let up = source.packet(TouchEventKind::Released, 1, &[GestureType::Tap { tap_count: 1 }]);
        let up_id = up.unique_touch_event_id();
        assert!(filter.on_gesture_packet(up).expect("ok").is_empty());
        assert_eq!(filter.pending_packet_count(), 2);

        let released = filter.on_touch_event_ack(down_id, false, false).expect("ok");
        assert_eq!(kinds(&released), vec![GestureKind::TapDown]);
        assert_eq!(released[0].unique_touch_event_id, down_id);

        let released = filter.on_touch_event_ack(up_id, false, true).expect("ok");
        assert_eq!(kinds(&released), vec![GestureKind::Tap]);
        assert!(released[0].non_blocking);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_consumed_scroll_begin_is_dropped() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        let down = source.packet(TouchEventKind::Pressed, 1, &[]);
        let down_id = down.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");
        filter.on_touch_event_ack(down_id, false, false).expect("ok");

        let moved = source.packet(TouchEventKind::Moved, 1, &[SCROLL_BEGIN, SCROLL_UPDATE]);
        let moved_id = moved.unique_touch_event_id();
        filter.on_gesture_packet(moved).expect("ok");
        assert!(filter.on_touch_event_ack(moved_id, true, false).expect("ok").is_empty());

        // The scroll never began for the consumer, so its end is dropped too.
        let up = source.packet(TouchEventKind::Released, 1, &[GestureType::ScrollEnd]);
        let up_id = up.unique_touch_event_id();
        filter.on_gesture_packet(up).expect("ok");
        assert!(filter.on_touch_event_ack(up_id, false, false).expect("ok").is_empty());
    }

    #[test]
    fn test_consumed_start_drops_whole_sequence() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        let down = source.packet(TouchEventKind::Pressed, 1, &[GestureType::TapDown]);
        let down_id = down.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");
        assert!(filter.on_touch_event_ack(down_id, true, false).expect("ok").is_empty());

        let moved = source.packet(TouchEventKind::Moved, 1, &[SCROLL_BEGIN]);
        let moved_id = moved.unique_touch_event_id();
        filter.on_gesture_packet(moved).expect("ok");
        assert!(filter.on_touch_event_ack(moved_id, false, false).expect("ok").is_empty());

        // A new sequence starts from a clean state.
        let up = source.packet(TouchEventKind::Released, 1, &[]);
        let up_id = up.unique_touch_event_id();
        filter.on_gesture_packet(up).expect("ok");
        filter.on_touch_event_ack(up_id, false, false).expect("ok");
        let down = source.packet(TouchEventKind::Pressed, 1, &[GestureType::TapDown]);
        let down_id = down.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");
        assert_eq!(
            kinds(&filter.on_touch_event_ack(down_id, false, false).expect("ok")),
            vec![GestureKind::TapDown]
        );
    }

    #[test]
    fn test_tap_cancel_synthesized_when_tap_dropped() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        let down = source.packet(TouchEventKind::Pressed, 1, &[GestureType::TapDown]);
        let down_id = down.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");
        filter.on_touch_event_ack(down_id, false, false).expect("ok");

        let up = source.packet(TouchEventKind::Released, 1, &[GestureType::Tap { tap_count: 1 }]);
        let up_id = up.unique_touch_event_id();
        filter.on_gesture_packet(up).expect("ok");
        let released = filter.on_touch_event_ack(up_id, true, false).expect("ok");
        assert_eq!(kinds(&released), vec![GestureKind::TapCancel]);
        assert_eq!(released[0].unique_touch_event_id, up_id);
    }

    #[test]
    fn test_scroll_end_synthesized_on_cancel() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        for (kind, gestures) in [
            (TouchEventKind::Pressed, vec![GestureType::TapDown]),
            (
                TouchEventKind::Moved,
                vec![GestureType::TapCancel, SCROLL_BEGIN, SCROLL_UPDATE],
            ),
        ] {
            let packet = source.packet(kind, 1, &gestures);
            let id = packet.unique_touch_event_id();
            filter.on_gesture_packet(packet).expect("ok");
            filter.on_touch_event_ack(id, false, false).expect("ok");
        }

        let cancel = source.packet(TouchEventKind::Cancelled, 1, &[]);
        let cancel_id = cancel.unique_touch_event_id();
        filter.on_gesture_packet(cancel).expect("ok");
        let released = filter.on_touch_event_ack(cancel_id, false, false).expect("ok");
        assert_eq!(kinds(&released), vec![GestureKind::ScrollEnd]);
    }

    #[test]
    fn test_timeout_bypasses_pending_packet() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        let down = source.packet(TouchEventKind::Pressed, 1, &[GestureType::TapDown]);
        let down_id = down.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");

        let mut show_press = GestureEventData::new(
            GestureType::ShowPress,
            1,
            Instant::now(),
            GesturePoint::ZERO,
            GesturePoint::ZERO,
            1,
            GestureRect::ZERO,
        );
        show_press.unique_touch_event_id = down_id;
        let released = filter
            .on_gesture_packet(GestureEventDataPacket::from_touch_timeout(show_press))
            .expect("ok");
        assert_eq!(kinds(&released), vec![GestureKind::ShowPress]);
        assert_eq!(filter.pending_packet_count(), 1);

        let released = filter.on_touch_event_ack(down_id, false, false).expect("ok");
        assert_eq!(kinds(&released), vec![GestureKind::TapDown]);
    }

    #[test]
    fn test_ack_violations() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();
        assert_eq!(
            filter.on_touch_event_ack(9, false, false),
            Err(GestureProtocolViolation::NoPendingPacket {
                unique_touch_event_id: 9
            })
        );

        let down = source.packet(TouchEventKind::Pressed, 1, &[]);
        let down_id = down.unique_touch_event_id();
        let moved = source.packet(TouchEventKind::Moved, 1, &[]);
        let moved_id = moved.unique_touch_event_id();
        let up = source.packet(TouchEventKind::Released, 1, &[]);
        let up_id = up.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");
        filter.on_gesture_packet(moved).expect("ok");
        filter.on_gesture_packet(up).expect("ok");
        assert_eq!(
            filter.on_touch_event_ack(moved_id, false, false),
            Err(GestureProtocolViolation::AckOutOfOrder {
                expected: down_id,
                received: moved_id
            })
        );
        filter.on_touch_event_ack(up_id, false, false).expect("ok");
        assert_eq!(
            filter.on_touch_event_ack(up_id, false, false),
            Err(GestureProtocolViolation::AlreadyAcked {
                unique_touch_event_id: up_id
            })
        );
        filter.on_touch_event_ack(down_id, false, false).expect("ok");
        filter.on_touch_event_ack(moved_id, false, false).expect("ok");
        assert!(filter.is_empty());
        assert!(matches!(
            filter.on_touch_event_ack(moved_id, false, false),
            Err(GestureProtocolViolation::NoPendingPacket { .. })
        ));
    }

    #[test]
    fn test_newest_packet_acked_early_is_held() {
        let mut source = PacketSource::new();
        let mut filter = TouchDispositionGestureFilter::new();

        let down = source.packet(TouchEventKind::Pressed, 1, &[GestureType::TapDown]);
        let down_id = down.unique_touch_event_id();
        filter.on_gesture_packet(down).expect("ok");
        let cancel = source.packet(TouchEventKind::Cancelled, 1, &[GestureType::TapCancel]);
        let cancel_id = cancel.unique_touch_event_id();
        filter.on_gesture_packet(cancel).expect("ok");

        assert!(filter.on_touch_event_ack(cancel_id, false, false).expect("ok").is_empty());
        let released = filter.on_touch_event_ack(down_id, false, false).expect("ok");
        assert_eq!(
            kinds(&released),
            vec![GestureKind::TapDown, GestureKind::TapCancel]
        );
        assert!(filter.is_empty());
    }
}
