//! Detector and disposition filter, bundled.

use std::time::Instant;

use tracing::trace;

use crate::{
    config::GestureProviderConfig,
    detector::GestureDetector,
    error::GestureProtocolViolation,
    filter::{FilteredGestures, TouchDispositionGestureFilter},
    gesture_event::GestureKind,
    motion_event::{MotionAction, MotionEventState},
    packet::GestureEventDataPacket,
};

/// Outcome of feeding a touch event to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchHandlingResult {
    /// The event was accepted. A rejected event must not be acked.
    pub succeeded: bool,
    /// The current stream has left the touch slop region.
    pub moved_beyond_slop_region: bool,
}

/// Runs detection and queues the result for ack-gated release.
#[derive(Debug)]
pub struct FilteredGestureProvider {
    detector: GestureDetector,
    filter: TouchDispositionGestureFilter,
    moved_beyond_slop_region: bool,
}

impl FilteredGestureProvider {
    /// Creates a provider with the given settings.
    pub fn new(config: &GestureProviderConfig) -> Self {
        Self {
            detector: GestureDetector::new(config),
            filter: TouchDispositionGestureFilter::new(),
            moved_beyond_slop_region: false,
        }
    }

    /// Detects the gestures of the touch event last applied to `state`.
    ///
    /// The returned gestures are those the filter could release right away,
    /// which happens only when earlier packets were resolved out of band.
    pub fn on_touch_event(
        &mut self,
        state: &MotionEventState,
    ) -> Result<(TouchHandlingResult, FilteredGestures), GestureProtocolViolation> {
        if state.action() == MotionAction::Down {
            self.moved_beyond_slop_region = false;
        }
        let Some(gestures) = self.detector.on_touch_event(state) else {
            return Ok((
                TouchHandlingResult {
                    succeeded: false,
                    moved_beyond_slop_region: self.moved_beyond_slop_region,
                },
                FilteredGestures::new(),
            ));
        };
        if gestures
            .iter()
            .any(|gesture| gesture.kind() == GestureKind::ScrollBegin)
        {
            self.moved_beyond_slop_region = true;
        }

        let mut packet = GestureEventDataPacket::from_touch(state)?;
        for gesture in gestures {
            packet.push(gesture);
        }
        trace!(
            source = ?packet.gesture_source(),
            gestures = packet.gestures().len(),
            "packet queued"
        );
        let released = self.filter.on_gesture_packet(packet)?;
        Ok((
            TouchHandlingResult {
                succeeded: true,
                moved_beyond_slop_region: self.moved_beyond_slop_region,
            },
            released,
        ))
    }

    /// Resolves the packet of a previously accepted touch event.
    pub fn on_touch_event_ack(
        &mut self,
        unique_touch_event_id: u32,
        consumed: bool,
        non_blocking: bool,
    ) -> Result<FilteredGestures, GestureProtocolViolation> {
        self.filter
            .on_touch_event_ack(unique_touch_event_id, consumed, non_blocking)
    }

    /// Fires expired detector timers and releases their gestures.
    pub fn on_timer(&mut self, now: Instant) -> Result<FilteredGestures, GestureProtocolViolation> {
        let mut out = FilteredGestures::new();
        for gesture in self.detector.on_timer(now) {
            let packet = GestureEventDataPacket::from_touch_timeout(gesture);
            out.extend(self.filter.on_gesture_packet(packet)?);
        }
        Ok(out)
    }

    /// The earliest armed detector timer.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.detector.next_deadline()
    }

    /// Applies new detection settings.
    pub fn update_config(&mut self, config: &GestureProviderConfig) {
        self.detector.update_config(config);
    }

    /// Enables or disables dedicated double-tap gestures.
    pub fn set_double_tap_enabled(&mut self, enabled: bool) {
        self.detector.set_double_tap_enabled(enabled);
    }

    /// Forgets the consumption history kept by the filter.
    pub fn reset_gesture_handling_state(&mut self) {
        self.filter.reset_gesture_handling_state();
    }

    /// Drops the detector's stream state and timers.
    pub fn reset_detection(&mut self) {
        self.detector.reset();
        self.moved_beyond_slop_region = false;
    }

    /// Whether packets are still waiting for acks.
    pub fn has_pending_packets(&self) -> bool {
        !self.filter.is_empty()
    }
}
