//! Per-consumer gesture provider.
//!
//! A [`GestureProviderAura`] owns the pointer table and the detection pipeline
//! of one consumer. Gestures released while a touch event or an ack is being
//! processed are buffered, and the caller drains them with
//! [`GestureProviderAura::get_and_reset_pending_gestures`] once the call has
//! returned. Gestures released by a timer are handed straight to a
//! [`GestureProviderAuraClient`].

use std::time::Instant;

use tracing::{debug, trace};

use crate::{
    config::GestureProviderConfig,
    error::OrFatal,
    filtered_provider::{FilteredGestureProvider, TouchHandlingResult},
    geometry::GesturePoint,
    gesture_event::{GestureEventData, GestureType},
    motion_event::{MotionEventState, Pointer},
    recognizer::ConsumerId,
    touch_event::{TouchEvent, TouchEventKind},
};

/// Receiver of gestures produced outside of a touch event call.
pub trait GestureProviderAuraClient {
    /// Handles a gesture released for `consumer`.
    fn on_gesture_event(&mut self, consumer: ConsumerId, gesture: GestureEventData);
}

impl GestureProviderAuraClient for Vec<(ConsumerId, GestureEventData)> {
    fn on_gesture_event(&mut self, consumer: ConsumerId, gesture: GestureEventData) {
        self.push((consumer, gesture));
    }
}

/// Gesture pipeline state of a single consumer.
#[derive(Debug)]
pub struct GestureProviderAura {
    consumer: ConsumerId,
    config: GestureProviderConfig,
    pointer_state: MotionEventState,
    filtered_gesture_provider: FilteredGestureProvider,
    /// Set while a touch event or ack is being processed.
    handling_event: bool,
    pending_gestures: Vec<GestureEventData>,
    previous_tap: Option<PreviousTap>,
}

#[derive(Debug, Clone, Copy)]
struct PreviousTap {
    time: Instant,
    location: GesturePoint,
    tap_count: u32,
}

impl GestureProviderAura {
    /// Creates the provider of `consumer`.
    pub fn new(consumer: ConsumerId, config: &GestureProviderConfig) -> Self {
        Self {
            consumer,
            config: config.clone(),
            pointer_state: MotionEventState::new(config.max_touch_points),
            filtered_gesture_provider: FilteredGestureProvider::new(config),
            handling_event: false,
            pending_gestures: Vec::new(),
            previous_tap: None,
        }
    }

    /// The consumer gestures of this provider are attributed to.
    pub fn gesture_consumer(&self) -> ConsumerId {
        self.consumer
    }

    /// Re-attributes the provider, as when its stream is transferred.
    pub fn set_gesture_consumer(&mut self, consumer: ConsumerId) {
        self.consumer = consumer;
    }

    /// Feeds a touch event through the pointer table and the detector.
    ///
    /// An event that is inconsistent with the pointer table, or that the
    /// detector rejects, reports `succeeded == false` and must not be acked.
    /// The pointer table is left as it was before such an event.
    pub fn on_touch_event(&mut self, event: &TouchEvent) -> TouchHandlingResult {
        let previous_pointer_state = self.pointer_state.clone();
        if !self.pointer_state.on_touch(event) {
            trace!(
                consumer = ?self.consumer,
                unique_event_id = event.unique_event_id,
                "touch event rejected by pointer table"
            );
            return TouchHandlingResult::default();
        }

        self.handling_event = true;
        let (result, released) = self
            .filtered_gesture_provider
            .on_touch_event(&self.pointer_state)
            .or_fatal();
        self.on_gesture_events(released, None);
        self.handling_event = false;

        if !result.succeeded {
            trace!(
                consumer = ?self.consumer,
                unique_event_id = event.unique_event_id,
                "touch event rejected by detector"
            );
            self.pointer_state = previous_pointer_state;
            return result;
        }
        self.pointer_state.cleanup_removed_pointers();
        result
    }

    /// Resolves a touch event previously accepted by
    /// [`on_touch_event`](Self::on_touch_event).
    ///
    /// Released gestures are buffered; collect them with
    /// [`get_and_reset_pending_gestures`](Self::get_and_reset_pending_gestures).
    ///
    /// # Panics
    ///
    /// Panics with a protocol violation if the ack does not match the oldest
    /// touch event still waiting for one.
    pub fn on_touch_event_ack(
        &mut self,
        unique_touch_event_id: u32,
        consumed: bool,
        non_blocking: bool,
    ) {
        self.handling_event = true;
        let released = self
            .filtered_gesture_provider
            .on_touch_event_ack(unique_touch_event_id, consumed, non_blocking)
            .or_fatal();
        self.on_gesture_events(released, None);
        self.handling_event = false;
    }

    /// Informs the provider about a contact that went down before it existed.
    ///
    /// A synthetic press at the contact's last position, from its device, is
    /// fed through the pipeline and immediately acked as consumed, so the
    /// contact is tracked without producing gestures.
    pub fn on_touch_enter(&mut self, pointer: &Pointer) {
        let event = TouchEvent::synthesized(
            TouchEventKind::Pressed,
            pointer.details(),
            pointer.location,
            pointer.root_location,
            pointer.source_device_id,
            Instant::now(),
        );
        if self.on_touch_event(&event).succeeded {
            self.on_touch_event_ack(event.unique_event_id, true, false);
        }
        debug!(consumer = ?self.consumer, pointer_id = pointer.id, "touch entered provider");
    }

    /// Fires expired detector timers, delivering their gestures to `client`.
    pub fn on_timer(&mut self, now: Instant, client: &mut dyn GestureProviderAuraClient) {
        let released = self.filtered_gesture_provider.on_timer(now).or_fatal();
        self.on_gesture_events(released, Some(client));
    }

    /// The earliest armed detector timer.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.filtered_gesture_provider.next_timer_deadline()
    }

    /// Takes the gestures buffered by the last touch event or ack.
    pub fn get_and_reset_pending_gestures(&mut self) -> Vec<GestureEventData> {
        std::mem::take(&mut self.pending_gestures)
    }

    /// The contacts this provider currently tracks.
    pub fn pointer_state(&self) -> &MotionEventState {
        &self.pointer_state
    }

    /// Forgets the consumption history of the current sequence.
    pub fn reset_gesture_handling_state(&mut self) {
        self.filtered_gesture_provider.reset_gesture_handling_state();
    }

    /// Applies new settings.
    pub fn update_config(&mut self, config: &GestureProviderConfig) {
        self.config = config.clone();
        self.pointer_state.set_max_touch_points(config.max_touch_points);
        self.filtered_gesture_provider.update_config(config);
    }

    /// Enables or disables dedicated double-tap gestures.
    pub fn set_double_tap_enabled(&mut self, enabled: bool) {
        self.config.double_tap_enabled = enabled;
        self.filtered_gesture_provider.set_double_tap_enabled(enabled);
    }

    fn on_gesture_events(
        &mut self,
        gestures: Vec<GestureEventData>,
        mut client: Option<&mut dyn GestureProviderAuraClient>,
    ) {
        for mut gesture in gestures {
            self.count_tap(&mut gesture);
            if self.handling_event {
                self.pending_gestures.push(gesture);
            } else if let Some(client) = client.as_mut() {
                client.on_gesture_event(self.consumer, gesture);
            } else {
                self.pending_gestures.push(gesture);
            }
        }
    }

    /// Numbers consecutive taps 1, 2, 3, 1, ...
    fn count_tap(&mut self, gesture: &mut GestureEventData) {
        let GestureType::Tap { tap_count } = &mut gesture.details else {
            return;
        };
        let detector = &self.config.detector;
        *tap_count = match self.previous_tap {
            Some(previous)
                if gesture.time.saturating_duration_since(previous.time)
                    <= detector.double_tap_timeout
                    && previous.location.distance_squared_to(gesture.location)
                        <= detector.double_tap_slop * detector.double_tap_slop =>
            {
                previous.tap_count % 3 + 1
            }
            _ => 1,
        };
        self.previous_tap = Some(PreviousTap {
            time: gesture.time,
            location: gesture.location,
            tap_count: *tap_count,
        });
    }
}
