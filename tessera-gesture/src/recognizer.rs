//! Touch stream ownership and gesture routing across consumers.
//!
//! The [`GestureRecognizer`] is the context object a host constructs once and
//! passes around. It keeps three tables:
//!
//! - which consumer every pointer id that is down is bound to;
//! - which provider (an arena slot) every consumer owns;
//! - which provider processed every touch event still awaiting its ack, so
//!   an ack arriving after a transfer still reaches the right provider.
//!
//! Acks for events whose provider has since been destroyed are remembered
//! separately and resolve to nothing.
//!
//! Output flows through registered [`GestureEventHelper`]s. Cancellation and
//! transfer inject synthetic touch events; those are dispatched through the
//! helper and acked on the spot, closing the loop without a platform round
//! trip.

use std::time::Instant;

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
    config::GestureRecognizerConfig,
    filtered_provider::TouchHandlingResult,
    geometry::GesturePoint,
    gesture_event::GestureEventData,
    motion_event::Pointer,
    provider::GestureProviderAura,
    touch_event::{TouchEvent, TouchEventKind},
};

/// Opaque handle of a UI-side owner of touch streams, such as a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerId(pub u64);

slotmap::new_key_type! {
    /// Arena slot of a [`GestureProviderAura`].
    pub struct ProviderKey;
}

/// Handle returned by [`GestureRecognizer::add_helper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HelperId(u64);

/// The host side of gesture dispatch.
pub trait GestureEventHelper {
    /// Whether this helper delivers events to `consumer`.
    fn can_dispatch_to_consumer(&self, consumer: ConsumerId) -> bool;

    /// Delivers a gesture to `consumer`.
    fn dispatch_gesture_event(&mut self, consumer: ConsumerId, gesture: &GestureEventData);

    /// Delivers a synthesized touch event to `consumer`.
    ///
    /// Returns whether the consumer handled the event itself.
    fn dispatch_synthetic_touch_event(&mut self, consumer: ConsumerId, event: &TouchEvent) -> bool;
}

/// What happens to the source consumer's touches on a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferTouchesBehavior {
    /// The source consumer sees its touches cancelled.
    #[default]
    Cancel,
    /// The source consumer is not told about the transfer.
    DontCancel,
}

/// Routes touch streams to per-consumer gesture providers.
pub struct GestureRecognizer {
    config: GestureRecognizerConfig,
    providers: SlotMap<ProviderKey, GestureProviderAura>,
    consumer_gesture_provider: HashMap<ConsumerId, ProviderKey>,
    touch_id_target: HashMap<i32, ConsumerId>,
    event_to_gesture_provider: HashMap<u32, ProviderKey>,
    /// Unacked events of destroyed providers.
    orphaned_events: HashSet<u32>,
    helpers: Vec<(HelperId, Box<dyn GestureEventHelper>)>,
    next_helper_id: u64,
}

impl std::fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureRecognizer")
            .field("config", &self.config)
            .field("consumer_gesture_provider", &self.consumer_gesture_provider)
            .field("touch_id_target", &self.touch_id_target)
            .field("event_to_gesture_provider", &self.event_to_gesture_provider)
            .field("orphaned_events", &self.orphaned_events)
            .field("helpers", &self.helpers.len())
            .finish_non_exhaustive()
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureRecognizerConfig::default())
    }
}

impl GestureRecognizer {
    /// Creates a recognizer with no consumers and no helpers.
    pub fn new(config: GestureRecognizerConfig) -> Self {
        Self {
            config,
            providers: SlotMap::with_key(),
            consumer_gesture_provider: HashMap::default(),
            touch_id_target: HashMap::default(),
            event_to_gesture_provider: HashMap::default(),
            orphaned_events: HashSet::default(),
            helpers: Vec::new(),
            next_helper_id: 0,
        }
    }

    /// The current settings.
    pub fn config(&self) -> &GestureRecognizerConfig {
        &self.config
    }

    /// Replaces the settings, applying them to every existing provider.
    pub fn set_config(&mut self, config: GestureRecognizerConfig) {
        for provider in self.providers.values_mut() {
            provider.update_config(&config.provider);
        }
        self.config = config;
    }

    /// Registers a dispatch helper.
    ///
    /// Helpers are asked in registration order; the first one that can
    /// dispatch to a consumer receives its events.
    pub fn add_helper(&mut self, helper: Box<dyn GestureEventHelper>) -> HelperId {
        let id = HelperId(self.next_helper_id);
        self.next_helper_id += 1;
        self.helpers.push((id, helper));
        id
    }

    /// Unregisters a helper, returning it if it was registered.
    pub fn remove_helper(&mut self, id: HelperId) -> Option<Box<dyn GestureEventHelper>> {
        let position = self.helpers.iter().position(|(helper_id, _)| *helper_id == id)?;
        Some(self.helpers.remove(position).1)
    }

    /// Runs the touch through the provider of `consumer`, creating the
    /// provider on first use, and binds the touch to the consumer.
    ///
    /// A rejected event leaves the bindings untouched. Only a successful
    /// result must be followed by [`ack_touch_event`](Self::ack_touch_event).
    #[tracing::instrument(
        level = "trace",
        skip(self, event),
        fields(id = event.unique_event_id, kind = ?event.kind)
    )]
    pub fn process_touch_event_pre_dispatch(
        &mut self,
        event: &TouchEvent,
        consumer: ConsumerId,
    ) -> TouchHandlingResult {
        let key = self.provider_key_for_consumer(consumer);
        let Some(provider) = self.providers.get_mut(key) else {
            return TouchHandlingResult::default();
        };
        let result = provider.on_touch_event(event);
        if result.succeeded {
            self.setup_targets(event, consumer);
            self.event_to_gesture_provider
                .insert(event.unique_event_id, key);
        }
        result
    }

    /// Resolves a touch event and returns the gestures that became
    /// releasable, in dispatch order.
    ///
    /// The ack goes to the provider that processed the event, even if the
    /// stream was transferred to another consumer since. An ack for an event
    /// whose provider was destroyed by a transfer or a cleanup is ignored.
    ///
    /// # Panics
    ///
    /// Panics with a protocol violation if the event is not the oldest one
    /// its provider is waiting on.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn ack_touch_event(
        &mut self,
        unique_event_id: u32,
        consumed: bool,
        non_blocking: bool,
        consumer: ConsumerId,
    ) -> Vec<GestureEventData> {
        if self.orphaned_events.remove(&unique_event_id) {
            debug!(?consumer, unique_event_id, "ack for an event of a destroyed provider");
            return Vec::new();
        }
        let key = match self.event_to_gesture_provider.remove(&unique_event_id) {
            Some(key) => key,
            None => match self.consumer_gesture_provider.get(&consumer) {
                Some(&key) => key,
                None => {
                    debug!(?consumer, unique_event_id, "ack for a consumer without provider");
                    return Vec::new();
                }
            },
        };
        let Some(provider) = self.providers.get_mut(key) else {
            return Vec::new();
        };
        provider.on_touch_event_ack(unique_event_id, consumed, non_blocking);
        provider.get_and_reset_pending_gestures()
    }

    /// The consumer the pointer `pointer_id` is bound to while it is down.
    pub fn touch_locked_target(&self, pointer_id: i32) -> Option<ConsumerId> {
        self.touch_id_target.get(&pointer_id).copied()
    }

    /// The consumer owning the contact nearest to `location`, if it is
    /// within the configured separation.
    ///
    /// Only contacts reported by `source_device_id` are considered, and
    /// distances are measured in root coordinates. Among equally near
    /// contacts, which one wins is unspecified.
    pub fn target_for_location(
        &self,
        location: GesturePoint,
        source_device_id: i32,
    ) -> Option<ConsumerId> {
        let max_distance = self.config.max_separation_for_gesture_touches;
        let mut nearest: Option<(f32, ConsumerId)> = None;
        for (&consumer, &key) in &self.consumer_gesture_provider {
            let Some(provider) = self.providers.get(key) else {
                continue;
            };
            for pointer in provider.pointer_state().live_pointers() {
                if pointer.source_device_id != source_device_id {
                    continue;
                }
                let distance = pointer.root_location.distance_squared_to(location);
                if nearest.is_none_or(|(min, _)| distance < min) {
                    nearest = Some((distance, consumer));
                }
            }
        }
        nearest
            .filter(|(distance, _)| *distance < max_distance * max_distance)
            .map(|(_, consumer)| consumer)
    }

    /// Cancels every contact that is down on `consumer`.
    ///
    /// Returns `false` if the consumer had nothing to cancel.
    pub fn cancel_active_touches(&mut self, consumer: ConsumerId) -> bool {
        match self.consumer_gesture_provider.get(&consumer) {
            Some(&key) => self.cancel_active_touches_on_provider(consumer, key),
            None => false,
        }
    }

    /// Cancels the contacts of every consumer other than `not_cancelled`.
    pub fn cancel_active_touches_except(&mut self, not_cancelled: Option<ConsumerId>) {
        for consumer in self.consumers_except(&[not_cancelled]) {
            self.cancel_active_touches(consumer);
        }
    }

    /// Cancels the contacts of each listed consumer.
    pub fn cancel_active_touches_on(&mut self, consumers: &[ConsumerId]) {
        for &consumer in consumers {
            self.cancel_active_touches(consumer);
        }
    }

    /// Hands the touch streams of `from` over to `to`.
    ///
    /// Contacts on every other consumer are cancelled. The provider of
    /// `from` moves to `to`, replacing any provider `to` had, and every
    /// pointer bound to `from` is rebound to `to`. With
    /// [`TransferTouchesBehavior::Cancel`], `from` sees its contacts
    /// cancelled and the moved provider restarts tracking them from a
    /// consumed press.
    ///
    /// Returns `false` if there was nothing to transfer.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn transfer_events_to(
        &mut self,
        from: ConsumerId,
        to: ConsumerId,
        behavior: TransferTouchesBehavior,
    ) -> bool {
        if from == to {
            return false;
        }
        let mut touch_ids: SmallVec<[i32; 4]> = self
            .touch_id_target
            .iter()
            .filter(|(_, target)| **target == from)
            .map(|(&id, _)| id)
            .collect();
        touch_ids.sort_unstable();
        let from_key = self.consumer_gesture_provider.get(&from).copied();
        if from_key.is_none() && touch_ids.is_empty() {
            return false;
        }

        for consumer in self.consumers_except(&[Some(from), Some(to)]) {
            self.cancel_active_touches(consumer);
        }

        if let Some(from_key) = from_key {
            let replaced = self.consumer_gesture_provider.get(&to).copied();
            if let Some(to_key) = replaced {
                self.cancel_active_touches_on_provider(to, to_key);
                self.remove_provider(to_key);
            }
            self.consumer_gesture_provider.remove(&from);
            self.consumer_gesture_provider.insert(to, from_key);
            if let Some(provider) = self.providers.get_mut(from_key) {
                provider.set_gesture_consumer(to);
            }

            match behavior {
                TransferTouchesBehavior::Cancel => {
                    let live: SmallVec<[Pointer; 4]> = self
                        .providers
                        .get(from_key)
                        .map(|provider| {
                            provider.pointer_state().live_pointers().cloned().collect()
                        })
                        .unwrap_or_default();
                    self.cancel_active_touches_on_provider(from, from_key);
                    if let Some(provider) = self.providers.get_mut(from_key) {
                        provider.reset_gesture_handling_state();
                        for pointer in &live {
                            provider.on_touch_enter(pointer);
                        }
                        provider.get_and_reset_pending_gestures();
                    }
                }
                TransferTouchesBehavior::DontCancel => {
                    if replaced.is_some()
                        && let Some(provider) = self.providers.get_mut(from_key)
                    {
                        provider.reset_gesture_handling_state();
                    }
                }
            }
        } else if let Some(&to_key) = self.consumer_gesture_provider.get(&to)
            && let Some(provider) = self.providers.get_mut(to_key)
        {
            provider.reset_gesture_handling_state();
        }

        for id in touch_ids {
            self.touch_id_target.insert(id, to);
        }
        debug!(?from, ?to, "touch streams transferred");
        true
    }

    /// Forgets everything about `consumer`.
    ///
    /// Returns `false` if nothing was known about it.
    pub fn cleanup_state_for_consumer(&mut self, consumer: ConsumerId) -> bool {
        let mut removed = false;
        if let Some(key) = self.consumer_gesture_provider.remove(&consumer) {
            self.remove_provider(key);
            removed = true;
        }
        let bound = self.touch_id_target.len();
        self.touch_id_target.retain(|_, target| *target != consumer);
        removed |= self.touch_id_target.len() != bound;
        if removed {
            debug!(?consumer, "consumer state cleaned up");
        }
        removed
    }

    /// Position of the first contact still down on `consumer`.
    pub fn last_touch_point_for_target(&self, consumer: ConsumerId) -> Option<GesturePoint> {
        let key = self.consumer_gesture_provider.get(&consumer)?;
        self.providers
            .get(*key)?
            .pointer_state()
            .live_pointers()
            .next()
            .map(|pointer| pointer.location)
    }

    /// Fires expired detector timers of every provider and dispatches the
    /// resulting gestures through the helpers.
    pub fn on_timer(&mut self, now: Instant) {
        let mut released: Vec<(ConsumerId, GestureEventData)> = Vec::new();
        for provider in self.providers.values_mut() {
            provider.on_timer(now, &mut released);
        }
        for (consumer, gesture) in released {
            self.dispatch_gesture(consumer, &gesture);
        }
    }

    /// The earliest armed detector timer across all providers.
    pub fn next_timer_deadline(&self) -> Option<Instant> {
        self.providers
            .values()
            .filter_map(GestureProviderAura::next_timer_deadline)
            .min()
    }

    /// Whether `consumer` currently owns a provider.
    pub fn has_provider(&self, consumer: ConsumerId) -> bool {
        self.consumer_gesture_provider.contains_key(&consumer)
    }

    /// The provider owned by `consumer`.
    pub fn provider(&self, consumer: ConsumerId) -> Option<&GestureProviderAura> {
        let key = self.consumer_gesture_provider.get(&consumer)?;
        self.providers.get(*key)
    }

    /// Current pointer id to consumer bindings.
    pub fn consumer_for_touch_ids(&self) -> impl Iterator<Item = (i32, ConsumerId)> + '_ {
        self.touch_id_target
            .iter()
            .map(|(&id, &consumer)| (id, consumer))
    }

    fn provider_key_for_consumer(&mut self, consumer: ConsumerId) -> ProviderKey {
        if let Some(&key) = self.consumer_gesture_provider.get(&consumer) {
            return key;
        }
        let key = self
            .providers
            .insert(GestureProviderAura::new(consumer, &self.config.provider));
        self.consumer_gesture_provider.insert(consumer, key);
        trace!(?consumer, "gesture provider created");
        key
    }

    fn remove_provider(&mut self, key: ProviderKey) {
        self.providers.remove(key);
        let orphaned = &mut self.orphaned_events;
        self.event_to_gesture_provider.retain(|&id, provider| {
            if *provider == key {
                orphaned.insert(id);
                return false;
            }
            true
        });
    }

    fn setup_targets(&mut self, event: &TouchEvent, consumer: ConsumerId) {
        match event.kind {
            TouchEventKind::Pressed => {
                self.touch_id_target.insert(event.pointer.id, consumer);
            }
            TouchEventKind::Released | TouchEventKind::Cancelled => {
                self.touch_id_target.remove(&event.pointer.id);
            }
            TouchEventKind::Moved => {}
        }
    }

    fn consumers_except(&self, excluded: &[Option<ConsumerId>]) -> Vec<ConsumerId> {
        self.consumer_gesture_provider
            .keys()
            .filter(|consumer| !excluded.contains(&Some(**consumer)))
            .copied()
            .collect()
    }

    fn cancel_active_touches_on_provider(
        &mut self,
        consumer: ConsumerId,
        key: ProviderKey,
    ) -> bool {
        let Some(provider) = self.providers.get(key) else {
            return false;
        };
        let cancels = provider
            .pointer_state()
            .synthesize_cancel_events(Instant::now());
        if cancels.is_empty() {
            return false;
        }
        debug!(?consumer, count = cancels.len(), "cancelling active touches");
        for event in &cancels {
            self.dispatch_synthetic_touch_event(consumer, key, event);
        }
        true
    }

    /// Runs a synthetic event through `key` as if the platform had delivered
    /// it to `consumer`, then acks it with the helper's verdict.
    fn dispatch_synthetic_touch_event(
        &mut self,
        consumer: ConsumerId,
        key: ProviderKey,
        event: &TouchEvent,
    ) {
        let Some(provider) = self.providers.get_mut(key) else {
            return;
        };
        if !provider.on_touch_event(event).succeeded {
            trace!(?consumer, "synthetic touch event rejected");
            return;
        }
        self.setup_targets(event, consumer);

        let consumed = match self.find_dispatch_helper_for_consumer(consumer) {
            Some(helper) => helper.dispatch_synthetic_touch_event(consumer, event),
            None => {
                debug!(?consumer, "no helper for synthetic touch event");
                false
            }
        };

        let Some(provider) = self.providers.get_mut(key) else {
            return;
        };
        provider.on_touch_event_ack(event.unique_event_id, consumed, false);
        for gesture in provider.get_and_reset_pending_gestures() {
            self.dispatch_gesture(consumer, &gesture);
        }
    }

    fn dispatch_gesture(&mut self, consumer: ConsumerId, gesture: &GestureEventData) {
        match self.find_dispatch_helper_for_consumer(consumer) {
            Some(helper) => helper.dispatch_gesture_event(consumer, gesture),
            None => trace!(?consumer, kind = ?gesture.kind(), "gesture without helper dropped"),
        }
    }

    fn find_dispatch_helper_for_consumer(
        &mut self,
        consumer: ConsumerId,
    ) -> Option<&mut (dyn GestureEventHelper + 'static)> {
        self.helpers
            .iter_mut()
            .find(|(_, helper)| helper.can_dispatch_to_consumer(consumer))
            .map(|(_, helper)| helper.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn press(
        recognizer: &mut GestureRecognizer,
        id: i32,
        x: f32,
        y: f32,
        consumer: ConsumerId,
    ) -> u32 {
        let event = TouchEvent::new(
            TouchEventKind::Pressed,
            id,
            GesturePoint::new(x, y),
            Instant::now(),
        );
        assert!(
            recognizer
                .process_touch_event_pre_dispatch(&event, consumer)
                .succeeded
        );
        event.unique_event_id
    }

    #[test]
    fn test_press_binds_and_release_unbinds() {
        let mut recognizer = GestureRecognizer::default();
        let consumer = ConsumerId(1);
        let down_id = press(&mut recognizer, 1, 10.0, 10.0, consumer);
        assert_eq!(recognizer.touch_locked_target(1), Some(consumer));
        assert!(recognizer.has_provider(consumer));
        recognizer.ack_touch_event(down_id, false, false, consumer);

        let up = TouchEvent::new(
            TouchEventKind::Released,
            1,
            GesturePoint::new(10.0, 10.0),
            Instant::now() + Duration::from_millis(20),
        );
        assert!(
            recognizer
                .process_touch_event_pre_dispatch(&up, consumer)
                .succeeded
        );
        assert_eq!(recognizer.touch_locked_target(1), None);
    }

    #[test]
    fn test_target_for_location_respects_device_and_separation() {
        let mut recognizer = GestureRecognizer::default();
        press(&mut recognizer, 1, 10.0, 10.0, ConsumerId(1));
        press(&mut recognizer, 2, 300.0, 300.0, ConsumerId(2));

        assert_eq!(
            recognizer.target_for_location(GesturePoint::new(20.0, 20.0), 0),
            Some(ConsumerId(1))
        );
        assert_eq!(
            recognizer.target_for_location(GesturePoint::new(280.0, 300.0), 0),
            Some(ConsumerId(2))
        );
        assert_eq!(
            recognizer.target_for_location(GesturePoint::new(20.0, 20.0), 5),
            None
        );
        assert_eq!(
            recognizer.target_for_location(GesturePoint::new(1000.0, 1000.0), 0),
            None
        );
    }

    #[test]
    fn test_cleanup_state_for_consumer() {
        let mut recognizer = GestureRecognizer::default();
        let consumer = ConsumerId(3);
        let down_id = press(&mut recognizer, 4, 0.0, 0.0, consumer);
        assert!(recognizer.cleanup_state_for_consumer(consumer));
        assert!(!recognizer.has_provider(consumer));
        assert_eq!(recognizer.touch_locked_target(4), None);
        assert!(recognizer.event_to_gesture_provider.is_empty());
        // A late ack for a forgotten consumer is ignored.
        assert!(
            recognizer
                .ack_touch_event(down_id, false, false, consumer)
                .is_empty()
        );
        assert!(recognizer.orphaned_events.is_empty());
        assert!(!recognizer.cleanup_state_for_consumer(consumer));
    }

    #[test]
    fn test_late_ack_after_cleanup_skips_new_provider() {
        let mut recognizer = GestureRecognizer::default();
        let consumer = ConsumerId(1);
        let old_id = press(&mut recognizer, 1, 0.0, 0.0, consumer);
        assert!(recognizer.cleanup_state_for_consumer(consumer));

        let new_id = press(&mut recognizer, 1, 0.0, 0.0, consumer);
        assert!(
            recognizer
                .ack_touch_event(old_id, false, false, consumer)
                .is_empty()
        );
        let released = recognizer.ack_touch_event(new_id, false, false, consumer);
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].unique_touch_event_id, new_id);
    }

    #[test]
    fn test_rejected_release_keeps_binding() {
        let mut recognizer = GestureRecognizer::default();
        let consumer = ConsumerId(1);
        let start = Instant::now();
        let down = TouchEvent::new(
            TouchEventKind::Pressed,
            1,
            GesturePoint::new(10.0, 10.0),
            start + Duration::from_millis(100),
        );
        assert!(
            recognizer
                .process_touch_event_pre_dispatch(&down, consumer)
                .succeeded
        );
        recognizer.ack_touch_event(down.unique_event_id, false, false, consumer);

        let stale_up = TouchEvent::new(
            TouchEventKind::Released,
            1,
            GesturePoint::new(10.0, 10.0),
            start + Duration::from_millis(50),
        );
        assert!(
            !recognizer
                .process_touch_event_pre_dispatch(&stale_up, consumer)
                .succeeded
        );
        assert_eq!(recognizer.touch_locked_target(1), Some(consumer));
        let provider = recognizer.provider(consumer).expect("provider");
        assert_eq!(provider.pointer_state().pointer_count(), 1);
        assert!(!recognizer.event_to_gesture_provider.contains_key(&stale_up.unique_event_id));

        let up = TouchEvent::new(
            TouchEventKind::Released,
            1,
            GesturePoint::new(10.0, 10.0),
            start + Duration::from_millis(150),
        );
        assert!(
            recognizer
                .process_touch_event_pre_dispatch(&up, consumer)
                .succeeded
        );
        assert_eq!(recognizer.touch_locked_target(1), None);
    }

    #[test]
    fn test_last_touch_point_for_target() {
        let mut recognizer = GestureRecognizer::default();
        assert_eq!(recognizer.last_touch_point_for_target(ConsumerId(1)), None);
        press(&mut recognizer, 1, 5.0, 6.0, ConsumerId(1));
        assert_eq!(
            recognizer.last_touch_point_for_target(ConsumerId(1)),
            Some(GesturePoint::new(5.0, 6.0))
        );
    }

    #[test]
    fn test_cancel_without_touches_is_noop() {
        let mut recognizer = GestureRecognizer::default();
        assert!(!recognizer.cancel_active_touches(ConsumerId(9)));
        assert!(!recognizer.transfer_events_to(
            ConsumerId(9),
            ConsumerId(10),
            TransferTouchesBehavior::Cancel
        ));
    }
}
