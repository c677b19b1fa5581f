//! Geometric gesture detection.
//!
//! [`GestureDetector`] consumes the pointer table of a consumer after every
//! accepted touch event and returns the gestures that event produced. Some
//! gestures depend on time alone (show-press, long-press); for those the
//! detector arms timers, reported through [`GestureDetector::next_deadline`],
//! which the owner fires with [`GestureDetector::on_timer`].
//!
//! The thresholds come from [`GestureDetectorConfig`]. They are tunables, not
//! architecture, and the set of gestures is intentionally compact: taps,
//! scrolls, flings and pinches.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use smallvec::SmallVec;
use tracing::trace;

use crate::{
    config::{GestureDetectorConfig, GestureProviderConfig},
    geometry::{GesturePoint, GestureRect},
    gesture_event::{GestureEventData, GestureType},
    motion_event::{MotionAction, MotionEventState},
    touch_event::ToolType,
};

/// Gestures produced by a single detector step.
pub type DetectedGestures = SmallVec<[GestureEventData; 4]>;

/// Velocity samples older than this are ignored when a scroll is released.
const VELOCITY_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    ShowPress,
    LongPress,
}

/// The press that started the current stream.
#[derive(Debug, Clone)]
struct DownState {
    pointer_id: i32,
    tool_type: ToolType,
    location: GesturePoint,
    raw_location: GesturePoint,
    unique_event_id: u32,
}

/// Recent focus movement, used to derive the release velocity of a scroll.
#[derive(Debug, Clone, Default)]
struct VelocityTracker {
    last: Option<(Instant, GesturePoint)>,
    /// (timestamp, velocity_x, velocity_y) samples within the last
    /// [`VELOCITY_WINDOW`].
    history: VecDeque<(Instant, f32, f32)>,
}

impl VelocityTracker {
    fn reset(&mut self, time: Instant, focus: GesturePoint) {
        self.last = Some((time, focus));
        self.history.clear();
    }

    fn add(&mut self, time: Instant, focus: GesturePoint) {
        if let Some((last_time, last_focus)) = self.last {
            let dt = time.saturating_duration_since(last_time).as_secs_f32();
            if dt > 0.0 {
                let delta = focus - last_focus;
                self.history.push_back((time, delta.x / dt, delta.y / dt));
            }
        }
        self.last = Some((time, focus));
        while let Some(&(sample_time, _, _)) = self.history.front() {
            if time.saturating_duration_since(sample_time) > VELOCITY_WINDOW {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Average velocity of samples recent relative to `now`.
    fn velocity(&self, now: Instant) -> (f32, f32) {
        let recent = self
            .history
            .iter()
            .filter(|(time, _, _)| now.saturating_duration_since(*time) <= VELOCITY_WINDOW);
        let (sum_x, sum_y, count) = recent.fold((0.0f32, 0.0f32, 0u32), |(x, y, n), s| {
            (x + s.1, y + s.2, n + 1)
        });
        if count == 0 {
            (0.0, 0.0)
        } else {
            (sum_x / count as f32, sum_y / count as f32)
        }
    }
}

/// Stateful tap, scroll, fling and pinch recognizer for one consumer.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    config: GestureDetectorConfig,
    double_tap_enabled: bool,
    pinch_enabled: bool,

    down: Option<DownState>,
    last_event_time: Option<Instant>,
    /// A tap-down was emitted and no tap ending followed yet.
    tap_open: bool,
    /// The stream can still complete as a tap.
    tap_possible: bool,
    long_press_fired: bool,
    double_tap_candidate: bool,
    last_tap: Option<(Instant, GesturePoint)>,

    scrolling: bool,
    down_focus: GesturePoint,
    last_focus: GesturePoint,
    velocity: VelocityTracker,

    pinching: bool,
    initial_span: f32,
    last_span: f32,

    timers: SmallVec<[(Instant, TimerKind); 2]>,
}

impl GestureDetector {
    /// Creates a detector from provider settings.
    pub fn new(config: &GestureProviderConfig) -> Self {
        Self {
            config: config.detector.clone(),
            double_tap_enabled: config.double_tap_enabled,
            pinch_enabled: config.pinch_enabled,
            down: None,
            last_event_time: None,
            tap_open: false,
            tap_possible: false,
            long_press_fired: false,
            double_tap_candidate: false,
            last_tap: None,
            scrolling: false,
            down_focus: GesturePoint::ZERO,
            last_focus: GesturePoint::ZERO,
            velocity: VelocityTracker::default(),
            pinching: false,
            initial_span: 0.0,
            last_span: 0.0,
            timers: SmallVec::new(),
        }
    }

    /// Replaces the thresholds. An in-flight stream keeps its state.
    pub fn update_config(&mut self, config: &GestureProviderConfig) {
        self.config = config.detector.clone();
        self.double_tap_enabled = config.double_tap_enabled;
        self.pinch_enabled = config.pinch_enabled;
        if !self.double_tap_enabled {
            self.double_tap_candidate = false;
        }
    }

    /// Enables or disables dedicated double-tap gestures.
    pub fn set_double_tap_enabled(&mut self, enabled: bool) {
        self.double_tap_enabled = enabled;
        if !enabled {
            self.double_tap_candidate = false;
            self.last_tap = None;
        }
    }

    /// Whether a touch stream is in progress.
    pub fn has_active_stream(&self) -> bool {
        self.down.is_some()
    }

    /// The earliest armed timer, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|(deadline, _)| *deadline).min()
    }

    /// Drops all stream state and timers without emitting anything.
    pub fn reset(&mut self) {
        self.end_stream();
        self.last_tap = None;
        self.last_event_time = None;
    }

    /// Processes the touch event last applied to `state`.
    ///
    /// Returns `None` if the event cannot be handled: a non-initial event
    /// without a stream in progress, or a move or release older than the
    /// previous event.
    pub fn on_touch_event(&mut self, state: &MotionEventState) -> Option<DetectedGestures> {
        let action = state.action();
        let time = state.event_time()?;

        // Cancels are accepted without a stream since one arrives per pointer.
        if self.down.is_none() && !matches!(action, MotionAction::Down | MotionAction::Cancel) {
            trace!(?action, "touch event without a stream in progress");
            return None;
        }
        // Presses and cancels open or close a stream and are never stale.
        if let Some(last) = self.last_event_time
            && time < last
            && !matches!(action, MotionAction::Down | MotionAction::Cancel)
        {
            trace!(?action, "stale touch event");
            return None;
        }
        self.last_event_time = Some(time);

        let mut gestures = DetectedGestures::new();
        match action {
            MotionAction::Down => self.handle_down(state, time, &mut gestures),
            MotionAction::PointerDown => self.handle_pointer_down(state, time, &mut gestures),
            MotionAction::Move => self.handle_move(state, time, &mut gestures),
            MotionAction::PointerUp => self.handle_pointer_up(state, time, &mut gestures),
            MotionAction::Up => self.handle_up(state, time, &mut gestures),
            MotionAction::Cancel => self.handle_cancel(state, &mut gestures),
        }
        Some(gestures)
    }

    /// Fires every timer due at `now`, in deadline order.
    pub fn on_timer(&mut self, now: Instant) -> DetectedGestures {
        let mut gestures = DetectedGestures::new();
        loop {
            let Some(position) = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, (deadline, _))| *deadline <= now)
                .min_by_key(|(_, (deadline, _))| *deadline)
                .map(|(position, _)| position)
            else {
                break;
            };
            let (deadline, kind) = self.timers.remove(position);
            let Some(down) = self.down.clone() else {
                continue;
            };
            if !self.tap_possible {
                continue;
            }
            let details = match kind {
                TimerKind::ShowPress => GestureType::ShowPress,
                TimerKind::LongPress => {
                    self.long_press_fired = true;
                    self.tap_possible = false;
                    self.timers.clear();
                    GestureType::LongPress
                }
            };
            let mut gesture = GestureEventData::new(
                details,
                down.pointer_id,
                deadline,
                down.location,
                down.raw_location,
                1,
                GestureRect::from_point(down.location),
            );
            gesture.primary_tool_type = down.tool_type;
            gesture.unique_touch_event_id = down.unique_event_id;
            gestures.push(gesture);
        }
        gestures
    }

    fn handle_down(&mut self, state: &MotionEventState, time: Instant, out: &mut DetectedGestures) {
        let Some(pointer) = state.action_pointer() else {
            return;
        };
        self.double_tap_candidate = self.double_tap_enabled
            && self.last_tap.is_some_and(|(tap_time, tap_location)| {
                time.saturating_duration_since(tap_time) <= self.config.double_tap_timeout
                    && tap_location.distance_to(pointer.location) <= self.config.double_tap_slop
            });

        self.down = Some(DownState {
            pointer_id: pointer.id,
            tool_type: pointer.tool_type,
            location: pointer.location,
            raw_location: pointer.root_location,
            unique_event_id: state.unique_event_id(),
        });
        self.tap_open = true;
        self.tap_possible = true;
        self.long_press_fired = false;
        self.scrolling = false;
        self.pinching = false;
        self.down_focus = pointer.location;
        self.last_focus = pointer.location;
        self.velocity.reset(time, pointer.location);

        self.timers.clear();
        self.timers
            .push((time + self.config.show_press_timeout, TimerKind::ShowPress));
        self.timers
            .push((time + self.config.long_press_timeout, TimerKind::LongPress));

        out.push(self.gesture(
            GestureType::TapDown,
            state,
            pointer.location,
            pointer.root_location,
        ));
    }

    fn handle_pointer_down(
        &mut self,
        state: &MotionEventState,
        time: Instant,
        out: &mut DetectedGestures,
    ) {
        self.cancel_tap(state, out);
        let (focus, _) = focus_of(state, false);
        self.down_focus = focus;
        self.last_focus = focus;
        self.velocity.reset(time, focus);
        if self.pinch_enabled && !self.pinching {
            self.initial_span = span_of(state, focus, false);
            self.last_span = self.initial_span;
        }
    }

    fn handle_move(&mut self, state: &MotionEventState, time: Instant, out: &mut DetectedGestures) {
        let (focus, raw_focus) = focus_of(state, false);

        if !self.scrolling && !self.long_press_fired {
            let travelled = focus.distance_to(self.down_focus);
            if travelled > self.config.touch_slop {
                self.cancel_tap(state, out);
                let hint = focus - self.down_focus;
                out.push(self.gesture(
                    GestureType::ScrollBegin {
                        delta_x_hint: hint.x,
                        delta_y_hint: hint.y,
                    },
                    state,
                    focus,
                    raw_focus,
                ));
                self.scrolling = true;
            }
        }

        if self.scrolling {
            let delta = focus - self.last_focus;
            if delta != GesturePoint::ZERO {
                out.push(self.gesture(
                    GestureType::ScrollUpdate {
                        delta_x: delta.x,
                        delta_y: delta.y,
                    },
                    state,
                    focus,
                    raw_focus,
                ));
            }
        }
        self.last_focus = focus;
        self.velocity.add(time, focus);

        if self.pinch_enabled && state.pointer_count() >= 2 {
            let span = span_of(state, focus, false);
            if !self.pinching {
                if (span - self.initial_span).abs() > self.config.min_pinch_span_delta {
                    self.cancel_tap(state, out);
                    out.push(self.gesture(GestureType::PinchBegin, state, focus, raw_focus));
                    self.pinching = true;
                    self.last_span = span;
                }
            } else if self.last_span > 0.0 && span != self.last_span {
                out.push(self.gesture(
                    GestureType::PinchUpdate {
                        scale: span / self.last_span,
                    },
                    state,
                    focus,
                    raw_focus,
                ));
                self.last_span = span;
            }
        }
    }

    fn handle_pointer_up(
        &mut self,
        state: &MotionEventState,
        time: Instant,
        out: &mut DetectedGestures,
    ) {
        let (focus, raw_focus) = focus_of(state, true);
        let remaining = state.pointer_count().saturating_sub(1);
        if self.pinching && remaining < 2 {
            out.push(self.gesture(GestureType::PinchEnd, state, focus, raw_focus));
            self.pinching = false;
        }
        self.down_focus = focus;
        self.last_focus = focus;
        self.velocity.reset(time, focus);
        if self.pinch_enabled && remaining >= 2 {
            self.initial_span = span_of(state, focus, true);
            self.last_span = self.initial_span;
        }
    }

    fn handle_up(&mut self, state: &MotionEventState, time: Instant, out: &mut DetectedGestures) {
        let Some(pointer) = state.action_pointer() else {
            self.end_stream();
            return;
        };
        let (focus, raw_focus) = focus_of(state, false);
        self.velocity.add(time, focus);

        if self.pinching {
            out.push(self.gesture(GestureType::PinchEnd, state, focus, raw_focus));
        }

        if self.scrolling {
            let (vx, vy) = self.velocity.velocity(time);
            let magnitude = (vx * vx + vy * vy).sqrt();
            if magnitude >= self.config.minimum_fling_velocity {
                let clamp = if magnitude > self.config.maximum_fling_velocity {
                    self.config.maximum_fling_velocity / magnitude
                } else {
                    1.0
                };
                out.push(self.gesture(
                    GestureType::FlingStart {
                        velocity_x: vx * clamp,
                        velocity_y: vy * clamp,
                    },
                    state,
                    focus,
                    raw_focus,
                ));
            } else {
                out.push(self.gesture(GestureType::ScrollEnd, state, focus, raw_focus));
            }
        } else if self.long_press_fired {
            out.push(self.gesture(
                GestureType::LongTap,
                state,
                pointer.location,
                pointer.root_location,
            ));
        } else if self.tap_possible {
            if self.double_tap_candidate {
                out.push(self.gesture(
                    GestureType::DoubleTap,
                    state,
                    pointer.location,
                    pointer.root_location,
                ));
                self.last_tap = None;
            } else {
                out.push(self.gesture(
                    GestureType::Tap { tap_count: 1 },
                    state,
                    pointer.location,
                    pointer.root_location,
                ));
                self.last_tap = Some((time, pointer.location));
            }
        }
        self.end_stream();
    }

    fn handle_cancel(&mut self, state: &MotionEventState, out: &mut DetectedGestures) {
        if self.down.is_none() {
            return;
        }
        let (focus, raw_focus) = focus_of(state, false);
        if self.pinching {
            out.push(self.gesture(GestureType::PinchEnd, state, focus, raw_focus));
        }
        if self.scrolling {
            out.push(self.gesture(GestureType::ScrollEnd, state, focus, raw_focus));
        }
        if self.tap_open
            && let Some(pointer) = state.action_pointer()
        {
            out.push(self.gesture(
                GestureType::TapCancel,
                state,
                pointer.location,
                pointer.root_location,
            ));
        }
        self.last_tap = None;
        self.end_stream();
    }

    /// Gives up on the stream completing as a tap.
    fn cancel_tap(&mut self, state: &MotionEventState, out: &mut DetectedGestures) {
        self.tap_possible = false;
        self.timers.clear();
        if self.tap_open && !self.long_press_fired {
            self.tap_open = false;
            if let Some(pointer) = state.action_pointer() {
                out.push(self.gesture(
                    GestureType::TapCancel,
                    state,
                    pointer.location,
                    pointer.root_location,
                ));
            }
        }
    }

    fn end_stream(&mut self) {
        self.down = None;
        self.tap_open = false;
        self.tap_possible = false;
        self.long_press_fired = false;
        self.double_tap_candidate = false;
        self.scrolling = false;
        self.pinching = false;
        self.timers.clear();
    }

    fn gesture(
        &self,
        details: GestureType,
        state: &MotionEventState,
        location: GesturePoint,
        raw_location: GesturePoint,
    ) -> GestureEventData {
        let primary = state.pointers().first();
        let mut gesture = GestureEventData::new(
            details,
            primary.map_or(0, |pointer| pointer.id),
            state.event_time().unwrap_or_else(Instant::now),
            location,
            raw_location,
            state.pointer_count(),
            state.bounding_box(),
        );
        gesture.primary_tool_type = primary.map_or(ToolType::Unknown, |pointer| pointer.tool_type);
        gesture.flags = state.flags();
        gesture
    }
}

/// Centroid of the contacts, optionally ignoring the one that just lifted.
fn focus_of(state: &MotionEventState, exclude_action: bool) -> (GesturePoint, GesturePoint) {
    let skip = exclude_action.then_some(state.action_index());
    let mut sum = GesturePoint::ZERO;
    let mut raw_sum = GesturePoint::ZERO;
    let mut count = 0.0f32;
    for (index, pointer) in state.pointers().iter().enumerate() {
        if Some(index) == skip {
            continue;
        }
        sum = sum + pointer.location;
        raw_sum = raw_sum + pointer.root_location;
        count += 1.0;
    }
    if count == 0.0 {
        return state
            .action_pointer()
            .map_or((GesturePoint::ZERO, GesturePoint::ZERO), |pointer| {
                (pointer.location, pointer.root_location)
            });
    }
    (
        GesturePoint::new(sum.x / count, sum.y / count),
        GesturePoint::new(raw_sum.x / count, raw_sum.y / count),
    )
}

/// Average distance of the contacts from `focus`.
fn span_of(state: &MotionEventState, focus: GesturePoint, exclude_action: bool) -> f32 {
    let skip = exclude_action.then_some(state.action_index());
    let (total, count) = state
        .pointers()
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != skip)
        .fold((0.0f32, 0.0f32), |(total, count), (_, pointer)| {
            (total + pointer.location.distance_to(focus), count + 1.0)
        });
    if count == 0.0 { 0.0 } else { total / count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gesture_event::GestureKind,
        touch_event::{TouchEvent, TouchEventKind},
    };

    struct Harness {
        state: MotionEventState,
        detector: GestureDetector,
        start: Instant,
    }

    impl Harness {
        fn new(config: GestureProviderConfig) -> Self {
            Self {
                state: MotionEventState::new(config.max_touch_points),
                detector: GestureDetector::new(&config),
                start: Instant::now(),
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.start + Duration::from_millis(ms)
        }

        fn touch(
            &mut self,
            kind: TouchEventKind,
            id: i32,
            x: f32,
            y: f32,
            ms: u64,
        ) -> Vec<GestureKind> {
            let event = TouchEvent::new(kind, id, GesturePoint::new(x, y), self.at(ms));
            assert!(self.state.on_touch(&event));
            let gestures = self
                .detector
                .on_touch_event(&self.state)
                .expect("event accepted");
            self.state.cleanup_removed_pointers();
            gestures.iter().map(GestureEventData::kind).collect()
        }
    }

    #[test]
    fn test_tap() {
        let mut h = Harness::new(GestureProviderConfig::default());
        assert_eq!(
            h.touch(TouchEventKind::Pressed, 1, 10.0, 10.0, 0),
            vec![GestureKind::TapDown]
        );
        assert_eq!(
            h.touch(TouchEventKind::Released, 1, 11.0, 10.0, 50),
            vec![GestureKind::Tap]
        );
        assert!(!h.detector.has_active_stream());
    }

    #[test]
    fn test_scroll_then_end() {
        let mut h = Harness::new(GestureProviderConfig::default());
        h.touch(TouchEventKind::Pressed, 1, 0.0, 0.0, 0);
        assert_eq!(
            h.touch(TouchEventKind::Moved, 1, 0.0, 40.0, 16),
            vec![
                GestureKind::TapCancel,
                GestureKind::ScrollBegin,
                GestureKind::ScrollUpdate
            ]
        );
        assert_eq!(
            h.touch(TouchEventKind::Moved, 1, 0.0, 50.0, 32),
            vec![GestureKind::ScrollUpdate]
        );
        // Released long after the last movement: no momentum.
        assert_eq!(
            h.touch(TouchEventKind::Released, 1, 0.0, 50.0, 500),
            vec![GestureKind::ScrollEnd]
        );
    }

    #[test]
    fn test_fling() {
        let mut h = Harness::new(GestureProviderConfig::default());
        h.touch(TouchEventKind::Pressed, 1, 0.0, 0.0, 0);
        h.touch(TouchEventKind::Moved, 1, 0.0, 40.0, 10);
        h.touch(TouchEventKind::Moved, 1, 0.0, 80.0, 20);
        let event = TouchEvent::new(
            TouchEventKind::Released,
            1,
            GesturePoint::new(0.0, 120.0),
            h.at(30),
        );
        assert!(h.state.on_touch(&event));
        let gestures = h.detector.on_touch_event(&h.state).expect("accepted");
        assert_eq!(gestures.len(), 1);
        match gestures[0].details {
            GestureType::FlingStart {
                velocity_x,
                velocity_y,
            } => {
                assert_eq!(velocity_x, 0.0);
                assert!(velocity_y > 1000.0);
            }
            other => panic!("expected fling, got {other:?}"),
        }
    }

    #[test]
    fn test_timers_fire_show_press_and_long_press() {
        let mut h = Harness::new(GestureProviderConfig::default());
        h.touch(TouchEventKind::Pressed, 1, 5.0, 5.0, 0);
        assert_eq!(h.detector.next_deadline(), Some(h.at(150)));
        assert!(h.detector.on_timer(h.at(100)).is_empty());

        let fired: Vec<_> = h
            .detector
            .on_timer(h.at(2000))
            .iter()
            .map(GestureEventData::kind)
            .collect();
        assert_eq!(fired, vec![GestureKind::ShowPress, GestureKind::LongPress]);
        assert_eq!(h.detector.next_deadline(), None);

        assert_eq!(
            h.touch(TouchEventKind::Released, 1, 5.0, 5.0, 2100),
            vec![GestureKind::LongTap]
        );
    }

    #[test]
    fn test_double_tap_when_enabled() {
        let mut h = Harness::new(GestureProviderConfig {
            double_tap_enabled: true,
            ..Default::default()
        });
        h.touch(TouchEventKind::Pressed, 1, 5.0, 5.0, 0);
        h.touch(TouchEventKind::Released, 1, 5.0, 5.0, 40);
        h.touch(TouchEventKind::Pressed, 1, 8.0, 5.0, 120);
        assert_eq!(
            h.touch(TouchEventKind::Released, 1, 8.0, 5.0, 160),
            vec![GestureKind::DoubleTap]
        );
    }

    #[test]
    fn test_pinch() {
        let mut h = Harness::new(GestureProviderConfig::default());
        h.touch(TouchEventKind::Pressed, 1, 100.0, 100.0, 0);
        assert_eq!(
            h.touch(TouchEventKind::Pressed, 2, 200.0, 100.0, 10),
            vec![GestureKind::TapCancel]
        );
        let moved = h.touch(TouchEventKind::Moved, 2, 300.0, 100.0, 20);
        assert!(moved.contains(&GestureKind::PinchBegin));
        let moved = h.touch(TouchEventKind::Moved, 2, 320.0, 100.0, 30);
        assert!(moved.contains(&GestureKind::PinchUpdate));
        assert_eq!(
            h.touch(TouchEventKind::Released, 2, 320.0, 100.0, 40),
            vec![GestureKind::PinchEnd]
        );
    }

    #[test]
    fn test_cancel_closes_stream() {
        let mut h = Harness::new(GestureProviderConfig::default());
        h.touch(TouchEventKind::Pressed, 1, 0.0, 0.0, 0);
        h.touch(TouchEventKind::Moved, 1, 40.0, 0.0, 16);
        assert_eq!(
            h.touch(TouchEventKind::Cancelled, 1, 40.0, 0.0, 32),
            vec![GestureKind::ScrollEnd]
        );
        assert!(!h.detector.has_active_stream());
    }

    #[test]
    fn test_rejects_without_stream_and_stale_events() {
        let mut h = Harness::new(GestureProviderConfig::default());
        h.touch(TouchEventKind::Pressed, 1, 0.0, 0.0, 100);
        let stale = TouchEvent::new(TouchEventKind::Moved, 1, GesturePoint::ZERO, h.at(50));
        assert!(h.state.on_touch(&stale));
        assert!(h.detector.on_touch_event(&h.state).is_none());

        // A move whose press never reached the detector.
        let mut fresh = Harness::new(GestureProviderConfig::default());
        let pressed = TouchEvent::new(TouchEventKind::Pressed, 1, GesturePoint::ZERO, fresh.at(0));
        assert!(fresh.state.on_touch(&pressed));
        let moved = TouchEvent::new(TouchEventKind::Moved, 1, GesturePoint::ZERO, fresh.at(1));
        assert!(fresh.state.on_touch(&moved));
        assert!(fresh.detector.on_touch_event(&fresh.state).is_none());
    }
}
