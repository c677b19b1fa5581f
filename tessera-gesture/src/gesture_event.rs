//! Gesture events produced by the detector.
//!
//! [`GestureType`] carries the kind-specific payload of a gesture (scroll
//! deltas, fling velocity, pinch scale, tap count). [`GestureKind`] is its
//! payload-free discriminant, used where only the kind matters, such as the
//! suppression bookkeeping of the disposition filter.

use std::time::Instant;

use crate::{
    geometry::{GesturePoint, GestureRect},
    touch_event::{EventFlags, ToolType},
};

/// Number of [`GestureKind`] variants.
pub(crate) const GESTURE_KIND_COUNT: usize = 14;

/// Payload-free kind of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GestureKind {
    /// A contact went down and may become a tap.
    TapDown,
    /// The contact stayed down long enough to show press feedback.
    ShowPress,
    /// A completed tap.
    Tap,
    /// A completed second tap, when double-tap detection is enabled.
    DoubleTap,
    /// A pending tap will not complete.
    TapCancel,
    /// The contact stayed down for the long-press timeout.
    LongPress,
    /// A contact lifted after a long press.
    LongTap,
    /// The contact left the slop region and a scroll started.
    ScrollBegin,
    /// The scroll moved.
    ScrollUpdate,
    /// The scroll ended without momentum.
    ScrollEnd,
    /// The scroll ended with momentum.
    FlingStart,
    /// Two contacts started pinching.
    PinchBegin,
    /// The pinch span changed.
    PinchUpdate,
    /// The pinch ended.
    PinchEnd,
}

impl GestureKind {
    /// Index of the kind in a per-kind table.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The kind whose forwarding is a prerequisite for this kind.
    ///
    /// If the antecedent of a gesture was dropped, the gesture is dropped
    /// too so consumers never see an update or end without its begin.
    pub fn antecedent(self) -> Option<GestureKind> {
        match self {
            GestureKind::ScrollUpdate | GestureKind::ScrollEnd | GestureKind::FlingStart => {
                Some(GestureKind::ScrollBegin)
            }
            GestureKind::PinchUpdate | GestureKind::PinchEnd => Some(GestureKind::PinchBegin),
            GestureKind::ShowPress
            | GestureKind::Tap
            | GestureKind::DoubleTap
            | GestureKind::TapCancel
            | GestureKind::LongPress
            | GestureKind::LongTap => Some(GestureKind::TapDown),
            GestureKind::TapDown | GestureKind::ScrollBegin | GestureKind::PinchBegin => None,
        }
    }

    /// Whether the kind closes a gesture stream that is already underway.
    ///
    /// Terminating kinds are still delivered when the touch that produced
    /// them was consumed, as long as their antecedent was delivered.
    pub fn is_terminating(self) -> bool {
        matches!(
            self,
            GestureKind::ScrollEnd
                | GestureKind::FlingStart
                | GestureKind::PinchEnd
                | GestureKind::TapCancel
        )
    }
}

/// A gesture together with its kind-specific payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureType {
    /// See [`GestureKind::TapDown`].
    TapDown,
    /// See [`GestureKind::ShowPress`].
    ShowPress,
    /// See [`GestureKind::Tap`].
    Tap {
        /// 1 for a single tap, 2 or 3 for consecutive taps.
        tap_count: u32,
    },
    /// See [`GestureKind::DoubleTap`].
    DoubleTap,
    /// See [`GestureKind::TapCancel`].
    TapCancel,
    /// See [`GestureKind::LongPress`].
    LongPress,
    /// See [`GestureKind::LongTap`].
    LongTap,
    /// See [`GestureKind::ScrollBegin`].
    ScrollBegin {
        /// Horizontal movement that triggered the scroll.
        delta_x_hint: f32,
        /// Vertical movement that triggered the scroll.
        delta_y_hint: f32,
    },
    /// See [`GestureKind::ScrollUpdate`].
    ScrollUpdate {
        /// Horizontal movement since the previous update.
        delta_x: f32,
        /// Vertical movement since the previous update.
        delta_y: f32,
    },
    /// See [`GestureKind::ScrollEnd`].
    ScrollEnd,
    /// See [`GestureKind::FlingStart`].
    FlingStart {
        /// Horizontal release velocity in pixels per second.
        velocity_x: f32,
        /// Vertical release velocity in pixels per second.
        velocity_y: f32,
    },
    /// See [`GestureKind::PinchBegin`].
    PinchBegin,
    /// See [`GestureKind::PinchUpdate`].
    PinchUpdate {
        /// Span ratio relative to the previous update.
        scale: f32,
    },
    /// See [`GestureKind::PinchEnd`].
    PinchEnd,
}

impl GestureType {
    /// The payload-free kind of this gesture.
    pub fn kind(&self) -> GestureKind {
        match self {
            GestureType::TapDown => GestureKind::TapDown,
            GestureType::ShowPress => GestureKind::ShowPress,
            GestureType::Tap { .. } => GestureKind::Tap,
            GestureType::DoubleTap => GestureKind::DoubleTap,
            GestureType::TapCancel => GestureKind::TapCancel,
            GestureType::LongPress => GestureKind::LongPress,
            GestureType::LongTap => GestureKind::LongTap,
            GestureType::ScrollBegin { .. } => GestureKind::ScrollBegin,
            GestureType::ScrollUpdate { .. } => GestureKind::ScrollUpdate,
            GestureType::ScrollEnd => GestureKind::ScrollEnd,
            GestureType::FlingStart { .. } => GestureKind::FlingStart,
            GestureType::PinchBegin => GestureKind::PinchBegin,
            GestureType::PinchUpdate { .. } => GestureKind::PinchUpdate,
            GestureType::PinchEnd => GestureKind::PinchEnd,
        }
    }
}

/// A gesture event travelling through the pipeline.
///
/// `unique_touch_event_id` is assigned when the event is pushed into a
/// [`GestureEventDataPacket`](crate::packet::GestureEventDataPacket), and
/// `non_blocking` when that packet is acked. Nothing else changes after
/// creation.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEventData {
    /// What gesture this is.
    pub details: GestureType,
    /// Id of the contact that primarily produced the gesture.
    pub motion_event_id: i32,
    /// Tool type of that contact.
    pub primary_tool_type: ToolType,
    /// When the gesture happened.
    pub time: Instant,
    /// Gesture position in consumer-local coordinates.
    pub location: GesturePoint,
    /// Gesture position in root coordinates.
    pub raw_location: GesturePoint,
    /// Number of contacts down when the gesture was produced.
    pub touch_point_count: usize,
    /// Area covered by all contacts.
    pub bounding_box: GestureRect,
    /// Flags copied from the originating touch event.
    pub flags: EventFlags,
    /// Id of the touch event this gesture is attributed to.
    pub unique_touch_event_id: u32,
    /// Whether the originating touch event was dispatched without blocking.
    pub non_blocking: bool,
}

impl GestureEventData {
    /// Creates a gesture that is not yet attributed to a touch event.
    pub fn new(
        details: GestureType,
        motion_event_id: i32,
        time: Instant,
        location: GesturePoint,
        raw_location: GesturePoint,
        touch_point_count: usize,
        bounding_box: GestureRect,
    ) -> Self {
        Self {
            details,
            motion_event_id,
            primary_tool_type: ToolType::Finger,
            time,
            location,
            raw_location,
            touch_point_count,
            bounding_box,
            flags: EventFlags::default(),
            unique_touch_event_id: 0,
            non_blocking: false,
        }
    }

    /// Creates a gesture of a different type that otherwise copies `other`.
    ///
    /// Used for terminators synthesized on behalf of an existing gesture
    /// stream.
    pub fn with_details(details: GestureType, other: &GestureEventData) -> Self {
        Self {
            details,
            ..other.clone()
        }
    }

    /// The payload-free kind of the gesture.
    pub fn kind(&self) -> GestureKind {
        self.details.kind()
    }
}
