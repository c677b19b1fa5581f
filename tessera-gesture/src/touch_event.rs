//! Touch events as delivered by the platform input pipeline.
//!
//! A [`TouchEvent`] describes a change of exactly one contact. Multi-touch
//! state is reconstructed per consumer by
//! [`MotionEventState`](crate::motion_event::MotionEventState).

use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Instant,
};

use crate::geometry::GesturePoint;

static NEXT_UNIQUE_EVENT_ID: AtomicU32 = AtomicU32::new(1);

/// What happened to the contact described by a [`TouchEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    /// The contact touched down.
    Pressed,
    /// The contact moved.
    Moved,
    /// The contact lifted.
    Released,
    /// The contact was cancelled by the system or by gesture transfer.
    Cancelled,
}

/// The kind of tool producing a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolType {
    /// The tool could not be determined.
    Unknown,
    /// A finger.
    #[default]
    Finger,
    /// A stylus tip.
    Stylus,
    /// A mouse emulating touch.
    Mouse,
    /// A stylus eraser.
    Eraser,
}

/// Per-contact details of a touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerDetails {
    /// Stable identifier of the contact for its whole lifetime.
    pub id: i32,
    /// The tool producing the contact.
    pub tool_type: ToolType,
    /// Half width of the contact ellipse.
    pub radius_x: f32,
    /// Half height of the contact ellipse.
    pub radius_y: f32,
    /// Normalized pressure, or `NaN` if unknown.
    pub force: f32,
}

impl PointerDetails {
    /// Details for a finger contact with unknown size and pressure.
    pub fn finger(id: i32) -> Self {
        Self {
            id,
            tool_type: ToolType::Finger,
            radius_x: 0.0,
            radius_y: 0.0,
            force: f32::NAN,
        }
    }
}

/// Bit flags attached to input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventFlags {
    /// The event was generated by this crate rather than by the platform.
    pub synthesized: bool,
}

/// A single hardware-reported contact change.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    /// What happened to the contact.
    pub kind: TouchEventKind,
    /// Which contact changed.
    pub pointer: PointerDetails,
    /// Position in consumer-local coordinates.
    pub location: GesturePoint,
    /// Position in root (window) coordinates.
    pub root_location: GesturePoint,
    /// Identifier of the digitizer that reported the contact.
    pub source_device_id: i32,
    /// When the change happened.
    pub timestamp: Instant,
    /// Identifier used to match the event with its acknowledgement.
    pub unique_event_id: u32,
    /// Event flags.
    pub flags: EventFlags,
}

impl TouchEvent {
    /// Creates a finger event with a freshly allocated unique id.
    ///
    /// The event's root location equals its location; use
    /// [`with_root_location`](Self::with_root_location) when they differ.
    pub fn new(
        kind: TouchEventKind,
        pointer_id: i32,
        location: GesturePoint,
        timestamp: Instant,
    ) -> Self {
        Self {
            kind,
            pointer: PointerDetails::finger(pointer_id),
            location,
            root_location: location,
            source_device_id: 0,
            timestamp,
            unique_event_id: Self::next_unique_event_id(),
            flags: EventFlags::default(),
        }
    }

    /// Creates a synthesized event, as injected by cancellation and transfer.
    pub fn synthesized(
        kind: TouchEventKind,
        pointer: PointerDetails,
        location: GesturePoint,
        root_location: GesturePoint,
        source_device_id: i32,
        timestamp: Instant,
    ) -> Self {
        Self {
            kind,
            pointer,
            location,
            root_location,
            source_device_id,
            timestamp,
            unique_event_id: Self::next_unique_event_id(),
            flags: EventFlags { synthesized: true },
        }
    }

    /// Sets the root location.
    pub fn with_root_location(mut self, root_location: GesturePoint) -> Self {
        self.root_location = root_location;
        self
    }

    /// Sets the reporting device.
    pub fn with_source_device_id(mut self, source_device_id: i32) -> Self {
        self.source_device_id = source_device_id;
        self
    }

    /// Allocates a process-unique touch event id.
    ///
    /// Ids are never zero.
    pub fn next_unique_event_id() -> u32 {
        loop {
            let id = NEXT_UNIQUE_EVENT_ID.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}
