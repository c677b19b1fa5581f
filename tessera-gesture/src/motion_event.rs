//! Multi-touch pointer state of a single consumer.
//!
//! Platform touch events each describe one contact. [`MotionEventState`]
//! folds them into the table of contacts currently down and derives the
//! multi-touch [`MotionAction`] the detector works with: the first press of a
//! stream is a [`MotionAction::Down`], later presses are
//! [`MotionAction::PointerDown`], and so on.
//!
//! Removal of a released or cancelled contact is deferred until
//! [`MotionEventState::cleanup_removed_pointers`] so the detector and the
//! packet builder still see the final position of the contact that lifted.

use std::time::Instant;

use smallvec::SmallVec;
use tracing::trace;

use crate::{
    geometry::{GesturePoint, GestureRect},
    touch_event::{EventFlags, PointerDetails, ToolType, TouchEvent, TouchEventKind},
};

/// Multi-touch action of the most recent touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionAction {
    /// The first contact of a stream went down.
    Down,
    /// One of the contacts moved.
    Move,
    /// The last contact of a stream lifted.
    Up,
    /// The stream was cancelled.
    Cancel,
    /// An additional contact went down.
    PointerDown,
    /// A contact lifted while others remain down.
    PointerUp,
}

/// A contact that is currently down.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    /// Stable identifier of the contact.
    pub id: i32,
    /// Latest position in consumer-local coordinates.
    pub location: GesturePoint,
    /// Latest position in root coordinates.
    pub root_location: GesturePoint,
    /// The tool producing the contact.
    pub tool_type: ToolType,
    /// The digitizer that reported the contact.
    pub source_device_id: i32,
    /// Half width of the contact ellipse.
    pub radius_x: f32,
    /// Half height of the contact ellipse.
    pub radius_y: f32,
    /// Normalized pressure, or `NaN` if unknown.
    pub force: f32,
    /// When the contact went down.
    pub down_time: Instant,
}

impl Pointer {
    fn from_event(event: &TouchEvent) -> Self {
        Self {
            id: event.pointer.id,
            location: event.location,
            root_location: event.root_location,
            tool_type: event.pointer.tool_type,
            source_device_id: event.source_device_id,
            radius_x: event.pointer.radius_x,
            radius_y: event.pointer.radius_y,
            force: event.pointer.force,
            down_time: event.timestamp,
        }
    }

    fn update(&mut self, event: &TouchEvent) {
        self.location = event.location;
        self.root_location = event.root_location;
        self.radius_x = event.pointer.radius_x;
        self.radius_y = event.pointer.radius_y;
        self.force = event.pointer.force;
    }

    /// The contact area of this pointer.
    pub fn bounds(&self) -> GestureRect {
        GestureRect::from_center(self.location, self.radius_x, self.radius_y)
    }

    /// Pointer details to attach to events synthesized for this contact.
    pub fn details(&self) -> PointerDetails {
        PointerDetails {
            id: self.id,
            tool_type: self.tool_type,
            radius_x: self.radius_x,
            radius_y: self.radius_y,
            force: self.force,
        }
    }
}

/// The table of contacts currently down for one consumer, plus the derived
/// action of the last accepted touch event.
#[derive(Debug, Clone)]
pub struct MotionEventState {
    pointers: SmallVec<[Pointer; 4]>,
    action: MotionAction,
    action_index: usize,
    unique_event_id: u32,
    event_time: Option<Instant>,
    flags: EventFlags,
    max_touch_points: usize,
    pending_removal: Option<i32>,
}

impl MotionEventState {
    /// Creates an empty state accepting at most `max_touch_points` contacts.
    pub fn new(max_touch_points: usize) -> Self {
        Self {
            pointers: SmallVec::new(),
            action: MotionAction::Cancel,
            action_index: 0,
            unique_event_id: 0,
            event_time: None,
            flags: EventFlags::default(),
            max_touch_points,
            pending_removal: None,
        }
    }

    /// Changes the contact limit. Contacts already down are kept.
    pub fn set_max_touch_points(&mut self, max_touch_points: usize) {
        self.max_touch_points = max_touch_points;
    }

    /// Applies a touch event.
    ///
    /// Returns `false`, leaving the state untouched, if the event is
    /// inconsistent with the contacts currently down: a press for a contact
    /// that is already down or beyond the contact limit, or any other change
    /// for an unknown contact.
    pub fn on_touch(&mut self, event: &TouchEvent) -> bool {
        self.cleanup_removed_pointers();

        let index = self.index_of(event.pointer.id);
        let (action, action_index) = match (event.kind, index) {
            (TouchEventKind::Pressed, Some(_)) => {
                trace!(pointer_id = event.pointer.id, "press for a pointer already down");
                return false;
            }
            (TouchEventKind::Pressed, None) => {
                if self.pointers.len() >= self.max_touch_points {
                    trace!(
                        pointer_id = event.pointer.id,
                        max = self.max_touch_points,
                        "press exceeds the touch point limit"
                    );
                    return false;
                }
                self.pointers.push(Pointer::from_event(event));
                let action = if self.pointers.len() == 1 {
                    MotionAction::Down
                } else {
                    MotionAction::PointerDown
                };
                (action, self.pointers.len() - 1)
            }
            (_, None) => {
                trace!(
                    pointer_id = event.pointer.id,
                    kind = ?event.kind,
                    "touch for a pointer that is not down"
                );
                return false;
            }
            (TouchEventKind::Moved, Some(index)) => {
                self.pointers[index].update(event);
                (MotionAction::Move, index)
            }
            (TouchEventKind::Released, Some(index)) => {
                self.pointers[index].update(event);
                self.pending_removal = Some(event.pointer.id);
                let action = if self.pointers.len() == 1 {
                    MotionAction::Up
                } else {
                    MotionAction::PointerUp
                };
                (action, index)
            }
            (TouchEventKind::Cancelled, Some(index)) => {
                self.pointers[index].update(event);
                self.pending_removal = Some(event.pointer.id);
                (MotionAction::Cancel, index)
            }
        };

        self.action = action;
        self.action_index = action_index;
        self.unique_event_id = event.unique_event_id;
        self.event_time = Some(event.timestamp);
        self.flags = event.flags;
        true
    }

    /// Drops the contact released or cancelled by the last touch event.
    pub fn cleanup_removed_pointers(&mut self) {
        if let Some(id) = self.pending_removal.take()
            && let Some(index) = self.index_of(id)
        {
            self.pointers.remove(index);
        }
    }

    /// Builds one cancel event per contact that is currently down.
    ///
    /// Used to collapse an in-flight gesture stream without new input.
    pub fn synthesize_cancel_events(&self, timestamp: Instant) -> Vec<TouchEvent> {
        self.live_pointers()
            .map(|pointer| {
                TouchEvent::synthesized(
                    TouchEventKind::Cancelled,
                    pointer.details(),
                    pointer.location,
                    pointer.root_location,
                    pointer.source_device_id,
                    timestamp,
                )
            })
            .collect()
    }

    /// Contacts that are still down, excluding one whose removal is pending.
    pub fn live_pointers(&self) -> impl Iterator<Item = &Pointer> {
        let pending = self.pending_removal;
        self.pointers
            .iter()
            .filter(move |pointer| Some(pointer.id) != pending)
    }

    fn index_of(&self, id: i32) -> Option<usize> {
        self.pointers.iter().position(|pointer| pointer.id == id)
    }

    /// The action derived from the last accepted touch event.
    pub fn action(&self) -> MotionAction {
        self.action
    }

    /// Index of the contact that changed in the last accepted touch event.
    pub fn action_index(&self) -> usize {
        self.action_index
    }

    /// The contact that changed in the last accepted touch event.
    pub fn action_pointer(&self) -> Option<&Pointer> {
        self.pointers.get(self.action_index)
    }

    /// All tracked contacts, including one whose removal is pending.
    pub fn pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    /// Number of tracked contacts, including one whose removal is pending.
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Looks a contact up by id.
    pub fn pointer_by_id(&self, id: i32) -> Option<&Pointer> {
        self.pointers.iter().find(|pointer| pointer.id == id)
    }

    /// The unique id of the last accepted touch event.
    pub fn unique_event_id(&self) -> u32 {
        self.unique_event_id
    }

    /// The timestamp of the last accepted touch event.
    pub fn event_time(&self) -> Option<Instant> {
        self.event_time
    }

    /// The flags of the last accepted touch event.
    pub fn flags(&self) -> EventFlags {
        self.flags
    }

    /// The bounding box of all tracked contacts.
    pub fn bounding_box(&self) -> GestureRect {
        let mut pointers = self.pointers.iter();
        let Some(first) = pointers.next() else {
            return GestureRect::ZERO;
        };
        pointers.fold(first.bounds(), |bounds, pointer| {
            bounds.union(&pointer.bounds())
        })
    }
}
