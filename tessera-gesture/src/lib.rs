//! tessera-gesture turns raw touch events into semantic gestures and decides
//! when and to whom those gestures are delivered.
//!
//! # Pipeline
//!
//! A touch event travels through these layers:
//!
//! 1. [`GestureRecognizer`] binds the contact to a consumer (a window, a view)
//!    and picks that consumer's [`GestureProviderAura`].
//! 2. The provider updates its [`MotionEventState`] and hands it to the
//!    [`FilteredGestureProvider`], which runs the [`GestureDetector`].
//! 3. The detected gestures are wrapped in a [`GestureEventDataPacket`] and
//!    queued in the [`TouchDispositionGestureFilter`].
//! 4. When the host acknowledges the touch event, the filter releases the
//!    packet, suppressing gestures the consumer already handled as touches.
//!
//! Gesture delivery therefore lags touch acks. Acks must arrive in the order
//! the touch events were submitted.
//!
//! # Usage
//!
//! ```
//! use std::time::Instant;
//!
//! use tessera_gesture::{
//!     ConsumerId, GestureKind, GestureRecognizer, TouchEvent, TouchEventKind,
//!     geometry::GesturePoint,
//! };
//!
//! let mut recognizer = GestureRecognizer::default();
//! let window = ConsumerId(1);
//!
//! let press = TouchEvent::new(
//!     TouchEventKind::Pressed,
//!     0,
//!     GesturePoint::new(10.0, 10.0),
//!     Instant::now(),
//! );
//! let result = recognizer.process_touch_event_pre_dispatch(&press, window);
//! assert!(result.succeeded);
//!
//! // The host offers the touch to the window; the window ignores it.
//! let gestures = recognizer.ack_touch_event(press.unique_event_id, false, false, window);
//! assert_eq!(gestures[0].kind(), GestureKind::TapDown);
//! ```
//!
//! # Timers
//!
//! Show-press and long-press depend on time alone. The host polls
//! [`GestureRecognizer::next_timer_deadline`] and calls
//! [`GestureRecognizer::on_timer`] when it passes; timer gestures go out
//! through the registered [`GestureEventHelper`]s without waiting for acks.
//!
//! # Protocol violations
//!
//! Acking an event twice, or out of order, breaks the ordering guarantees
//! every consumer relies on. Such violations panic with a message starting
//! with [`error::PROTOCOL_VIOLATION_PANIC_PREFIX`].

#![deny(missing_docs, clippy::unwrap_used)]

pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod filtered_provider;
pub mod geometry;
pub mod gesture_event;
pub mod logging;
pub mod motion_event;
pub mod packet;
pub mod provider;
pub mod recognizer;
pub mod touch_event;


pub use crate::{
    config::{GestureDetectorConfig, GestureProviderConfig, GestureRecognizerConfig},
    detector::GestureDetector,
    error::{GestureProtocolViolation, fatal},
    filter::TouchDispositionGestureFilter,
    filtered_provider::{FilteredGestureProvider, TouchHandlingResult},
    gesture_event::{GestureEventData, GestureKind, GestureType},
    logging::init_tracing,
    motion_event::{MotionAction, MotionEventState},
    packet::{AckState, GestureEventDataPacket, GestureSource},
    provider::{GestureProviderAura, GestureProviderAuraClient},
    recognizer::{
        ConsumerId, GestureEventHelper, GestureRecognizer, HelperId, ProviderKey,
        TransferTouchesBehavior,
    },
    touch_event::{EventFlags, PointerDetails, ToolType, TouchEvent, TouchEventKind},
};
