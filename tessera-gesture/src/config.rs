//! Tunables for gesture detection and routing.
//!
//! Configuration is plain data. It is handed to the recognizer at
//! construction and can be replaced at runtime with
//! [`GestureRecognizer::set_config`](crate::GestureRecognizer::set_config),
//! which pushes the new values into every live provider.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use tessera_gesture::config::{
//!     GestureDetectorConfig, GestureProviderConfig, GestureRecognizerConfig,
//! };
//!
//! let config = GestureRecognizerConfig {
//!     provider: GestureProviderConfig {
//!         double_tap_enabled: true,
//!         detector: GestureDetectorConfig {
//!             long_press_timeout: Duration::from_millis(650),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert_eq!(config.max_separation_for_gesture_touches, 150.0);
//! ```

use std::time::Duration;

/// Geometric and timing thresholds of the gesture detector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GestureDetectorConfig {
    /// Distance a touch may travel before it is treated as a scroll rather
    /// than a tap. This is the radius of the slop region.
    pub touch_slop: f32,
    /// Maximum distance between two taps for them to count as consecutive.
    pub double_tap_slop: f32,
    /// Minimum release velocity, in pixels per second, that turns the end of
    /// a scroll into a fling.
    pub minimum_fling_velocity: f32,
    /// Release velocities are clamped to this magnitude.
    pub maximum_fling_velocity: f32,
    /// Delay after a press before a show-press gesture is emitted.
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub show_press_timeout: Duration,
    /// Delay after a press before a long-press gesture is emitted.
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub long_press_timeout: Duration,
    /// Maximum time between two taps for them to count as consecutive.
    #[cfg_attr(feature = "serde", serde(with = "millis"))]
    pub double_tap_timeout: Duration,
    /// Change in span between two touch points required to start a pinch.
    pub min_pinch_span_delta: f32,
}

impl Default for GestureDetectorConfig {
    fn default() -> Self {
        Self {
            touch_slop: 15.0,
            double_tap_slop: 100.0,
            minimum_fling_velocity: 30.0,
            maximum_fling_velocity: 20_000.0,
            show_press_timeout: Duration::from_millis(150),
            long_press_timeout: Duration::from_millis(1000),
            double_tap_timeout: Duration::from_millis(400),
            min_pinch_span_delta: 30.0,
        }
    }
}

/// Per-consumer provider settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GestureProviderConfig {
    /// Thresholds of the underlying detector.
    pub detector: GestureDetectorConfig,
    /// Whether the detector emits dedicated double-tap gestures. When
    /// disabled, consecutive taps are reported as taps with an increasing
    /// tap count instead.
    pub double_tap_enabled: bool,
    /// Whether two-finger pinch gestures are recognized.
    pub pinch_enabled: bool,
    /// Maximum number of simultaneous touch points per consumer. Presses
    /// beyond this limit are rejected.
    pub max_touch_points: usize,
}

impl Default for GestureProviderConfig {
    fn default() -> Self {
        Self {
            detector: GestureDetectorConfig::default(),
            double_tap_enabled: false,
            pinch_enabled: true,
            max_touch_points: 16,
        }
    }
}

/// Settings of the top-level recognizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GestureRecognizerConfig {
    /// Template for every provider the recognizer creates.
    pub provider: GestureProviderConfig,
    /// A new touch is grouped with an existing touch of another consumer only
    /// if it lands within this distance of it.
    pub max_separation_for_gesture_touches: f32,
}

impl Default for GestureRecognizerConfig {
    fn default() -> Self {
        Self {
            provider: GestureProviderConfig::default(),
            max_separation_for_gesture_touches: 150.0,
        }
    }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
