//! Floating-point coordinates for touch and gesture geometry.
//!
//! Touch contacts are reported with sub-pixel precision, so unlike the
//! integer [`Px`](https://docs.rs/tessera-ui/latest/tessera_ui/px/struct.Px.html)
//! types used for layout, gesture positions are kept as `f32`.
//!
//! # Key Types
//!
//! - [`GesturePoint`] - A 2D position in consumer-local or root coordinates
//! - [`GestureRect`] - An axis-aligned bounding box, used for the area covered
//!   by all touch points of a gesture
//!
//! # Coordinate System
//!
//! - Origin (0, 0) at the top-left corner of the consumer
//! - X-axis increases to the right
//! - Y-axis increases downward
//!
//! # Example
//!
//! ```
//! use tessera_gesture::geometry::{GesturePoint, GestureRect};
//!
//! let a = GesturePoint::new(0.0, 0.0);
//! let b = GesturePoint::new(3.0, 4.0);
//! assert_eq!(a.distance_to(b), 5.0);
//! assert_eq!(a.distance_squared_to(b), 25.0);
//!
//! let bounds = GestureRect::from_point(a).union_point(b);
//! assert!(bounds.contains(GesturePoint::new(1.0, 1.0)));
//! ```

use std::ops::{Add, Sub};

/// A position in gesture coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GesturePoint {
    /// The x-coordinate.
    pub x: f32,
    /// The y-coordinate.
    pub y: f32,
}

impl GesturePoint {
    /// A constant representing the zero position (0, 0).
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new point from x and y coordinates.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Offsets the point by the given deltas.
    ///
    /// # Examples
    ///
    /// ```
    /// use tessera_gesture::geometry::GesturePoint;
    ///
    /// let p = GesturePoint::new(10.0, 20.0).offset(5.0, -3.0);
    /// assert_eq!(p, GesturePoint::new(15.0, 17.0));
    /// ```
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Calculates the Euclidean distance to another point.
    pub fn distance_to(self, other: Self) -> f32 {
        self.distance_squared_to(other).sqrt()
    }

    /// Calculates the squared Euclidean distance to another point.
    ///
    /// Prefer this when only comparing distances against a threshold, which
    /// can be squared once instead of taking a root per comparison.
    pub fn distance_squared_to(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Returns the length of the vector from the origin to this point.
    pub fn length(self) -> f32 {
        self.distance_to(Self::ZERO)
    }
}

impl Add for GesturePoint {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for GesturePoint {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl From<[f32; 2]> for GesturePoint {
    fn from(value: [f32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<GesturePoint> for [f32; 2] {
    fn from(value: GesturePoint) -> Self {
        [value.x, value.y]
    }
}

/// An axis-aligned rectangle in gesture coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GestureRect {
    /// The x-coordinate of the top-left corner.
    pub x: f32,
    /// The y-coordinate of the top-left corner.
    pub y: f32,
    /// The width of the rectangle.
    pub width: f32,
    /// The height of the rectangle.
    pub height: f32,
}

impl GestureRect {
    /// A constant representing an empty rectangle at the origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Creates a new rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an empty rectangle located at `point`.
    pub const fn from_point(point: GesturePoint) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Creates a rectangle centered on `center` with the given half extents.
    ///
    /// Used for the contact area of a single touch point, whose radius is
    /// reported by the digitizer.
    pub fn from_center(center: GesturePoint, half_width: f32, half_height: f32) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            half_width * 2.0,
            half_height * 2.0,
        )
    }

    /// Returns the smallest rectangle containing both rectangles.
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Self::new(x, y, right - x, bottom - y)
    }

    /// Returns the smallest rectangle containing this rectangle and `point`.
    pub fn union_point(&self, point: GesturePoint) -> Self {
        self.union(&Self::from_point(point))
    }

    /// Returns the center of the rectangle.
    pub fn center(&self) -> GesturePoint {
        GesturePoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Checks whether a point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: GesturePoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}
