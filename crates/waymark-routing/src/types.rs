//! Shared types for the waymark routing core.

use std::borrow::Borrow;
use std::fmt;

use geo::Euclidean;
use geo::line_measures::Distance;
use serde::{Deserialize, Serialize};

/// A 2D point in percentage-of-map-image coordinates.
///
/// Both axes range over `[0, 100]`; `y` grows downward like image rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (percent of map width from the left edge).
    pub x: f64,
    /// Vertical position (percent of map height from the top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point, in percent units.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        Euclidean.distance(geo::Point::from(self), geo::Point::from(other))
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(p: Point) -> Self {
        Self::new(p.x, p.y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a floor (e.g. `"terreo"`, `"primeiro"`).
    FloorId
);
string_id!(
    /// Identifier of a waypoint graph node.
    WaypointId
);
string_id!(
    /// Identifier of a point of interest.
    LocalId
);

/// A percent-space point pinned to a floor.
///
/// Paths produced by the solver and the cross-floor composer are
/// sequences of route points; a change of `floor` between consecutive
/// points marks a stair transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    /// Position on the floor plan.
    #[serde(flatten)]
    pub point: Point,
    /// Floor the position belongs to.
    pub floor: FloorId,
}

impl RoutePoint {
    /// Create a new route point.
    #[must_use]
    pub fn new(point: Point, floor: FloorId) -> Self {
        Self { point, floor }
    }
}

/// The user's position as delivered by the position provider.
///
/// Already normalized to a floor and percent coordinates; the routing
/// core never talks to a positioning sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Floor the user is on.
    pub floor: FloorId,
    /// Horizontal position in percent.
    pub x: f64,
    /// Vertical position in percent.
    pub y: f64,
    /// Accuracy radius in metres; `None` when placed manually.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl UserPosition {
    /// The position as a floor-pinned route point.
    #[must_use]
    pub fn route_point(&self) -> RoutePoint {
        RoutePoint::new(Point::new(self.x, self.y), self.floor.clone())
    }
}

/// Rendered map size in pixels, as reported by the viewport provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Rendered map width in pixels.
    pub width: f64,
    /// Rendered map height in pixels.
    pub height: f64,
}

impl Viewport {
    /// Sentinel used when the map has not been measured yet.
    ///
    /// Every segment scaled by it has zero length and is discarded.
    pub const UNMEASURED: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    /// Create a new viewport.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_measured(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Replace an absent or unusable viewport with [`Self::UNMEASURED`].
    #[must_use]
    pub fn sanitize(viewport: Option<Self>) -> Self {
        match viewport {
            Some(v) if v.is_measured() => v,
            other => {
                tracing::warn!(
                    viewport = ?other,
                    "map viewport is not measured; route segments will be empty"
                );
                Self::UNMEASURED
            }
        }
    }
}

/// A straight drawable piece of a route.
///
/// Anchored at `(x, y)` in percent units, extending `length` pixels in
/// direction `angle`. The implicit endpoint of segment `i` equals the
/// anchor of segment `i + 1` within one floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Anchor x in percent.
    pub x: f64,
    /// Anchor y in percent.
    pub y: f64,
    /// Length in rendered map pixels.
    pub length: f64,
    /// Direction in degrees: 0 points along +x, positive turns clockwise
    /// (screen space, +y down).
    pub angle: f64,
    /// Floor the segment is drawn on.
    pub floor: FloorId,
}

/// How the cross-floor composer picks a stair pair when several link the
/// same two floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StairSelection {
    /// Use the first valid pair in snapshot discovery order.
    #[default]
    FirstDiscovered,
    /// Use the pair minimizing the straight-line detour
    /// `start -> departure stair` plus `arrival stair -> end`.
    ///
    /// Ties fall back to discovery order.
    Nearest,
}

/// Configuration for route computation.
///
/// All parameters have defaults matching the behavior of the map
/// application; see the `DEFAULT_*` constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Number of real waypoints each synthetic start/end node is
    /// connected to.
    pub k_nearest: usize,

    /// Segments at or below this pixel length are discarded as
    /// degenerate.
    pub min_segment_length: f64,

    /// Stair pair selection policy for cross-floor routes.
    pub stair_selection: StairSelection,

    /// Substitute a straight line when a same-floor graph path does not
    /// exist. When `false`, an unreachable destination fails the route.
    pub straight_line_fallback: bool,
}

impl RoutingConfig {
    /// Default value for [`k_nearest`](Self::k_nearest).
    pub const DEFAULT_K_NEAREST: usize = 3;
    /// Default value for [`min_segment_length`](Self::min_segment_length).
    pub const DEFAULT_MIN_SEGMENT_LENGTH: f64 = 0.1;
    /// Default value for [`stair_selection`](Self::stair_selection).
    pub const DEFAULT_STAIR_SELECTION: StairSelection = StairSelection::FirstDiscovered;
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            k_nearest: Self::DEFAULT_K_NEAREST,
            min_segment_length: Self::DEFAULT_MIN_SEGMENT_LENGTH,
            stair_selection: Self::DEFAULT_STAIR_SELECTION,
            straight_line_fallback: true,
        }
    }
}

/// Errors that can occur while computing a route.
///
/// None of these cross the orchestrator boundary as a panic or `Err`;
/// the orchestrator records them as state plus message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum RoutingError {
    /// The floor has no routable waypoints.
    #[error("no waypoints found on floor {floor}; unable to route")]
    NoWaypointsOnFloor {
        /// The floor without waypoints.
        floor: FloorId,
    },

    /// No valid stair pair links the two floors.
    #[error("no stair or elevator connects floor {from} to floor {to}")]
    NoFloorConnection {
        /// Floor of the route start.
        from: FloorId,
        /// Floor of the route destination.
        to: FloorId,
    },

    /// The destination is not reachable through the waypoint graph.
    #[error("no waypoint path reaches the destination on floor {floor}")]
    PathUnreachable {
        /// Floor the search ran on.
        floor: FloorId,
    },

    /// Every segment of the route was degenerate.
    #[error("route has no drawable segments")]
    DegenerateGeometry,
}
