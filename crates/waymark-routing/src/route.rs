//! One-shot route planning: path, segments and outcome classification.

use serde::{Deserialize, Serialize};

use crate::compose::{ComposedPath, StairTransition, compose};
use crate::graph::WaypointGraph;
use crate::segment::build_segments;
use crate::snapshot::{Snapshot, Waypoint};
use crate::types::{RoutePoint, RouteSegment, RoutingConfig, RoutingError, Viewport};

/// Message shown alongside a straight-line approximation.
pub const APPROXIMATE_ROUTE_MESSAGE: &str =
    "approximate route: no walkable path was found, showing a straight line";

/// A single routing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Where the route starts (usually the user position).
    pub start: RoutePoint,
    /// Where the route ends (usually the selected local).
    pub end: RoutePoint,
    /// Rendered map size; `None` while the map is not measured.
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

impl RouteRequest {
    /// Create a new request.
    #[must_use]
    pub const fn new(start: RoutePoint, end: RoutePoint, viewport: Option<Viewport>) -> Self {
        Self {
            start,
            end,
            viewport,
        }
    }
}

/// How a route computation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteStatus {
    /// A graph path was found and has drawable segments.
    Ready,
    /// At least one part of the route is a straight-line approximation.
    Degraded,
    /// No route can be shown.
    Failed {
        /// The reason.
        error: RoutingError,
    },
}

/// Result of [`plan_route`].
///
/// A failed outcome carries no path, segments or debug waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    /// Route points from start to end.
    pub path: Vec<RoutePoint>,
    /// Drawable segments in path order.
    pub segments: Vec<RouteSegment>,
    /// The waypoints the solved path visits, for visualization.
    pub debug_waypoints: Vec<Waypoint>,
    /// Stair pair used by a cross-floor route.
    pub transition: Option<StairTransition>,
    /// Nodes settled across all searches.
    pub settled: usize,
    /// Classification of the result.
    #[serde(flatten)]
    pub status: RouteStatus,
}

impl RouteOutcome {
    /// A failed outcome with every output cleared.
    #[must_use]
    pub const fn failed(error: RoutingError) -> Self {
        Self {
            path: Vec::new(),
            segments: Vec::new(),
            debug_waypoints: Vec::new(),
            transition: None,
            settled: 0,
            status: RouteStatus::Failed { error },
        }
    }

    /// The routing error, if the route failed.
    #[must_use]
    pub const fn error(&self) -> Option<&RoutingError> {
        match &self.status {
            RouteStatus::Failed { error } => Some(error),
            RouteStatus::Ready | RouteStatus::Degraded => None,
        }
    }

    /// User-facing message: the failure reason, or the approximate-route
    /// warning for degraded routes.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match &self.status {
            RouteStatus::Ready => None,
            RouteStatus::Degraded => Some(APPROXIMATE_ROUTE_MESSAGE.to_string()),
            RouteStatus::Failed { error } => Some(error.to_string()),
        }
    }
}

/// Plan a route on a snapshot.
///
/// Never fails: routing errors are reported through
/// [`RouteOutcome::status`].
#[must_use]
pub fn plan_route(
    snapshot: &Snapshot,
    request: &RouteRequest,
    config: &RoutingConfig,
) -> RouteOutcome {
    let solved = solve_path(snapshot.graph(), request, config);
    assemble(snapshot.graph(), solved, request.viewport, config)
}

/// Compose the path, substituting a straight line for an unreachable
/// same-floor destination when the fallback is enabled.
pub(crate) fn solve_path(
    graph: &WaypointGraph,
    request: &RouteRequest,
    config: &RoutingConfig,
) -> Result<ComposedPath, RoutingError> {
    match compose(graph, &request.start, &request.end, config) {
        Err(RoutingError::PathUnreachable { floor }) if config.straight_line_fallback => {
            tracing::debug!(%floor, "destination unreachable; using a straight line");
            Ok(ComposedPath::straight_line(&request.start, &request.end))
        }
        other => other,
    }
}

/// Build segments for a solved path and classify the outcome.
pub(crate) fn assemble(
    graph: &WaypointGraph,
    solved: Result<ComposedPath, RoutingError>,
    viewport: Option<Viewport>,
    config: &RoutingConfig,
) -> RouteOutcome {
    let path = match solved {
        Ok(path) => path,
        Err(error) => {
            tracing::debug!(%error, "route failed");
            return RouteOutcome::failed(error);
        }
    };

    let segments = build_segments(
        &path.points,
        Viewport::sanitize(viewport),
        config.min_segment_length,
    );
    if segments.is_empty() {
        tracing::debug!(points = path.points.len(), "route has no drawable segments");
        return RouteOutcome::failed(RoutingError::DegenerateGeometry);
    }

    let status = if path.degraded {
        RouteStatus::Degraded
    } else {
        RouteStatus::Ready
    };
    let debug_waypoints = path
        .waypoints
        .iter()
        .filter_map(|id| graph.get(id.as_str()).cloned())
        .collect();

    RouteOutcome {
        path: path.points,
        segments,
        debug_waypoints,
        transition: path.transition,
        settled: path.settled,
        status,
    }
}
