//! waymark-routing: Pure waypoint routing core for campus maps (sans-IO).
//!
//! Converts a free-form `(x, y, floor)` position and a destination into
//! drawable straight-line segments through:
//! snapshot -> nearest nodes -> single-floor Dijkstra -> cross-floor
//! composition -> segment building.
//!
//! Coordinates are percentages of the floor-plan image (`[0, 100]` on
//! both axes, `y` down). Segment lengths are rendered map pixels.
//!
//! This crate has **no I/O dependencies**: snapshots are parsed from
//! in-memory JSON text and results are returned as structured data.
//! Rendering lives in `waymark-export`; the command line in
//! `waymark-bench`.

pub mod compose;
pub mod diagnostics;
pub mod graph;
pub mod locate;
pub mod orchestrator;
pub mod route;
pub mod segment;
pub mod snapshot;
pub mod solver;
pub mod types;

pub use compose::{ComposedPath, StairTransition, compose};
pub use diagnostics::{Clock, RouteDiagnostics, RouteSummary, route_with_diagnostics};
pub use graph::WaypointGraph;
pub use locate::nearest;
pub use orchestrator::{Computation, RouteOrchestrator, RoutingState};
pub use route::{APPROXIMATE_ROUTE_MESSAGE, RouteOutcome, RouteRequest, RouteStatus, plan_route};
pub use segment::build_segments;
pub use snapshot::{
    Collection, DataIssue, Floor, Local, Snapshot, SnapshotError, Waypoint, WaypointKind,
};
pub use solver::{FloorPath, shortest_path};
pub use types::{
    FloorId, LocalId, Point, RoutePoint, RouteSegment, RoutingConfig, RoutingError,
    StairSelection, UserPosition, Viewport, WaypointId,
};

/// Route from the user's position to a point of interest.
///
/// # Steps
///
/// 1. Pin the position and the local to their floors
/// 2. Find the `k` nearest waypoints of each endpoint
/// 3. Solve each floor with Dijkstra between synthetic endpoints
/// 4. Join floors through one reciprocal stair pair
/// 5. Scale the path to pixel segments for `viewport`
///
/// Never fails; see [`RouteOutcome::status`].
#[must_use]
pub fn route(
    snapshot: &Snapshot,
    position: &UserPosition,
    destination: &Local,
    viewport: Option<Viewport>,
    config: &RoutingConfig,
) -> RouteOutcome {
    let request = RouteRequest::new(position.route_point(), destination.route_point(), viewport);
    plan_route(snapshot, &request, config)
}
