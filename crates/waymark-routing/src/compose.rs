//! Cross-floor path composition through a single stair pair.
//!
//! A route between two floors is three legs: start to the departure
//! stair on the start floor, the vertical move to the arrival stair, and
//! arrival stair to the end on the end floor. Consecutive points on
//! different floors are never joined by a drawn segment, so the vertical
//! move adds no horizontal distance.

use serde::{Deserialize, Serialize};

use crate::graph::WaypointGraph;
use crate::snapshot::Waypoint;
use crate::solver::{FloorPath, shortest_path};
use crate::types::{
    FloorId, RoutePoint, RoutingConfig, RoutingError, StairSelection, WaypointId,
};

/// The stair pair a cross-floor route uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StairTransition {
    /// Stair node left on the start floor.
    pub departure: WaypointId,
    /// Stair node reached on the end floor.
    pub arrival: WaypointId,
    /// Start floor.
    pub from: FloorId,
    /// End floor.
    pub to: FloorId,
}

/// A complete, possibly multi-floor path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedPath {
    /// Route points from start to end.
    pub points: Vec<RoutePoint>,
    /// Real waypoints visited, in path order.
    pub waypoints: Vec<WaypointId>,
    /// `true` if some leg was replaced by a straight line.
    pub degraded: bool,
    /// The stair pair used, for cross-floor routes.
    pub transition: Option<StairTransition>,
    /// Nodes settled across all searches.
    pub settled: usize,
}

impl From<FloorPath> for ComposedPath {
    fn from(path: FloorPath) -> Self {
        Self {
            points: path.points,
            waypoints: path.waypoints,
            degraded: false,
            transition: None,
            settled: path.settled,
        }
    }
}

impl ComposedPath {
    /// A two-point straight line standing in for an unreachable path.
    #[must_use]
    pub fn straight_line(start: &RoutePoint, end: &RoutePoint) -> Self {
        Self {
            points: vec![start.clone(), end.clone()],
            waypoints: Vec::new(),
            degraded: true,
            transition: None,
            settled: 0,
        }
    }

    /// Total drawn length in percent units, ignoring floor changes.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .filter(|w| w[0].floor == w[1].floor)
            .map(|w| w[0].point.distance(w[1].point))
            .sum()
    }
}

/// Compose the path from `start` to `end`, possibly across floors.
///
/// Same-floor requests are delegated to [`shortest_path`] unchanged.
///
/// # Errors
///
/// Returns [`RoutingError::NoFloorConnection`] if no reciprocal stair
/// pair links the two floors, and any error of [`shortest_path`] that
/// the straight-line fallback does not absorb. Only the cross-floor legs
/// fall back here; a same-floor [`RoutingError::PathUnreachable`] is
/// returned as is.
pub fn compose(
    graph: &WaypointGraph,
    start: &RoutePoint,
    end: &RoutePoint,
    config: &RoutingConfig,
) -> Result<ComposedPath, RoutingError> {
    if start.floor == end.floor {
        return shortest_path(graph, start.point, end.point, &start.floor, config)
            .map(ComposedPath::from);
    }

    if graph.count_on(start.floor.as_str()) == 0 {
        return Err(RoutingError::NoWaypointsOnFloor {
            floor: start.floor.clone(),
        });
    }
    if graph.count_on(end.floor.as_str()) == 0 {
        return Err(RoutingError::NoWaypointsOnFloor {
            floor: end.floor.clone(),
        });
    }

    let pairs = stair_pairs(graph, &start.floor, &end.floor);
    let Some((departure, arrival)) = select_pair(&pairs, start, end, config.stair_selection)
    else {
        tracing::debug!(from = %start.floor, to = %end.floor, "no stair pair links the floors");
        return Err(RoutingError::NoFloorConnection {
            from: start.floor.clone(),
            to: end.floor.clone(),
        });
    };
    tracing::debug!(
        departure = %departure.id,
        arrival = %arrival.id,
        candidates = pairs.len(),
        "stair pair selected"
    );

    let first = leg(graph, start, &departure.route_point(), config)?;
    let last = leg(graph, &arrival.route_point(), end, config)?;

    let mut composed = ComposedPath {
        points: Vec::with_capacity(first.points.len() + last.points.len() + 1),
        waypoints: first.waypoints,
        degraded: first.degraded || last.degraded,
        transition: Some(StairTransition {
            departure: departure.id.clone(),
            arrival: arrival.id.clone(),
            from: start.floor.clone(),
            to: end.floor.clone(),
        }),
        settled: first.settled + last.settled,
    };
    composed.waypoints.extend(last.waypoints);
    for point in first
        .points
        .into_iter()
        .chain(std::iter::once(arrival.route_point()))
        .chain(last.points)
    {
        if composed.points.last() != Some(&point) {
            composed.points.push(point);
        }
    }
    Ok(composed)
}

/// One same-floor leg, replaced by a straight line when unreachable and
/// the fallback is enabled.
fn leg(
    graph: &WaypointGraph,
    start: &RoutePoint,
    end: &RoutePoint,
    config: &RoutingConfig,
) -> Result<ComposedPath, RoutingError> {
    match shortest_path(graph, start.point, end.point, &start.floor, config) {
        Ok(path) => Ok(path.into()),
        Err(RoutingError::PathUnreachable { floor }) if config.straight_line_fallback => {
            tracing::debug!(%floor, "leg unreachable; using a straight line");
            Ok(ComposedPath::straight_line(start, end))
        }
        Err(e) => Err(e),
    }
}

/// Valid stair pairs from `from` to `to`, in discovery order of the
/// departure stairs.
///
/// A pair is valid when the departure stair links to the arrival stair
/// on `to` and the arrival stair links back to the departure stair on
/// `from`. Inconsistent pairs are skipped with a warning.
fn stair_pairs<'a>(
    graph: &'a WaypointGraph,
    from: &FloorId,
    to: &FloorId,
) -> Vec<(&'a Waypoint, &'a Waypoint)> {
    let mut pairs = Vec::new();
    for departure in graph.stairs_on(from.as_str()) {
        let Some((linked_floor, linked_id)) = departure.stair_link() else {
            continue;
        };
        if linked_floor != to {
            continue;
        }
        let Some(arrival) = graph.get(linked_id.as_str()) else {
            tracing::warn!(stair = %departure.id, linked = %linked_id, "stair links to an unknown waypoint");
            continue;
        };
        if &arrival.floor != to {
            tracing::warn!(
                stair = %departure.id,
                linked = %linked_id,
                floor = %arrival.floor,
                "stair links to a waypoint on a different floor than declared"
            );
            continue;
        }
        match arrival.stair_link() {
            Some((back_floor, back_id)) if back_floor == from && back_id == &departure.id => {
                pairs.push((departure, arrival));
            }
            _ => {
                tracing::warn!(
                    stair = %departure.id,
                    linked = %linked_id,
                    "stair pair is not reciprocal"
                );
            }
        }
    }
    pairs
}

fn select_pair<'a>(
    pairs: &[(&'a Waypoint, &'a Waypoint)],
    start: &RoutePoint,
    end: &RoutePoint,
    selection: StairSelection,
) -> Option<(&'a Waypoint, &'a Waypoint)> {
    match selection {
        StairSelection::FirstDiscovered => pairs.first().copied(),
        StairSelection::Nearest => pairs.iter().copied().min_by(|a, b| {
            let detour = |(d, r): (&Waypoint, &Waypoint)| {
                start.point.distance(d.point()) + r.point().distance(end.point)
            };
            detour(*a).total_cmp(&detour(*b))
        }),
    }
}
