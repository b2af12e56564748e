//! Nearest-node lookup on a single floor.

use crate::graph::WaypointGraph;
use crate::snapshot::Waypoint;
use crate::types::Point;

/// Return up to `k` waypoints on `floor` closest to `point`.
///
/// Results are sorted by ascending Euclidean distance in percent space;
/// equal distances keep the waypoints' discovery order. Returns an empty
/// list when the floor has no waypoints, `k` is zero, or `point` is not
/// finite.
#[must_use]
pub fn nearest<'a>(
    graph: &'a WaypointGraph,
    point: Point,
    floor: &str,
    k: usize,
) -> Vec<&'a Waypoint> {
    nearest_indices(graph, point, floor, k)
        .into_iter()
        .map(|i| graph.by_index(i))
        .collect()
}

/// Discovery indices of the `k` nearest waypoints, in the same order as
/// [`nearest`].
pub(crate) fn nearest_indices(
    graph: &WaypointGraph,
    point: Point,
    floor: &str,
    k: usize,
) -> Vec<usize> {
    if k == 0 || !point.is_finite() {
        return Vec::new();
    }
    let Some(fg) = graph.floor_graph(floor) else {
        return Vec::new();
    };

    // Keep pulling while distances tie with the k-th candidate, so that
    // the stable re-sort below sees every contender for the last slot.
    let query: [f64; 2] = point.into();
    let mut found: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
    for (candidate, d2) in fg.tree.nearest_neighbor_iter_with_distance_2(&query) {
        if found.len() >= k && found.last().is_some_and(|&(last, _)| d2 > last) {
            break;
        }
        found.push((d2, candidate.data));
    }

    found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    found.truncate(k);
    found.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(wps: &[&Waypoint]) -> Vec<String> {
        wps.iter().map(|w| w.id.to_string()).collect()
    }

    fn line_graph() -> WaypointGraph {
        WaypointGraph::new(vec![
            Waypoint::new("far", "f", 90.0, 0.0, &[]),
            Waypoint::new("mid", "f", 50.0, 0.0, &[]),
            Waypoint::new("near", "f", 10.0, 0.0, &[]),
            Waypoint::new("other", "g", 0.0, 0.0, &[]),
        ])
    }

    #[test]
    fn sorted_by_distance() {
        let graph = line_graph();
        let found = nearest(&graph, Point::new(0.0, 0.0), "f", 3);
        assert_eq!(ids(&found), vec!["near", "mid", "far"]);
    }

    #[test]
    fn fewer_than_k_returns_all() {
        let graph = line_graph();
        assert_eq!(nearest(&graph, Point::new(0.0, 0.0), "g", 3).len(), 1);
    }

    #[test]
    fn restricted_to_floor() {
        let graph = line_graph();
        let found = nearest(&graph, Point::new(0.0, 0.0), "f", 1);
        assert_eq!(ids(&found), vec!["near"]);
    }

    #[test]
    fn empty_floor_or_zero_k() {
        let graph = line_graph();
        assert!(nearest(&graph, Point::new(0.0, 0.0), "missing", 3).is_empty());
        assert!(nearest(&graph, Point::new(0.0, 0.0), "f", 0).is_empty());
        assert!(nearest(&graph, Point::new(f64::NAN, 0.0), "f", 3).is_empty());
    }

    #[test]
    fn ties_keep_discovery_order() {
        // Four nodes at the same distance from the center.
        let graph = WaypointGraph::new(vec![
            Waypoint::new("d", "f", 50.0, 60.0, &[]),
            Waypoint::new("a", "f", 40.0, 50.0, &[]),
            Waypoint::new("c", "f", 60.0, 50.0, &[]),
            Waypoint::new("b", "f", 50.0, 40.0, &[]),
        ]);
        let found = nearest(&graph, Point::new(50.0, 50.0), "f", 3);
        assert_eq!(ids(&found), vec!["d", "a", "c"]);
    }
}
