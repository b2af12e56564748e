//! Single-floor shortest path between two free-form points.
//!
//! The route endpoints are usually not waypoints themselves. The solver
//! injects two synthetic nodes into a copy of the floor graph: `START`
//! with edges to its `k` nearest waypoints and `END` with edges from
//! `END`'s `k` nearest waypoints. `START` has no incoming edges and
//! `END` no outgoing ones, so neither can be an intermediate hop.
//!
//! The search is a plain Dijkstra over Euclidean percent-space weights.
//! Among frontier nodes with equal tentative distance the one with the
//! lowest waypoint id is settled first, which keeps results stable for
//! identical inputs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::graph::{GraphNode, WaypointGraph};
use crate::locate::nearest_indices;
use crate::types::{FloorId, Point, RoutePoint, RoutingConfig, RoutingError, WaypointId};

/// A path found on one floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPath {
    /// Floor the path runs on.
    pub floor: FloorId,
    /// Points from the start position to the end position, inclusive.
    pub points: Vec<RoutePoint>,
    /// Real waypoints visited, in path order.
    pub waypoints: Vec<WaypointId>,
    /// Number of nodes settled by the search.
    pub settled: usize,
}

/// Frontier entry, ordered so that [`BinaryHeap`] pops the lowest cost
/// first and, among equal costs, the lowest node index.
#[derive(Debug, Clone, Copy)]
struct State {
    cost: f64,
    node: NodeIndex,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for State {}

/// Find the shortest path from `start` to `end` on `floor`.
///
/// Returns the single point `[start]` when `start == end`.
///
/// # Errors
///
/// Returns [`RoutingError::NoWaypointsOnFloor`] if `floor` has no
/// waypoints, and [`RoutingError::PathUnreachable`] if no path through
/// the graph connects the two synthetic nodes.
pub fn shortest_path(
    graph: &WaypointGraph,
    start: Point,
    end: Point,
    floor: &FloorId,
    config: &RoutingConfig,
) -> Result<FloorPath, RoutingError> {
    let fg = graph
        .floor_graph(floor.as_str())
        .ok_or_else(|| RoutingError::NoWaypointsOnFloor {
            floor: floor.clone(),
        })?;

    if start == end {
        return Ok(FloorPath {
            floor: floor.clone(),
            points: vec![RoutePoint::new(start, floor.clone())],
            waypoints: Vec::new(),
            settled: 0,
        });
    }

    let mut g = fg.graph.clone();
    let start_node = g.add_node(GraphNode::Start);
    let end_node = g.add_node(GraphNode::End);
    for i in nearest_indices(graph, start, floor.as_str(), config.k_nearest) {
        let weight = start.distance(graph.by_index(i).point());
        g.add_edge(start_node, fg.nodes[&i], weight);
    }
    for i in nearest_indices(graph, end, floor.as_str(), config.k_nearest) {
        let weight = graph.by_index(i).point().distance(end);
        g.add_edge(fg.nodes[&i], end_node, weight);
    }

    let n = g.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<NodeIndex>> = vec![None; n];
    let mut done = vec![false; n];
    let mut settled = 0;
    let mut heap = BinaryHeap::new();

    dist[start_node.index()] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: start_node,
    });

    while let Some(State { cost, node }) = heap.pop() {
        if done[node.index()] {
            continue;
        }
        done[node.index()] = true;
        settled += 1;
        if node == end_node {
            break;
        }
        for edge in g.edges(node) {
            let next = edge.target();
            if done[next.index()] {
                continue;
            }
            let candidate = cost + *edge.weight();
            if candidate < dist[next.index()] {
                dist[next.index()] = candidate;
                prev[next.index()] = Some(node);
                heap.push(State {
                    cost: candidate,
                    node: next,
                });
            }
        }
    }

    let unreachable = || RoutingError::PathUnreachable {
        floor: floor.clone(),
    };
    if !done[end_node.index()] {
        tracing::debug!(%floor, settled, "destination unreachable through waypoint graph");
        return Err(unreachable());
    }

    let mut nodes = vec![end_node];
    let mut current = end_node;
    while let Some(p) = prev[current.index()] {
        if nodes.len() > n {
            return Err(unreachable());
        }
        nodes.push(p);
        current = p;
    }
    if current != start_node {
        return Err(unreachable());
    }
    nodes.reverse();

    let mut points = Vec::with_capacity(nodes.len());
    let mut waypoints = Vec::with_capacity(nodes.len().saturating_sub(2));
    for node in nodes {
        let point = match g[node] {
            GraphNode::Start => start,
            GraphNode::End => end,
            GraphNode::Waypoint(i) => {
                let wp = graph.by_index(i);
                waypoints.push(wp.id.clone());
                wp.point()
            }
        };
        points.push(RoutePoint::new(point, floor.clone()));
    }

    tracing::debug!(
        %floor,
        settled,
        hops = waypoints.len(),
        cost = dist[end_node.index()],
        "floor path found"
    );

    Ok(FloorPath {
        floor: floor.clone(),
        points,
        waypoints,
        settled,
    })
}
