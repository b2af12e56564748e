//! Validated waypoint adjacency, partitioned per floor.
//!
//! Each floor gets its own directed [`petgraph`] graph whose edges follow
//! the waypoints' neighbor lists, weighted by Euclidean distance in
//! percent space, plus an R\*-tree over the floor's waypoint positions
//! for nearest-node queries.
//!
//! Neighbor lists are read as directed out-edges. A neighbor id that is
//! unknown, refers to the node itself, or lives on another floor is
//! ignored: stairs are the only links between floors and are handled by
//! the cross-floor composer, never by ordinary adjacency.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::snapshot::Waypoint;
use crate::types::{FloorId, WaypointId};

/// A waypoint position in the per-floor R\*-tree, tagged with the
/// waypoint's index in discovery order.
pub(crate) type IndexedPosition = GeomWithData<[f64; 2], usize>;

/// Node payload of a per-floor graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GraphNode {
    /// A real waypoint, by discovery index.
    Waypoint(usize),
    /// Synthetic node at the route start.
    Start,
    /// Synthetic node at the route end.
    End,
}

/// Routing structures for a single floor.
#[derive(Debug, Clone)]
pub(crate) struct FloorGraph {
    /// Discovery indices of the floor's waypoints, ascending.
    pub members: Vec<usize>,
    /// Directed adjacency between the floor's waypoints.
    ///
    /// Nodes are inserted in ascending id order, so a lower
    /// [`NodeIndex`] always means a lower waypoint id.
    pub graph: DiGraph<GraphNode, f64>,
    /// Discovery index to graph node.
    pub nodes: HashMap<usize, NodeIndex>,
    /// Spatial index over the floor's waypoint positions.
    pub tree: RTree<IndexedPosition>,
}

/// The validated waypoint graph of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct WaypointGraph {
    waypoints: Vec<Waypoint>,
    index: HashMap<WaypointId, usize>,
    floors: HashMap<FloorId, FloorGraph>,
}

impl WaypointGraph {
    /// Build the graph from waypoints in discovery order.
    ///
    /// Waypoints with non-finite coordinates, and those with a duplicate
    /// id after the first, are skipped.
    #[must_use]
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        let mut index = HashMap::with_capacity(waypoints.len());
        let waypoints: Vec<Waypoint> = waypoints
            .into_iter()
            .filter(|wp| {
                if !wp.point().is_finite() {
                    tracing::debug!(id = %wp.id, "non-finite waypoint skipped");
                    return false;
                }
                if index.contains_key(&wp.id) {
                    tracing::debug!(id = %wp.id, "duplicate waypoint id skipped");
                    return false;
                }
                index.insert(wp.id.clone(), index.len());
                true
            })
            .collect();

        let mut by_floor: HashMap<FloorId, Vec<usize>> = HashMap::new();
        for (i, wp) in waypoints.iter().enumerate() {
            by_floor.entry(wp.floor.clone()).or_default().push(i);
        }

        let floors = by_floor
            .into_iter()
            .map(|(floor, members)| {
                let floor_graph = build_floor_graph(&waypoints, &index, &floor, members);
                (floor, floor_graph)
            })
            .collect();

        Self {
            waypoints,
            index,
            floors,
        }
    }

    /// Number of waypoints across all floors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns `true` if the graph has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Look up a waypoint by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Waypoint> {
        self.index.get(id).map(|&i| &self.waypoints[i])
    }

    /// All waypoints in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Waypoints on `floor`, in discovery order.
    pub fn nodes_on<'a>(&'a self, floor: &str) -> impl Iterator<Item = &'a Waypoint> + 'a {
        self.floors
            .get(floor)
            .map(|fg| fg.members.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.waypoints[i])
    }

    /// Number of waypoints on `floor`.
    #[must_use]
    pub fn count_on(&self, floor: &str) -> usize {
        self.floors.get(floor).map_or(0, |fg| fg.members.len())
    }

    /// Out-neighbors of waypoint `id` restricted to `floor`.
    ///
    /// Follows the waypoint's neighbor list order with unknown ids,
    /// self-references, repeats and other-floor neighbors removed.
    /// Empty when `id` is unknown or not on `floor`.
    #[must_use]
    pub fn out_neighbors(&self, id: &str, floor: &str) -> Vec<&Waypoint> {
        let Some(wp) = self.get(id) else {
            return Vec::new();
        };
        if wp.floor.as_str() != floor {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        wp.neighbors
            .iter()
            .filter_map(|n| self.get(n.as_str()))
            .filter(|n| n.id != wp.id && n.floor == wp.floor)
            .filter(|n| seen.insert(&n.id))
            .collect()
    }

    /// Stair nodes on `floor`, in discovery order.
    pub fn stairs_on<'a>(&'a self, floor: &str) -> impl Iterator<Item = &'a Waypoint> + 'a {
        self.nodes_on(floor).filter(|wp| wp.is_stair())
    }

    /// Waypoint at a discovery index.
    pub(crate) fn by_index(&self, i: usize) -> &Waypoint {
        &self.waypoints[i]
    }

    /// Routing structures for `floor`, if it has any waypoints.
    pub(crate) fn floor_graph(&self, floor: &str) -> Option<&FloorGraph> {
        self.floors.get(floor)
    }
}

fn build_floor_graph(
    waypoints: &[Waypoint],
    index: &HashMap<WaypointId, usize>,
    floor: &FloorId,
    members: Vec<usize>,
) -> FloorGraph {
    let mut by_id = members.clone();
    by_id.sort_by(|&a, &b| waypoints[a].id.cmp(&waypoints[b].id));

    let mut graph = DiGraph::with_capacity(members.len() + 2, members.len() * 2);
    let mut nodes = HashMap::with_capacity(members.len());
    for &i in &by_id {
        nodes.insert(i, graph.add_node(GraphNode::Waypoint(i)));
    }

    for &i in &members {
        let wp = &waypoints[i];
        let mut linked = HashSet::new();
        for neighbor in &wp.neighbors {
            let Some(&j) = index.get(neighbor) else {
                tracing::debug!(from = %wp.id, to = %neighbor, "dangling neighbor ignored");
                continue;
            };
            if j == i {
                tracing::debug!(id = %wp.id, "self-referencing neighbor ignored");
                continue;
            }
            if &waypoints[j].floor != floor {
                tracing::debug!(
                    from = %wp.id,
                    to = %neighbor,
                    "neighbor on another floor ignored"
                );
                continue;
            }
            if !linked.insert(j) {
                continue;
            }
            let weight = wp.point().distance(waypoints[j].point());
            graph.add_edge(nodes[&i], nodes[&j], weight);
        }
    }

    let tree = RTree::bulk_load(
        members
            .iter()
            .map(|&i| GeomWithData::new(waypoints[i].point().into(), i))
            .collect(),
    );

    FloorGraph {
        members,
        graph,
        nodes,
        tree,
    }
}
