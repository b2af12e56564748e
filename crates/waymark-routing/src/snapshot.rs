//! Map data snapshot: floors, points of interest and the waypoint graph.
//!
//! A [`Snapshot`] is the immutable batch delivered by the data provider.
//! Loading is tolerant: every entry is decoded on its own, and an entry
//! that cannot be used (undecodable, missing floor, unknown floor,
//! duplicate id) is dropped and recorded as a [`DataIssue`] instead of
//! failing the whole load.
//!
//! Input documents may use the field names of the legacy campus data
//! set (`andar`, `nome`, `connections`, `conectaAndar`, ...) as well as
//! the English names used by the serialized types in this crate.

use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use siphasher::sip::SipHasher13;

use crate::graph::WaypointGraph;
use crate::types::{FloorId, LocalId, Point, RoutePoint, WaypointId};

/// A floor of the mapped building or campus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    /// Floor identifier.
    pub id: FloorId,
    /// Display name.
    pub name: String,
    /// Map image URL or path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What kind of graph node a waypoint is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointKind {
    /// An ordinary routing hop.
    #[default]
    Ordinary,
    /// A floor transition (stair or elevator).
    ///
    /// A stair only links floors when both ends of the pair reference
    /// each other; incomplete links never route.
    Stair {
        /// Floor the stair leads to.
        linked_floor: Option<FloorId>,
        /// The corresponding stair node on the linked floor.
        linked_waypoint: Option<WaypointId>,
    },
}

/// A navigable graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Unique identifier.
    pub id: WaypointId,
    /// Floor this node belongs to.
    pub floor: FloorId,
    /// Horizontal position in percent.
    pub x: f64,
    /// Vertical position in percent.
    pub y: f64,
    /// Ordinary node or stair.
    #[serde(default)]
    pub kind: WaypointKind,
    /// Out-neighbors. Traversal is directed: only listed neighbors are
    /// reachable from this node.
    #[serde(default)]
    pub neighbors: Vec<WaypointId>,
}

impl Waypoint {
    /// Create an ordinary waypoint.
    #[must_use]
    pub fn new(
        id: impl Into<WaypointId>,
        floor: impl Into<FloorId>,
        x: f64,
        y: f64,
        neighbors: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            floor: floor.into(),
            x,
            y,
            kind: WaypointKind::Ordinary,
            neighbors: neighbors.iter().map(|&n| WaypointId::from(n)).collect(),
        }
    }

    /// Turn this waypoint into a stair linked to `linked_waypoint` on
    /// `linked_floor`.
    #[must_use]
    pub fn into_stair(
        mut self,
        linked_floor: impl Into<FloorId>,
        linked_waypoint: impl Into<WaypointId>,
    ) -> Self {
        self.kind = WaypointKind::Stair {
            linked_floor: Some(linked_floor.into()),
            linked_waypoint: Some(linked_waypoint.into()),
        };
        self
    }

    /// Position on the floor plan.
    #[must_use]
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Position pinned to this waypoint's floor.
    #[must_use]
    pub fn route_point(&self) -> RoutePoint {
        RoutePoint::new(self.point(), self.floor.clone())
    }

    /// Returns `true` for stair nodes.
    #[must_use]
    pub const fn is_stair(&self) -> bool {
        matches!(self.kind, WaypointKind::Stair { .. })
    }

    /// The stair link, if this is a stair with both ends filled in.
    #[must_use]
    pub const fn stair_link(&self) -> Option<(&FloorId, &WaypointId)> {
        match &self.kind {
            WaypointKind::Stair {
                linked_floor: Some(floor),
                linked_waypoint: Some(waypoint),
            } => Some((floor, waypoint)),
            _ => None,
        }
    }
}

/// A named point of interest. Never a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Local {
    /// Unique identifier.
    pub id: LocalId,
    /// Floor the local is on.
    pub floor: FloorId,
    /// Horizontal position in percent.
    pub x: f64,
    /// Vertical position in percent.
    pub y: f64,
    /// Display name.
    pub name: String,
    /// Category (e.g. "Acadêmico").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Local {
    /// Create a local with no category or description.
    #[must_use]
    pub fn new(
        id: impl Into<LocalId>,
        floor: impl Into<FloorId>,
        x: f64,
        y: f64,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            floor: floor.into(),
            x,
            y,
            name: name.into(),
            category: None,
            description: None,
        }
    }

    /// Position pinned to this local's floor.
    #[must_use]
    pub fn route_point(&self) -> RoutePoint {
        RoutePoint::new(Point::new(self.x, self.y), self.floor.clone())
    }
}

/// Which collection of the snapshot document an issue was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// The `floors` array.
    Floors,
    /// The `waypoints` array.
    Waypoints,
    /// The `locals` array.
    Locals,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Floors => "floors",
            Self::Waypoints => "waypoints",
            Self::Locals => "locals",
        })
    }
}

/// A data-quality problem found while loading a snapshot.
///
/// The offending entry is excluded; the rest of the snapshot loads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum DataIssue {
    /// The entry could not be decoded (e.g. non-numeric coordinates).
    #[error("{collection}[{index}] is malformed: {reason}")]
    Malformed {
        /// Collection the entry belongs to.
        collection: Collection,
        /// Position of the entry in its array.
        index: usize,
        /// Decoder message.
        reason: String,
    },

    /// The entry has no floor.
    #[error("{collection} entry {id} has no floor")]
    MissingFloor {
        /// Collection the entry belongs to.
        collection: Collection,
        /// Entry identifier.
        id: String,
    },

    /// The entry references a floor that was not loaded.
    #[error("{collection} entry {id} references unknown floor {floor}")]
    UnknownFloor {
        /// Collection the entry belongs to.
        collection: Collection,
        /// Entry identifier.
        id: String,
        /// The unknown floor.
        floor: FloorId,
    },

    /// The entry's coordinates are NaN or infinite.
    #[error("{collection} entry {id} has non-finite coordinates")]
    NonFiniteCoordinates {
        /// Collection the entry belongs to.
        collection: Collection,
        /// Entry identifier.
        id: String,
    },

    /// The identifier was already used by an earlier entry.
    #[error("{collection} entry {id} duplicates an earlier id")]
    DuplicateId {
        /// Collection the entry belongs to.
        collection: Collection,
        /// Entry identifier.
        id: String,
    },
}

/// Errors that prevent a snapshot document from loading at all.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The document is not valid JSON.
    #[error("snapshot document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root is not an object with entry arrays.
    #[error("snapshot document has an unexpected shape: {0}")]
    Shape(String),
}

/// Immutable batch of map data used for routing.
///
/// Computations borrow a snapshot (usually through an `Arc`) for their
/// whole duration; a reload builds a new snapshot instead of mutating
/// this one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    floors: Vec<Floor>,
    locals: Vec<Local>,
    graph: WaypointGraph,
    issues: Vec<DataIssue>,
    fingerprint: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// A snapshot with no data, standing in for an absent or failed load.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new())
    }

    /// Build a snapshot from already-typed entries.
    ///
    /// Waypoints and locals on unknown floors or with non-finite
    /// coordinates, entries with duplicate ids and duplicate floors are
    /// dropped and recorded in
    /// [`issues`](Self::issues). Stairs missing their linked floor
    /// inherit it from their linked waypoint.
    #[must_use]
    pub fn from_parts(floors: Vec<Floor>, waypoints: Vec<Waypoint>, locals: Vec<Local>) -> Self {
        let mut issues = Vec::new();
        Self::validate(floors, waypoints, locals, &mut issues)
    }

    /// Parse a snapshot document.
    ///
    /// The document is an object with optional `floors`, `waypoints`
    /// and `locals` (alias `locais`) arrays. A `null` document is the
    /// empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Json`] if the text is not JSON and
    /// [`SnapshotError::Shape`] if the root is not an object or a
    /// collection is not an array. Problems with individual entries are
    /// never errors; see [`issues`](Self::issues).
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let root: Value = serde_json::from_str(json)?;
        if root.is_null() {
            return Ok(Self::empty());
        }
        let Value::Object(mut root) = root else {
            return Err(SnapshotError::Shape(
                "expected an object with floors, waypoints and locals".to_string(),
            ));
        };

        let floor_entries = take_array(&mut root, &["floors", "andares"])?;
        let waypoint_entries = take_array(&mut root, &["waypoints"])?;
        let local_entries = take_array(&mut root, &["locals", "locais"])?;

        let mut issues = Vec::new();
        let floors = decode_entries::<RawFloor>(floor_entries, Collection::Floors, &mut issues)
            .into_iter()
            .map(RawFloor::into_floor)
            .collect();
        let waypoints = decode_entries::<RawWaypoint>(
            waypoint_entries,
            Collection::Waypoints,
            &mut issues,
        )
        .into_iter()
        .filter_map(|raw| raw.into_waypoint(&mut issues))
        .collect();
        let locals = decode_entries::<RawLocal>(local_entries, Collection::Locals, &mut issues)
            .into_iter()
            .filter_map(|raw| raw.into_local(&mut issues))
            .collect();

        Ok(Self::validate(floors, waypoints, locals, &mut issues))
    }

    fn validate(
        floors: Vec<Floor>,
        waypoints: Vec<Waypoint>,
        locals: Vec<Local>,
        issues: &mut Vec<DataIssue>,
    ) -> Self {
        let mut floor_ids = HashSet::new();
        let floors: Vec<Floor> = floors
            .into_iter()
            .filter(|floor| {
                let fresh = floor_ids.insert(floor.id.clone());
                if !fresh {
                    issues.push(DataIssue::DuplicateId {
                        collection: Collection::Floors,
                        id: floor.id.to_string(),
                    });
                }
                fresh
            })
            .collect();

        let mut waypoint_ids = HashSet::new();
        let mut waypoints: Vec<Waypoint> = waypoints
            .into_iter()
            .filter(|wp| {
                if !floor_ids.contains(&wp.floor) {
                    issues.push(DataIssue::UnknownFloor {
                        collection: Collection::Waypoints,
                        id: wp.id.to_string(),
                        floor: wp.floor.clone(),
                    });
                    return false;
                }
                if !wp.point().is_finite() {
                    issues.push(DataIssue::NonFiniteCoordinates {
                        collection: Collection::Waypoints,
                        id: wp.id.to_string(),
                    });
                    return false;
                }
                let fresh = waypoint_ids.insert(wp.id.clone());
                if !fresh {
                    issues.push(DataIssue::DuplicateId {
                        collection: Collection::Waypoints,
                        id: wp.id.to_string(),
                    });
                }
                fresh
            })
            .collect();
        infer_linked_floors(&mut waypoints);

        let mut local_ids = HashSet::new();
        let locals: Vec<Local> = locals
            .into_iter()
            .filter(|local| {
                if !floor_ids.contains(&local.floor) {
                    issues.push(DataIssue::UnknownFloor {
                        collection: Collection::Locals,
                        id: local.id.to_string(),
                        floor: local.floor.clone(),
                    });
                    return false;
                }
                if !local.route_point().point.is_finite() {
                    issues.push(DataIssue::NonFiniteCoordinates {
                        collection: Collection::Locals,
                        id: local.id.to_string(),
                    });
                    return false;
                }
                let fresh = local_ids.insert(local.id.clone());
                if !fresh {
                    issues.push(DataIssue::DuplicateId {
                        collection: Collection::Locals,
                        id: local.id.to_string(),
                    });
                }
                fresh
            })
            .collect();

        for issue in issues.iter() {
            tracing::warn!(%issue, "snapshot entry excluded");
        }

        let fingerprint = fingerprint(&floors, &waypoints, &locals);
        let graph = WaypointGraph::new(waypoints);
        tracing::info!(
            floors = floors.len(),
            waypoints = graph.len(),
            locals = locals.len(),
            issues = issues.len(),
            "snapshot loaded"
        );

        Self {
            floors,
            locals,
            graph,
            issues: std::mem::take(issues),
            fingerprint,
        }
    }

    /// Loaded floors in document order.
    #[must_use]
    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    /// Look up a floor by id.
    #[must_use]
    pub fn floor(&self, id: &str) -> Option<&Floor> {
        self.floors.iter().find(|f| f.id.as_str() == id)
    }

    /// The floor to show when none is selected: the first loaded floor.
    #[must_use]
    pub fn default_floor(&self) -> Option<&Floor> {
        self.floors.first()
    }

    /// Loaded points of interest in document order.
    #[must_use]
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    /// Look up a point of interest by id.
    #[must_use]
    pub fn local(&self, id: &str) -> Option<&Local> {
        self.locals.iter().find(|l| l.id.as_str() == id)
    }

    /// Points of interest on the given floor.
    pub fn locals_on<'a>(&'a self, floor: &'a FloorId) -> impl Iterator<Item = &'a Local> + 'a {
        self.locals.iter().filter(move |l| &l.floor == floor)
    }

    /// The validated waypoint graph.
    #[must_use]
    pub const fn graph(&self) -> &WaypointGraph {
        &self.graph
    }

    /// Entries excluded while loading.
    #[must_use]
    pub fn issues(&self) -> &[DataIssue] {
        &self.issues
    }

    /// Deterministic hash of the validated content.
    ///
    /// Two snapshots built from the same data have the same fingerprint,
    /// which lets consumers skip recomputation on no-op reloads.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// Fill in missing `linked_floor` values from the linked waypoint.
fn infer_linked_floors(waypoints: &mut [Waypoint]) {
    let floors_by_id: HashMap<WaypointId, FloorId> = waypoints
        .iter()
        .map(|wp| (wp.id.clone(), wp.floor.clone()))
        .collect();
    for wp in waypoints.iter_mut() {
        if let WaypointKind::Stair {
            linked_floor,
            linked_waypoint: Some(linked),
        } = &mut wp.kind
            && linked_floor.is_none()
        {
            linked_floor.clone_from(&floors_by_id.get(&*linked).cloned());
        }
    }
}

/// `SipHash-1-3` of the canonical JSON encoding of the content.
fn fingerprint(floors: &[Floor], waypoints: &[Waypoint], locals: &[Local]) -> u64 {
    let bytes = serde_json::to_vec(&(floors, waypoints, locals)).unwrap_or_default();
    let mut hasher = SipHasher13::new();
    hasher.write(&bytes);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Raw document decoding
// ---------------------------------------------------------------------------

/// Remove the first present key from the root object as an entry array.
///
/// A missing key or `null` value is an empty collection.
fn take_array(
    root: &mut serde_json::Map<String, Value>,
    keys: &[&str],
) -> Result<Vec<Value>, SnapshotError> {
    for key in keys {
        match root.remove(*key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(entries)) => return Ok(entries),
            Some(other) => {
                return Err(SnapshotError::Shape(format!(
                    "`{key}` must be an array, found {}",
                    json_type_name(&other)
                )));
            }
        }
    }
    Ok(Vec::new())
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode each entry independently, recording failures as issues.
fn decode_entries<T: serde::de::DeserializeOwned>(
    entries: Vec<Value>,
    collection: Collection,
    issues: &mut Vec<DataIssue>,
) -> Vec<T> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                issues.push(DataIssue::Malformed {
                    collection,
                    index,
                    reason: e.to_string(),
                });
                None
            }
        })
        .collect()
}

/// An identifier that may be written as a string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawFloor {
    id: RawId,
    #[serde(default, alias = "nome")]
    name: Option<String>,
    #[serde(default, alias = "imagem")]
    image: Option<String>,
    #[serde(default, alias = "descricao")]
    description: Option<String>,
}

impl RawFloor {
    fn into_floor(self) -> Floor {
        let id = self.id.into_string();
        Floor {
            name: self.name.unwrap_or_else(|| id.clone()),
            id: FloorId::new(id),
            image: self.image,
            description: self.description,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWaypoint {
    id: RawId,
    #[serde(default, alias = "andar")]
    floor: Option<RawId>,
    x: f64,
    y: f64,
    #[serde(default, alias = "tipo")]
    kind: Option<String>,
    #[serde(default, alias = "connections", alias = "vizinhos")]
    neighbors: Option<Vec<RawId>>,
    #[serde(default, alias = "linked_floor", alias = "andarDestino")]
    linked_floor: Option<RawId>,
    #[serde(
        default,
        alias = "linked_waypoint",
        alias = "linked_waypoint_id",
        alias = "idLigacao",
        alias = "conectaAndar"
    )]
    linked_waypoint_id: Option<RawId>,
}

/// Kind labels that mark a floor transition.
const STAIR_KINDS: &[&str] = &["stair", "stairs", "escada", "elevator", "elevador"];

impl RawWaypoint {
    fn into_waypoint(self, issues: &mut Vec<DataIssue>) -> Option<Waypoint> {
        let id = self.id.into_string();
        let Some(floor) = self.floor else {
            issues.push(DataIssue::MissingFloor {
                collection: Collection::Waypoints,
                id,
            });
            return None;
        };

        let linked_waypoint = self
            .linked_waypoint_id
            .map(|l| WaypointId::new(l.into_string()));
        let is_stair = self.kind.as_deref().map_or(linked_waypoint.is_some(), |k| {
            STAIR_KINDS.iter().any(|s| k.eq_ignore_ascii_case(s))
        });
        let kind = if is_stair {
            WaypointKind::Stair {
                linked_floor: self.linked_floor.map(|f| FloorId::new(f.into_string())),
                linked_waypoint,
            }
        } else {
            WaypointKind::Ordinary
        };

        Some(Waypoint {
            id: WaypointId::new(id),
            floor: FloorId::new(floor.into_string()),
            x: self.x,
            y: self.y,
            kind,
            neighbors: self
                .neighbors
                .unwrap_or_default()
                .into_iter()
                .map(|n| WaypointId::new(n.into_string()))
                .collect(),
        })
    }
}

#[derive(Deserialize)]
struct RawLocal {
    id: RawId,
    #[serde(default, alias = "andar")]
    floor: Option<RawId>,
    x: f64,
    y: f64,
    #[serde(default, alias = "nome")]
    name: Option<String>,
    #[serde(default, alias = "categoria")]
    category: Option<String>,
    #[serde(default, alias = "descricao")]
    description: Option<String>,
}

impl RawLocal {
    fn into_local(self, issues: &mut Vec<DataIssue>) -> Option<Local> {
        let id = self.id.into_string();
        let Some(floor) = self.floor else {
            issues.push(DataIssue::MissingFloor {
                collection: Collection::Locals,
                id,
            });
            return None;
        };
        Some(Local {
            name: self.name.unwrap_or_else(|| id.clone()),
            id: LocalId::new(id),
            floor: FloorId::new(floor.into_string()),
            x: self.x,
            y: self.y,
            category: self.category,
            description: self.description,
        })
    }
}
