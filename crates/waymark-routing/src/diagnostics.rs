//! Route diagnostics: timing and counts for each planning stage.
//!
//! Timestamps come from a caller-supplied [`Clock`] so the core crate
//! stays free of platform time sources. Durations are serialized as
//! fractional seconds (`f64`) for JSON compatibility, since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::route::{RouteOutcome, RouteRequest, RouteStatus, assemble, solve_path};
use crate::snapshot::Snapshot;
use crate::types::RoutingConfig;

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Capture the current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single route computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDiagnostics {
    /// Path search, including stair selection and fallback (seconds).
    #[serde(with = "duration_serde")]
    pub solve_duration: Duration,
    /// Segment building and outcome classification (seconds).
    #[serde(with = "duration_serde")]
    pub segment_duration: Duration,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts.
    pub summary: RouteSummary,
}

/// Counts describing a computed route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Waypoints on the start and end floors.
    pub floor_waypoints: usize,
    /// Nodes settled across all searches.
    pub settled_nodes: usize,
    /// Points in the path.
    pub path_points: usize,
    /// Drawable segments.
    pub segment_count: usize,
    /// Drawn path length in percent units.
    pub path_length: f64,
    /// Whether the route changes floor through a stair pair.
    pub stair_transition: bool,
    /// Outcome classification (`ready`, `degraded` or `failed`).
    pub status: String,
}

impl RouteDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Route Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Status: {}", self.summary.status));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!("{:<24} {:>10} {:>10}", "Stage", "Duration", "% Total"));
        lines.push("-".repeat(60));

        let total_ms = duration_ms(self.total_duration);
        for (name, duration) in [
            ("Path Solve", self.solve_duration),
            ("Segment Build", self.segment_duration),
        ] {
            let ms = duration_ms(duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Floor waypoints: {}  |  Settled nodes: {}",
            self.summary.floor_waypoints, self.summary.settled_nodes,
        ));
        lines.push(format!(
            "Path points: {}  |  Segments: {}  |  Length: {:.2}%",
            self.summary.path_points, self.summary.segment_count, self.summary.path_length,
        ));
        lines.push(format!(
            "Stair transition: {}",
            if self.summary.stair_transition {
                "yes"
            } else {
                "no"
            }
        ));

        lines.join("\n")
    }
}

/// Plan a route and collect diagnostics for it.
#[must_use]
pub fn route_with_diagnostics<C: Clock>(
    snapshot: &Snapshot,
    request: &RouteRequest,
    config: &RoutingConfig,
    clock: &C,
) -> (RouteOutcome, RouteDiagnostics) {
    let graph = snapshot.graph();
    let total_start = clock.now();

    let start = clock.now();
    let solved = solve_path(graph, request, config);
    let solve_duration = clock.elapsed(&start);

    let start = clock.now();
    let outcome = assemble(graph, solved, request.viewport, config);
    let segment_duration = clock.elapsed(&start);

    let total_duration = clock.elapsed(&total_start);

    let mut floor_waypoints = graph.count_on(request.start.floor.as_str());
    if request.end.floor != request.start.floor {
        floor_waypoints += graph.count_on(request.end.floor.as_str());
    }
    let path_length = outcome
        .path
        .windows(2)
        .filter(|w| w[0].floor == w[1].floor)
        .map(|w| w[0].point.distance(w[1].point))
        .sum();

    let summary = RouteSummary {
        floor_waypoints,
        settled_nodes: outcome.settled,
        path_points: outcome.path.len(),
        segment_count: outcome.segments.len(),
        path_length,
        stair_transition: outcome.transition.is_some(),
        status: status_label(&outcome.status).to_string(),
    };

    let diagnostics = RouteDiagnostics {
        solve_duration,
        segment_duration,
        total_duration,
        summary,
    };
    (outcome, diagnostics)
}

const fn status_label(status: &RouteStatus) -> &'static str {
    match status {
        RouteStatus::Ready => "ready",
        RouteStatus::Degraded => "degraded",
        RouteStatus::Failed { .. } => "failed",
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
