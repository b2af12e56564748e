//! Route orchestration: recompute the route whenever an input changes.
//!
//! The orchestrator owns the latest value of every input (user position,
//! destination, current floor, viewport, snapshot) and the latest output.
//! Each setter recomputes synchronously when the value actually changed.
//!
//! A computation is split into [`RouteOrchestrator::begin`], which
//! captures the inputs into a [`Computation`] ticket and bumps the
//! generation counter, and [`RouteOrchestrator::finish`], which applies
//! the result only if the ticket is still the latest. Callers that run
//! [`Computation::run`] elsewhere get last-write-wins semantics for free:
//! results of superseded tickets are discarded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::route::{RouteOutcome, RouteRequest, RouteStatus, plan_route};
use crate::snapshot::{Local, Snapshot, Waypoint};
use crate::types::{FloorId, RouteSegment, RoutingConfig, UserPosition, Viewport};

/// Observable state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoutingState {
    /// Position or destination is missing; no route is shown.
    #[default]
    Idle,
    /// A computation has begun and not finished yet.
    Computing,
    /// A graph route is shown.
    RouteReady,
    /// A straight-line approximation is shown.
    RouteDegraded,
    /// No route can be shown; see [`RouteOrchestrator::error`].
    RouteFailed,
}

/// Inputs captured by [`RouteOrchestrator::begin`].
#[derive(Debug, Clone)]
pub struct Computation {
    generation: u64,
    job: Option<(Arc<Snapshot>, RouteRequest)>,
    config: RoutingConfig,
}

impl Computation {
    /// Generation this ticket was issued for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The captured request, or `None` when the inputs are incomplete.
    #[must_use]
    pub fn request(&self) -> Option<&RouteRequest> {
        self.job.as_ref().map(|(_, request)| request)
    }

    /// Plan the route. Returns `None` when the inputs are incomplete.
    #[must_use]
    pub fn run(&self) -> Option<RouteOutcome> {
        self.job
            .as_ref()
            .map(|(snapshot, request)| plan_route(snapshot, request, &self.config))
    }
}

/// Coordinator that keeps the route in sync with its inputs.
#[derive(Debug, Default)]
pub struct RouteOrchestrator {
    config: RoutingConfig,
    snapshot: Option<Arc<Snapshot>>,
    position: Option<UserPosition>,
    destination: Option<Local>,
    current_floor: Option<FloorId>,
    viewport: Option<Viewport>,

    generation: u64,
    state: RoutingState,
    outcome: Option<RouteOutcome>,
    message: Option<String>,
}

impl RouteOrchestrator {
    /// Create an idle orchestrator with no inputs.
    #[must_use]
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Set the user position. Recomputes if it changed.
    pub fn set_user_position(&mut self, position: Option<UserPosition>) {
        if self.position != position {
            self.position = position;
            self.recompute();
        }
    }

    /// Set the selected destination. Recomputes if it changed.
    pub fn set_destination(&mut self, destination: Option<Local>) {
        if self.destination != destination {
            self.destination = destination;
            self.recompute();
        }
    }

    /// Set the floor the map currently displays. Recomputes if it changed.
    pub fn set_current_floor(&mut self, floor: Option<FloorId>) {
        if self.current_floor != floor {
            self.current_floor = floor;
            self.recompute();
        }
    }

    /// Set the rendered map size. Recomputes if it changed.
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        if self.viewport != viewport {
            self.viewport = viewport;
            self.recompute();
        }
    }

    /// Replace the routing configuration. Recomputes if it changed.
    pub fn set_config(&mut self, config: RoutingConfig) {
        if self.config != config {
            self.config = config;
            self.recompute();
        }
    }

    /// Publish a new snapshot. `None` means the data provider has
    /// nothing, which routes against an empty snapshot.
    ///
    /// Recomputes unless the new snapshot has the same content as the
    /// current one.
    pub fn publish_snapshot(&mut self, snapshot: Option<Arc<Snapshot>>) {
        let unchanged = match (&self.snapshot, &snapshot) {
            (None, None) => true,
            (Some(old), Some(new)) => old.fingerprint() == new.fingerprint(),
            _ => false,
        };
        self.snapshot = snapshot;
        if unchanged {
            tracing::debug!("snapshot content unchanged; route kept");
        } else {
            self.recompute();
        }
    }

    // -----------------------------------------------------------------------
    // Computation
    // -----------------------------------------------------------------------

    /// Recompute the route from the current inputs.
    pub fn recompute(&mut self) {
        let ticket = self.begin();
        let outcome = ticket.run();
        self.finish(&ticket, outcome);
    }

    /// Capture the current inputs and supersede any pending computation.
    ///
    /// The previous route is cleared, so nothing is drawn while
    /// [`Computing`](RoutingState::Computing).
    pub fn begin(&mut self) -> Computation {
        self.generation += 1;
        self.state = RoutingState::Computing;
        self.outcome = None;
        self.message = None;
        Computation {
            generation: self.generation,
            job: self.request().map(|request| {
                let snapshot = self
                    .snapshot
                    .clone()
                    .unwrap_or_else(|| Arc::new(Snapshot::empty()));
                (snapshot, request)
            }),
            config: self.config.clone(),
        }
    }

    /// Apply the result of `ticket`.
    ///
    /// Returns `false`, leaving the state untouched, if a newer
    /// computation has begun since `ticket` was issued.
    pub fn finish(&mut self, ticket: &Computation, outcome: Option<RouteOutcome>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                latest = self.generation,
                "discarding superseded route"
            );
            return false;
        }

        let Some(outcome) = outcome else {
            self.state = RoutingState::Idle;
            self.outcome = None;
            self.message = None;
            tracing::debug!("route cleared; inputs incomplete");
            return true;
        };

        self.state = match outcome.status {
            RouteStatus::Ready => RoutingState::RouteReady,
            RouteStatus::Degraded => RoutingState::RouteDegraded,
            RouteStatus::Failed { .. } => RoutingState::RouteFailed,
        };
        self.message = outcome.message();
        tracing::debug!(
            state = ?self.state,
            segments = outcome.segments.len(),
            generation = self.generation,
            "route updated"
        );
        self.outcome = Some(outcome);
        true
    }

    /// The request the current inputs describe, if complete.
    fn request(&self) -> Option<RouteRequest> {
        let position = self.position.as_ref()?;
        let destination = self.destination.as_ref()?;
        let start = position.route_point();
        if !start.point.is_finite() {
            tracing::warn!(?position, "user position is not finite; route cleared");
            return None;
        }
        Some(RouteRequest::new(
            start,
            destination.route_point(),
            self.viewport,
        ))
    }

    // -----------------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------------

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RoutingState {
        self.state
    }

    /// Generation of the latest computation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The latest applied outcome; `None` while idle.
    #[must_use]
    pub const fn outcome(&self) -> Option<&RouteOutcome> {
        self.outcome.as_ref()
    }

    /// All segments of the current route.
    #[must_use]
    pub fn segments(&self) -> &[RouteSegment] {
        self.outcome
            .as_ref()
            .map(|o| o.segments.as_slice())
            .unwrap_or_default()
    }

    /// Segments on the current floor, or all of them when no floor is set.
    pub fn visible_segments(&self) -> impl Iterator<Item = &RouteSegment> {
        let floor = self.current_floor.as_ref();
        self.segments()
            .iter()
            .filter(move |s| floor.is_none_or(|f| &s.floor == f))
    }

    /// Waypoints the current route visits.
    #[must_use]
    pub fn debug_waypoints(&self) -> &[Waypoint] {
        self.outcome
            .as_ref()
            .map(|o| o.debug_waypoints.as_slice())
            .unwrap_or_default()
    }

    /// Failure message, or the approximate-route warning when degraded.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The current floor, if set.
    #[must_use]
    pub const fn current_floor(&self) -> Option<&FloorId> {
        self.current_floor.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::snapshot::Floor;
    use crate::types::RoutingError;

    fn floor(id: &str) -> Floor {
        Floor {
            id: FloorId::from(id),
            name: id.to_string(),
            image: None,
            description: None,
        }
    }

    fn snapshot() -> Arc<Snapshot> {
        Arc::new(Snapshot::from_parts(
            vec![floor("ground"), floor("upper")],
            vec![
                Waypoint::new("a", "ground", 10.0, 50.0, &["b"]),
                Waypoint::new("b", "ground", 90.0, 50.0, &["a", "s"]),
                Waypoint::new("s", "ground", 90.0, 10.0, &["b"]).into_stair("upper", "t"),
                Waypoint::new("t", "upper", 90.0, 10.0, &["u"]).into_stair("ground", "s"),
                Waypoint::new("u", "upper", 50.0, 10.0, &["t"]),
            ],
            vec![
                Local::new("lab", "ground", 90.0, 55.0, "Lab"),
                Local::new("library", "upper", 50.0, 15.0, "Library"),
            ],
        ))
    }

    fn position(x: f64, y: f64, floor: &str) -> UserPosition {
        UserPosition {
            floor: FloorId::from(floor),
            x,
            y,
            accuracy: None,
        }
    }

    fn ready() -> RouteOrchestrator {
        let snapshot = snapshot();
        let mut orchestrator = RouteOrchestrator::new(RoutingConfig::default());
        orchestrator.publish_snapshot(Some(Arc::clone(&snapshot)));
        orchestrator.set_viewport(Some(Viewport::new(800.0, 600.0)));
        orchestrator.set_user_position(Some(position(10.0, 55.0, "ground")));
        orchestrator.set_destination(snapshot.local("lab").cloned());
        orchestrator
    }

    #[test]
    fn idle_until_position_and_destination() {
        let mut orchestrator = RouteOrchestrator::new(RoutingConfig::default());
        orchestrator.publish_snapshot(Some(snapshot()));
        assert_eq!(orchestrator.state(), RoutingState::Idle);
        orchestrator.set_user_position(Some(position(10.0, 55.0, "ground")));
        assert_eq!(orchestrator.state(), RoutingState::Idle);
        assert!(orchestrator.segments().is_empty());
        assert_eq!(orchestrator.error(), None);
    }

    #[test]
    fn route_ready_once_inputs_complete() {
        let orchestrator = ready();
        assert_eq!(orchestrator.state(), RoutingState::RouteReady);
        assert!(!orchestrator.segments().is_empty());
        assert!(!orchestrator.debug_waypoints().is_empty());
        assert_eq!(orchestrator.error(), None);
    }

    #[test]
    fn clearing_destination_clears_route() {
        let mut orchestrator = ready();
        orchestrator.set_destination(None);
        assert_eq!(orchestrator.state(), RoutingState::Idle);
        assert!(orchestrator.segments().is_empty());
        assert!(orchestrator.debug_waypoints().is_empty());
        assert!(orchestrator.outcome().is_none());
    }

    #[test]
    fn unchanged_inputs_do_not_recompute() {
        let mut orchestrator = ready();
        let generation = orchestrator.generation();
        orchestrator.set_user_position(Some(position(10.0, 55.0, "ground")));
        orchestrator.set_viewport(Some(Viewport::new(800.0, 600.0)));
        orchestrator.publish_snapshot(Some(snapshot()));
        assert_eq!(orchestrator.generation(), generation);

        orchestrator.set_user_position(Some(position(12.0, 55.0, "ground")));
        assert_eq!(orchestrator.generation(), generation + 1);
    }

    #[test]
    fn missing_snapshot_fails_with_no_waypoints() {
        let mut orchestrator = ready();
        orchestrator.publish_snapshot(None);
        assert_eq!(orchestrator.state(), RoutingState::RouteFailed);
        assert_eq!(
            orchestrator.outcome().unwrap().error(),
            Some(&RoutingError::NoWaypointsOnFloor {
                floor: FloorId::from("ground")
            })
        );
        assert!(orchestrator.segments().is_empty());
        assert!(orchestrator.error().is_some());
    }

    #[test]
    fn unmeasured_viewport_fails_without_stale_route() {
        let mut orchestrator = ready();
        orchestrator.set_viewport(None);
        assert_eq!(orchestrator.state(), RoutingState::RouteFailed);
        assert!(orchestrator.segments().is_empty());
    }

    #[test]
    fn non_finite_position_is_idle() {
        let mut orchestrator = ready();
        orchestrator.set_user_position(Some(position(f64::NAN, 55.0, "ground")));
        assert_eq!(orchestrator.state(), RoutingState::Idle);
        assert!(orchestrator.segments().is_empty());
    }

    #[test]
    fn visible_segments_follow_current_floor() {
        let snapshot = snapshot();
        let mut orchestrator = ready();
        orchestrator.set_destination(snapshot.local("library").cloned());
        assert_eq!(orchestrator.state(), RoutingState::RouteReady);

        let total = orchestrator.segments().len();
        assert_eq!(orchestrator.current_floor(), None);
        assert_eq!(orchestrator.visible_segments().count(), total);
        orchestrator.set_current_floor(Some(FloorId::from("ground")));
        assert_eq!(orchestrator.current_floor().map(FloorId::as_str), Some("ground"));
        let ground = orchestrator.visible_segments().count();
        orchestrator.set_current_floor(Some(FloorId::from("upper")));
        let upper = orchestrator.visible_segments().count();
        assert!(ground > 0);
        assert!(upper > 0);
        assert_eq!(ground + upper, total);
        assert!(
            orchestrator
                .visible_segments()
                .all(|s| s.floor.as_str() == "upper")
        );
    }

    #[test]
    fn no_route_is_shown_while_computing() {
        let mut orchestrator = ready();
        assert!(!orchestrator.segments().is_empty());
        let ticket = orchestrator.begin();
        assert_eq!(orchestrator.state(), RoutingState::Computing);
        assert!(orchestrator.segments().is_empty());
        assert!(orchestrator.debug_waypoints().is_empty());
        assert!(orchestrator.outcome().is_none());
        assert_eq!(orchestrator.error(), None);

        let outcome = ticket.run();
        assert!(orchestrator.finish(&ticket, outcome));
        assert_eq!(orchestrator.state(), RoutingState::RouteReady);
        assert!(!orchestrator.segments().is_empty());
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut orchestrator = ready();
        let first = orchestrator.begin();
        assert_eq!(first.generation(), orchestrator.generation());
        assert_eq!(
            first.request().map(|r| r.end.point),
            Some(crate::types::Point::new(90.0, 55.0))
        );
        let first_outcome = first.run();
        orchestrator.set_user_position(None);
        let second = orchestrator.begin();
        assert!(second.request().is_none());
        assert_eq!(orchestrator.state(), RoutingState::Computing);

        assert!(!orchestrator.finish(&first, first_outcome));
        assert_eq!(orchestrator.state(), RoutingState::Computing);

        let second_outcome = second.run();
        assert!(orchestrator.finish(&second, second_outcome));
        assert_eq!(orchestrator.state(), RoutingState::Idle);
    }
}
