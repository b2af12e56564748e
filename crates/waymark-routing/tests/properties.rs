//! Integration test: routing properties that must hold for any snapshot.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use waymark_routing::{
    APPROXIMATE_ROUTE_MESSAGE, Floor, FloorId, Local, Point, RouteOrchestrator, RoutePoint,
    RouteRequest, RouteSegment, RouteStatus, RoutingConfig, RoutingError, RoutingState, Snapshot,
    UserPosition, Viewport, Waypoint, build_segments, plan_route, shortest_path,
};

fn floor(id: &str) -> Floor {
    Floor {
        id: FloorId::from(id),
        name: id.to_string(),
        image: None,
        description: None,
    }
}

fn rp(x: f64, y: f64, floor: &str) -> RoutePoint {
    RoutePoint::new(Point::new(x, y), FloorId::from(floor))
}

fn single_link() -> RoutingConfig {
    RoutingConfig {
        k_nearest: 1,
        ..RoutingConfig::default()
    }
}

/// Endpoint of a segment in percent units.
fn segment_end(segment: &RouteSegment, viewport: Viewport) -> (f64, f64) {
    let radians = segment.angle.to_radians();
    (
        segment.x + segment.length * radians.cos() / viewport.width * 100.0,
        segment.y + segment.length * radians.sin() / viewport.height * 100.0,
    )
}

/// A small grid of corridors with a few dead ends.
fn grid() -> Snapshot {
    Snapshot::from_parts(
        vec![floor("f")],
        vec![
            Waypoint::new("a", "f", 10.0, 10.0, &["b", "d"]),
            Waypoint::new("b", "f", 50.0, 10.0, &["a", "c", "e"]),
            Waypoint::new("c", "f", 90.0, 10.0, &["b", "f"]),
            Waypoint::new("d", "f", 10.0, 50.0, &["a", "e", "g"]),
            Waypoint::new("e", "f", 50.0, 50.0, &["b", "d", "f", "h"]),
            Waypoint::new("f", "f", 90.0, 50.0, &["c", "e", "i"]),
            Waypoint::new("g", "f", 10.0, 90.0, &["d", "h"]),
            Waypoint::new("h", "f", 50.0, 90.0, &["e", "g", "i"]),
            Waypoint::new("i", "f", 90.0, 90.0, &["f", "h"]),
        ],
        Vec::new(),
    )
}

#[test]
fn consecutive_waypoints_are_neighbors_and_segments_chain() {
    let snapshot = grid();
    let viewport = Viewport::new(640.0, 480.0);
    let request = RouteRequest::new(rp(12.0, 8.0, "f"), rp(88.0, 93.0, "f"), Some(viewport));
    let outcome = plan_route(&snapshot, &request, &single_link());
    assert_eq!(outcome.status, RouteStatus::Ready);

    for pair in outcome.debug_waypoints.windows(2) {
        assert!(
            pair[0].neighbors.contains(&pair[1].id),
            "{} does not list {} as a neighbor",
            pair[0].id,
            pair[1].id
        );
    }

    for pair in outcome.segments.windows(2) {
        let (x, y) = segment_end(&pair[0], viewport);
        assert!((x - pair[1].x).abs() < 1e-9, "x gap: {x} vs {}", pair[1].x);
        assert!((y - pair[1].y).abs() < 1e-9, "y gap: {y} vs {}", pair[1].y);
    }

    let last = outcome.segments.last().unwrap();
    let (x, y) = segment_end(last, viewport);
    assert!((x - 88.0).abs() < 1e-9);
    assert!((y - 93.0).abs() < 1e-9);
}

#[test]
fn start_equal_to_end_has_no_segments() {
    let snapshot = grid();
    let here = rp(33.0, 33.0, "f");
    let path = shortest_path(
        snapshot.graph(),
        here.point,
        here.point,
        &here.floor,
        &RoutingConfig::default(),
    )
    .unwrap();
    assert_eq!(path.points, vec![here.clone()]);

    let outcome = plan_route(
        &snapshot,
        &RouteRequest::new(here.clone(), here, Some(Viewport::new(100.0, 100.0))),
        &RoutingConfig::default(),
    );
    assert!(outcome.segments.is_empty());
    assert_eq!(outcome.error(), Some(&RoutingError::DegenerateGeometry));
}

/// Two triangles of corridors with no link between them.
fn disconnected_clusters(locals: Vec<Local>) -> Snapshot {
    Snapshot::from_parts(
        vec![floor("f")],
        vec![
            Waypoint::new("a1", "f", 8.0, 10.0, &["a2", "a3"]),
            Waypoint::new("a2", "f", 12.0, 10.0, &["a1", "a3"]),
            Waypoint::new("a3", "f", 10.0, 14.0, &["a1", "a2"]),
            Waypoint::new("b1", "f", 88.0, 90.0, &["b2", "b3"]),
            Waypoint::new("b2", "f", 92.0, 90.0, &["b1", "b3"]),
            Waypoint::new("b3", "f", 90.0, 86.0, &["b1", "b2"]),
        ],
        locals,
    )
}

#[test]
fn disconnected_clusters_degrade_to_one_straight_segment() {
    let snapshot = disconnected_clusters(Vec::new());
    let viewport = Viewport::new(200.0, 100.0);
    let outcome = plan_route(
        &snapshot,
        &RouteRequest::new(rp(10.0, 10.0, "f"), rp(90.0, 90.0, "f"), Some(viewport)),
        &RoutingConfig::default(),
    );

    assert_eq!(outcome.status, RouteStatus::Degraded);
    assert_eq!(outcome.segments.len(), 1);
    let expected = 160.0_f64.hypot(80.0);
    assert!((outcome.segments[0].length - expected).abs() < 1e-9);
    assert!(outcome.message().unwrap().starts_with("approximate route"));
}

#[test]
fn orchestrator_reports_degraded_route_for_disconnected_clusters() {
    let snapshot = std::sync::Arc::new(disconnected_clusters(vec![Local::new(
        "far", "f", 90.0, 90.0, "Far",
    )]));
    let mut orchestrator = RouteOrchestrator::new(RoutingConfig::default());
    orchestrator.publish_snapshot(Some(snapshot.clone()));
    orchestrator.set_viewport(Some(Viewport::new(200.0, 100.0)));
    orchestrator.set_user_position(Some(UserPosition {
        floor: FloorId::from("f"),
        x: 10.0,
        y: 10.0,
        accuracy: None,
    }));
    orchestrator.set_destination(snapshot.local("far").cloned());

    assert_eq!(orchestrator.state(), RoutingState::RouteDegraded);
    assert_eq!(orchestrator.error(), Some(APPROXIMATE_ROUTE_MESSAGE));
    let segments = orchestrator.segments();
    assert_eq!(segments.len(), 1);
    assert!((segments[0].length - 160.0_f64.hypot(80.0)).abs() < 1e-9);
    assert!(orchestrator.debug_waypoints().is_empty());
}

#[test]
fn unconnected_floors_fail_without_segments() {
    let snapshot = std::sync::Arc::new(Snapshot::from_parts(
        vec![floor("ground"), floor("upper")],
        vec![
            Waypoint::new("g", "ground", 50.0, 50.0, &[]),
            Waypoint::new("u", "upper", 50.0, 50.0, &[]),
        ],
        vec![Local::new("roof", "upper", 60.0, 60.0, "Roof")],
    ));
    let mut orchestrator = RouteOrchestrator::new(RoutingConfig::default());
    orchestrator.publish_snapshot(Some(snapshot.clone()));
    orchestrator.set_viewport(Some(Viewport::new(800.0, 600.0)));
    orchestrator.set_user_position(Some(UserPosition {
        floor: FloorId::from("ground"),
        x: 40.0,
        y: 40.0,
        accuracy: None,
    }));
    orchestrator.set_destination(snapshot.local("roof").cloned());

    assert_eq!(orchestrator.state(), RoutingState::RouteFailed);
    assert!(orchestrator.segments().is_empty());
    assert_eq!(
        orchestrator.outcome().unwrap().error(),
        Some(&RoutingError::NoFloorConnection {
            from: FloorId::from("ground"),
            to: FloorId::from("upper"),
        })
    );
    assert_eq!(
        orchestrator.error(),
        Some("no stair or elevator connects floor ground to floor upper")
    );
}

#[test]
fn segments_scale_percent_to_viewport() {
    let points = vec![rp(0.0, 0.0, "f"), rp(50.0, 0.0, "f"), rp(50.0, 100.0, "f")];
    let segments = build_segments(
        &points,
        Viewport::new(200.0, 100.0),
        RoutingConfig::DEFAULT_MIN_SEGMENT_LENGTH,
    );
    let summary: Vec<(f64, f64, f64, f64)> = segments
        .iter()
        .map(|s| (s.x, s.y, s.length, s.angle))
        .collect();
    assert_eq!(summary.len(), 2);
    for (got, want) in summary
        .iter()
        .zip([(0.0, 0.0, 100.0, 0.0), (50.0, 0.0, 100.0, 90.0)])
    {
        assert!((got.0 - want.0).abs() < 1e-9);
        assert!((got.1 - want.1).abs() < 1e-9);
        assert!((got.2 - want.2).abs() < 1e-9);
        assert!((got.3 - want.3).abs() < 1e-9);
    }
}

#[test]
fn asymmetric_adjacency_is_one_way() {
    let snapshot = Snapshot::from_parts(
        vec![floor("f")],
        vec![
            Waypoint::new("a", "f", 10.0, 50.0, &["b"]),
            Waypoint::new("b", "f", 90.0, 50.0, &[]),
        ],
        Vec::new(),
    );
    let viewport = Some(Viewport::new(100.0, 100.0));

    let forward = plan_route(
        &snapshot,
        &RouteRequest::new(rp(10.0, 50.0, "f"), rp(90.0, 50.0, "f"), viewport),
        &single_link(),
    );
    assert_eq!(forward.status, RouteStatus::Ready);

    let backward = plan_route(
        &snapshot,
        &RouteRequest::new(rp(90.0, 50.0, "f"), rp(10.0, 50.0, "f"), viewport),
        &single_link(),
    );
    assert_eq!(backward.status, RouteStatus::Degraded);

    let strict = RoutingConfig {
        straight_line_fallback: false,
        ..single_link()
    };
    let backward = plan_route(
        &snapshot,
        &RouteRequest::new(rp(90.0, 50.0, "f"), rp(10.0, 50.0, "f"), viewport),
        &strict,
    );
    assert_eq!(
        backward.error(),
        Some(&RoutingError::PathUnreachable {
            floor: FloorId::from("f")
        })
    );
}

#[test]
fn identical_inputs_give_identical_segments() {
    let request = RouteRequest::new(
        rp(30.0, 70.0, "f"),
        rp(70.0, 30.0, "f"),
        Some(Viewport::new(1024.0, 768.0)),
    );
    let config = RoutingConfig::default();
    let first = plan_route(&grid(), &request, &config);
    let second = plan_route(&grid(), &request, &config);
    assert_eq!(first.status, RouteStatus::Ready);
    assert_eq!(first.segments, second.segments);
    assert_eq!(first.debug_waypoints, second.debug_waypoints);
}
