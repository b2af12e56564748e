//! SVG overlay serializer.
//!
//! Converts a route path into an SVG string sized to the rendered map,
//! using the [`svg`] crate for document construction, XML escaping, and
//! path data formatting. The document can be laid over the floor-plan
//! image at the same pixel size.
//!
//! Each run of consecutive same-floor points becomes a separate
//! `<path>` element using `M` (move to) and `L` (line to) commands, so
//! the vertical move of a stair transition is never drawn. Percent
//! coordinates are scaled to pixels by the viewport size.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Group, Path, Title};
use svg::node::{Text, Value};

use waymark_routing::{FloorId, RoutePoint, Viewport, Waypoint};

/// Route stroke colour.
const ROUTE_STROKE: &str = "#1e88e5";
/// Route stroke width in pixels.
const ROUTE_STROKE_WIDTH: f64 = 4.0;
/// Debug waypoint marker radius in pixels.
const MARKER_RADIUS: f64 = 4.0;

/// Metadata to embed in the SVG document.
///
/// Both fields are optional. When present, a `<title>` and/or `<desc>`
/// element is emitted immediately after the opening `<svg>` tag.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the destination name.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,
}

/// Split a path into runs of consecutive points on the same floor.
#[must_use]
pub fn floor_runs(path: &[RoutePoint]) -> Vec<&[RoutePoint]> {
    path.chunk_by(|a, b| a.floor == b.floor).collect()
}

/// Build an SVG path `d` attribute string from same-floor points.
///
/// Percent coordinates are scaled to pixels by `viewport`. Uses `M` for
/// the first point and `L` for subsequent points. Returns an empty
/// string for runs with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use waymark_routing::{FloorId, Point, RoutePoint, Viewport};
/// use waymark_export::build_path_data;
///
/// let floor = FloorId::from("terreo");
/// let run = vec![
///     RoutePoint::new(Point::new(10.0, 20.0), floor.clone()),
///     RoutePoint::new(Point::new(30.0, 40.0), floor),
/// ];
/// let d = build_path_data(&run, Viewport::new(200.0, 100.0));
/// assert_eq!(d, "M20,20 L60,40");
/// ```
#[must_use]
pub fn build_path_data(run: &[RoutePoint], viewport: Viewport) -> String {
    if run.len() < 2 {
        return String::new();
    }

    let px = |p: &RoutePoint| to_pixels(p.point.x, p.point.y, viewport);
    let mut data = Data::new().move_to(px(&run[0]));
    for p in &run[1..] {
        data = data.line_to(px(p));
    }
    String::from(Value::from(data))
}

fn to_pixels(x: f64, y: f64, viewport: Viewport) -> (f64, f64) {
    (x / 100.0 * viewport.width, y / 100.0 * viewport.height)
}

/// Serialize a route into an SVG overlay document.
///
/// The document is `viewport.width` x `viewport.height` pixels. Each
/// floor run of `path` becomes one `<path>` element tagged with a
/// `data-floor` attribute; `debug_waypoints` become `<circle>` markers
/// grouped under `<g id="debug-waypoints">`. When `floor` is given, only
/// runs and markers on that floor are emitted.
///
/// An unmeasured viewport produces an empty document.
#[must_use]
pub fn to_svg(
    path: &[RoutePoint],
    debug_waypoints: &[Waypoint],
    viewport: Viewport,
    metadata: &SvgMetadata<'_>,
    floor: Option<&FloorId>,
) -> String {
    let w = viewport.width;
    let h = viewport.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    // Optional <title> element
    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    // Optional <desc> element
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if !viewport.is_measured() {
        return format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n");
    }

    let on_floor = |f: &FloorId| floor.is_none_or(|wanted| wanted == f);

    for run in floor_runs(path) {
        if !on_floor(&run[0].floor) {
            continue;
        }
        let d = build_path_data(run, viewport);
        if d.is_empty() {
            continue;
        }

        let element = Path::new()
            .set("d", d)
            .set("data-floor", run[0].floor.as_str())
            .set("fill", "none")
            .set("stroke", ROUTE_STROKE)
            .set("stroke-width", ROUTE_STROKE_WIDTH)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round");
        doc = doc.add(element);
    }

    let markers: Vec<&Waypoint> = debug_waypoints
        .iter()
        .filter(|wp| on_floor(&wp.floor))
        .collect();
    if !markers.is_empty() {
        let mut group = Group::new().set("id", "debug-waypoints");
        for wp in markers {
            let (cx, cy) = to_pixels(wp.x, wp.y, viewport);
            group = group.add(
                Circle::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", MARKER_RADIUS)
                    .set("data-id", wp.id.as_str())
                    .set("fill", "red"),
            );
        }
        doc = doc.add(group);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
