//! Conversion of a percent-space path into drawable pixel segments.

use crate::types::{RoutePoint, RouteSegment, Viewport};

/// Turn consecutive same-floor point pairs into segments.
///
/// Deltas are scaled from percent to pixels by the viewport size: `dx =
/// (p2.x - p1.x) / 100 * width` and likewise for `y` with `height`. The
/// angle is `atan2(dy, dx)` in degrees, so 0 points right and 90 points
/// down the screen.
///
/// Pairs on different floors produce nothing. Segments whose length is
/// not finite or not strictly above `min_length` pixels are dropped; an
/// unmeasured viewport therefore yields no segments.
#[must_use]
pub fn build_segments(
    points: &[RoutePoint],
    viewport: Viewport,
    min_length: f64,
) -> Vec<RouteSegment> {
    points
        .windows(2)
        .filter(|w| w[0].floor == w[1].floor)
        .filter_map(|w| {
            let (a, b) = (&w[0], &w[1]);
            let dx = (b.point.x - a.point.x) / 100.0 * viewport.width;
            let dy = (b.point.y - a.point.y) / 100.0 * viewport.height;
            let length = dx.hypot(dy);
            if !length.is_finite() || length <= min_length {
                return None;
            }
            Some(RouteSegment {
                x: a.point.x,
                y: a.point.y,
                length,
                angle: dy.atan2(dx).to_degrees(),
                floor: a.floor.clone(),
            })
        })
        .collect()
}
