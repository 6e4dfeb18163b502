//! Pure routing math: interpolation, clipping, obstacle detours, sweeps.
//!
//! Everything here is deterministic and registry-free; the
//! [`MotionPlanner`](crate::motion::MotionPlanner) resolves zones and feeds
//! bare rectangles in.

use crate::core::geometry::{Point, Rect};

/// Hard cap on waypoints per trajectory.
pub const MAX_WAYPOINTS: usize = 200;
/// Interpolated legs always include both endpoints.
pub const MIN_WAYPOINTS: usize = 2;
/// Recursion cap for obstacle detours.
pub const MAX_ROUTE_DEPTH: u32 = 10;

/// Waypoint pacing assumes a fixed 60 Hz tick, independent of the actual
/// frame rate of whatever drives the cursor.
const TICK_RATE_HZ: f64 = 60.0;

/// Number of waypoints for a leg of `distance` pixels at `speed` px/s,
/// clamped to `[MIN_WAYPOINTS, MAX_WAYPOINTS]`.
pub fn step_count(distance: f64, speed: f64) -> usize {
    if speed <= 0.0 {
        return MIN_WAYPOINTS;
    }
    let steps = (distance / speed * TICK_RATE_HZ).round();
    steps.clamp(MIN_WAYPOINTS as f64, MAX_WAYPOINTS as f64) as usize
}

/// Linear interpolation with exactly `steps` integer-rounded points,
/// both endpoints included. `steps` is clamped to `[2, MAX_WAYPOINTS]`.
pub fn interpolate_line(start: Point, end: Point, steps: usize) -> Vec<Point> {
    let steps = steps.clamp(MIN_WAYPOINTS, MAX_WAYPOINTS);
    let last = (steps - 1) as f64;
    let mut points = Vec::with_capacity(steps);
    for i in 0..steps {
        let t = i as f64 / last;
        let x = f64::from(start.x) + (f64::from(end.x) - f64::from(start.x)) * t;
        let y = f64::from(start.y) + (f64::from(end.y) - f64::from(start.y)) * t;
        points.push(Point::new(x.round() as i32, y.round() as i32));
    }
    points
}

/// Liang-Barsky segment/rectangle clip test, boundary inclusive.
pub fn segment_intersects(a: Point, b: Point, rect: &Rect) -> bool {
    let x0 = f64::from(a.x);
    let y0 = f64::from(a.y);
    let dx = f64::from(b.x) - x0;
    let dy = f64::from(b.y) - y0;

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let checks = [
        (-dx, x0 - f64::from(rect.x)),
        (dx, f64::from(rect.right()) - x0),
        (-dy, y0 - f64::from(rect.y)),
        (dy, f64::from(rect.bottom()) - y0),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            // Parallel to this boundary pair; outside means no intersection.
            if q < 0.0 {
                return false;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return false;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    t0 <= t1
}

/// Waypoint chain produced by [`route_around`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detour {
    pub points: Vec<Point>,
    /// False when the router gave up at [`MAX_ROUTE_DEPTH`] and the chain may
    /// still cross an avoid rectangle.
    pub cleared: bool,
}

/// Route from `start` to `end` around `rects`.
///
/// A clear straight segment routes as `[start, end]`. Otherwise the first
/// intersecting rectangle (in list order) gets one detour waypoint and both
/// halves recurse, merging on the shared junction. The detour axis is
/// perpendicular to the dominant travel axis: horizontal travel goes above or
/// below the rectangle, vertical travel goes left or right of it, past
/// whichever edge is nearer to the segment midpoint. Offsetting along the
/// travel axis itself could land the waypoint still inside the rectangle's
/// span and burn depth without progress.
pub fn route_around(start: Point, end: Point, rects: &[Rect]) -> Detour {
    route_with_depth(start, end, rects, MAX_ROUTE_DEPTH)
}

fn route_with_depth(start: Point, end: Point, rects: &[Rect], depth: u32) -> Detour {
    let hit = rects
        .iter()
        .find(|rect| segment_intersects(start, end, rect));
    let Some(rect) = hit else {
        return Detour {
            points: vec![start, end],
            cleared: true,
        };
    };
    if depth == 0 {
        return Detour {
            points: vec![start, end],
            cleared: false,
        };
    }

    let detour = detour_point(start, end, rect);
    let first = route_with_depth(start, detour, rects, depth - 1);
    let second = route_with_depth(detour, end, rects, depth - 1);

    let mut points = first.points;
    points.extend(second.points.into_iter().skip(1));
    Detour {
        points,
        cleared: first.cleared && second.cleared,
    }
}

fn detour_point(start: Point, end: Point, rect: &Rect) -> Point {
    let margin = detour_margin(rect);
    let mid_x = (start.x + end.x) / 2;
    let mid_y = (start.y + end.y) / 2;

    if (end.x - start.x).abs() >= (end.y - start.y).abs() {
        let above = (mid_y - rect.y).abs();
        let below = (mid_y - rect.bottom()).abs();
        let y = if above <= below {
            rect.y - margin
        } else {
            rect.bottom() + margin
        };
        Point::new(mid_x, y)
    } else {
        let left = (mid_x - rect.x).abs();
        let right = (mid_x - rect.right()).abs();
        let x = if left <= right {
            rect.x - margin
        } else {
            rect.right() + margin
        };
        Point::new(x, mid_y)
    }
}

fn detour_margin(rect: &Rect) -> i32 {
    let half = (rect.width.max(rect.height) / 2 + 1) as i32;
    half.min(10)
}

/// Uniformly reduce `points` to at most `max`, preserving both endpoints.
pub fn downsample(points: Vec<Point>, max: usize) -> Vec<Point> {
    let max = max.max(MIN_WAYPOINTS);
    if points.len() <= max {
        return points;
    }
    let last = (points.len() - 1) as f64;
    let span = (max - 1) as f64;
    let mut out = Vec::with_capacity(max);
    for i in 0..max {
        let idx = (i as f64 / span * last).round() as usize;
        out.push(points[idx]);
    }
    out
}

/// Lawnmower row anchors for a region sweep: one horizontal row every
/// `spacing` pixels from the top edge through the bottom edge, alternating
/// direction per row. A degenerate region yields no rows.
pub fn sweep_rows(region: &Rect, spacing: u32) -> Vec<Point> {
    if region.width == 0 || region.height == 0 {
        return Vec::new();
    }
    let spacing = spacing.max(1) as i32;
    let mut points = Vec::new();
    let mut y = region.y;
    let mut left_to_right = true;
    while y <= region.bottom() {
        let (from, to) = if left_to_right {
            (region.x, region.right())
        } else {
            (region.right(), region.x)
        };
        points.push(Point::new(from, y));
        points.push(Point::new(to, y));
        left_to_right = !left_to_right;
        y += spacing;
    }
    points
}

/// Total length of the polyline through `points`.
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(pair[1]))
        .sum()
}
