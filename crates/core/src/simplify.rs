//! Vertex-importance weights for tolerance-driven simplification.
//!
//! Instead of simplifying once at a fixed tolerance, preprocessing assigns
//! every interior vertex a weight: the squared distance to the long segment it
//! would collapse into, found by recursive interval refinement (the
//! Douglas-Peucker recursion, but recording distances instead of deleting
//! points). The tile builder later keeps exactly the vertices whose weight
//! exceeds the squared tolerance for the requested zoom, so one preprocessing
//! pass serves every zoom level.

use crate::feature::VtPoint;

/// Assign simplification weights to the interior vertices of
/// `points[first..=last]`.
///
/// Vertices that would already be dropped at the base tolerance keep `w = 0`;
/// the caller pins the two endpoints with infinite weight.
pub fn simplify(points: &mut [VtPoint], first: usize, last: usize, sq_tolerance: f64) {
    let mut max_sq_dist = sq_tolerance;
    let mid = first + ((last - first) >> 1);
    let mut min_pos_to_mid = last - first;
    let mut index = None;

    let (ax, ay) = (points[first].x, points[first].y);
    let (bx, by) = (points[last].x, points[last].y);

    for i in first + 1..last {
        let d = sq_seg_dist(points[i].x, points[i].y, ax, ay, bx, by);

        if d > max_sq_dist {
            index = Some(i);
            max_sq_dist = d;
        } else if d == max_sq_dist {
            // tie-break towards the middle to limit recursion depth on
            // degenerate inputs such as long runs of identical points
            let pos_to_mid = i.abs_diff(mid);
            if pos_to_mid < min_pos_to_mid {
                index = Some(i);
                min_pos_to_mid = pos_to_mid;
            }
        }
    }

    if max_sq_dist > sq_tolerance {
        if let Some(index) = index {
            if index - first > 1 {
                simplify(points, first, index, sq_tolerance);
            }
            points[index].w = max_sq_dist;
            if last - index > 1 {
                simplify(points, index, last, sq_tolerance);
            }
        }
    }
}

/// Squared distance from (px, py) to the segment (ax, ay)-(bx, by).
fn sq_seg_dist(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let mut x = ax;
    let mut y = ay;
    let mut dx = bx - x;
    let mut dy = by - y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((px - x) * dx + (py - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = bx;
            y = by;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    dx = px - x;
    dy = py - y;
    dx * dx + dy * dy
}
