//! Ramer-Douglas-Peucker polyline simplification.
//!
//! The divide-and-conquer is driven by an explicit work stack of index ranges
//! instead of recursion, so arbitrarily long strokes cannot exhaust the stack.
//! Retained points are marked in a keep-mask and collected in order at the end,
//! which yields the same result as the recursive split-and-concatenate form.

use kurbo::Point;

/// Distance from a point to a line segment (a→b).
///
/// The projection parameter is clamped to the segment, and a degenerate
/// segment (`a == b`) falls back to the distance between `point` and `a`.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Simplify a polyline, dropping points closer than `epsilon` to the chord of
/// their enclosing range.
///
/// Sequences of two points or fewer are returned unchanged. Ties for the
/// farthest point resolve to the earliest index.
pub fn simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut pending = vec![(0usize, last)];
    while let Some((start, end)) = pending.pop() {
        if end - start < 2 {
            continue;
        }

        let (first, last) = (points[start], points[end]);
        let mut max_dist = f64::NEG_INFINITY;
        let mut max_index = start + 1;
        for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
            let dist = point_to_segment_dist(*point, first, last);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            pending.push((max_index, end));
            pending.push((start, max_index));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}
