//! Freehand stroke shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use crate::simplify;
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A freehand stroke (ordered polyline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: ShapeId,
    /// Points in the stroke path.
    pub points: Vec<Point>,
    /// Style properties.
    pub style: ShapeStyle,
    /// Eraser strokes paint with the background instead of the color.
    #[serde(default)]
    pub is_eraser: bool,
}

impl Stroke {
    /// Create a new empty stroke.
    pub fn new(style: ShapeStyle) -> Self {
        Self::from_points(Vec::new(), style)
    }

    /// Create from existing points.
    pub fn from_points(points: Vec<Point>, style: ShapeStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            style,
            is_eraser: false,
        }
    }

    /// Reconstruct a stroke with a specific ID (for remote sync).
    pub(crate) fn reconstruct(
        id: ShapeId,
        points: Vec<Point>,
        style: ShapeStyle,
        is_eraser: bool,
    ) -> Self {
        Self {
            id,
            points,
            style,
            is_eraser,
        }
    }

    /// Mark this stroke as an eraser stroke.
    pub fn eraser(mut self) -> Self {
        self.is_eraser = true;
        self
    }

    /// Add a point to the path.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Simplify the path in place with Ramer-Douglas-Peucker.
    pub fn simplify(&mut self, epsilon: f64) {
        self.points = simplify::simplify(&self.points, epsilon);
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self::new(ShapeStyle::default())
    }
}

impl ShapeTrait for Stroke {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::ZERO;
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;

        for point in &self.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }

        Rect::new(min_x, min_y, max_x, max_y)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            *point = affine * *point;
        }
    }

    fn points(&self) -> Vec<Point> {
        self.points.clone()
    }
}
