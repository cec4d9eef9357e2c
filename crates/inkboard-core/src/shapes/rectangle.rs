//! Rectangle shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An axis-aligned rectangle described by two corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub top_left: Point,
    /// Bottom-right corner position.
    pub bottom_right: Point,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Rectangle {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self::from_corners(position, Point::new(position.x + width, position.y + height))
    }

    /// Create a rectangle from two opposite corner points, in any order.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            top_left: Point::new(p1.x.min(p2.x), p1.y.min(p2.y)),
            bottom_right: Point::new(p1.x.max(p2.x), p1.y.max(p2.y)),
            style: ShapeStyle::default(),
        }
    }

    /// Replace the style.
    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn width(&self) -> f64 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> f64 {
        self.bottom_right.y - self.top_left.y
    }

    pub fn center(&self) -> Point {
        self.top_left.midpoint(self.bottom_right)
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::from_points(self.top_left, self.bottom_right)
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.top_left = affine * self.top_left;
        self.bottom_right = affine * self.bottom_right;
    }

    fn points(&self) -> Vec<Point> {
        vec![self.top_left, self.bottom_right]
    }
}
