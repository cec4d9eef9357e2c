//! Shape definitions for the whiteboard.

mod ellipse;
mod rectangle;
mod stroke;

pub use ellipse::Ellipse;
pub use rectangle::Rectangle;
pub use stroke::Stroke;

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when parsing a color.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("Color must start with '#': {0}")]
    MissingHash(String),
    #[error("Expected 3, 6 or 8 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("Invalid hex digit in color: {0}")]
    InvalidDigit(String),
}

/// RGBA color with float components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    /// Create a color, clamping every component into `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Create a color from 8-bit channels.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorError::MissingHash(hex.to_string()))?;
        if !digits.is_ascii() {
            return Err(ColorError::InvalidDigit(hex.to_string()));
        }

        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| ColorError::InvalidDigit(hex.to_string()))
        };

        match digits.len() {
            3 => {
                // Short form: each digit is doubled ("f" -> "ff").
                let mut rgb = [0u8; 3];
                for (i, slot) in rgb.iter_mut().enumerate() {
                    *slot = channel(&digits[i..=i])? * 17;
                }
                Ok(Self::from_rgba8(rgb[0], rgb[1], rgb[2], 255))
            }
            6 | 8 => {
                let r = channel(&digits[0..2])?;
                let g = channel(&digits[2..4])?;
                let b = channel(&digits[4..6])?;
                let a = if digits.len() == 8 {
                    channel(&digits[6..8])?
                } else {
                    255
                };
                Ok(Self::from_rgba8(r, g, b, a))
            }
            n => Err(ColorError::InvalidLength(n)),
        }
    }

    /// Components in `[r, g, b, a]` order.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<peniko::Color> for Color {
    fn from(color: peniko::Color) -> Self {
        let [r, g, b, a] = color.components;
        Self::new(r, g, b, a)
    }
}

impl From<Color> for peniko::Color {
    fn from(color: Color) -> Self {
        peniko::Color::new(color.to_array())
    }
}

/// Style properties shared by every shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color.
    pub color: Color,
    /// Line thickness in canvas units.
    pub thickness: f32,
}

impl ShapeStyle {
    pub fn new(color: Color, thickness: f32) -> Self {
        Self { color, thickness }
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            thickness: 2.0,
        }
    }
}

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Discriminant of a [`Shape`], used for filtering without borrowing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Stroke,
    Rectangle,
    Ellipse,
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in world coordinates.
    fn bounds(&self) -> Rect;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Apply a transform to every point owned by this shape.
    fn transform(&mut self, affine: Affine);

    /// The points this shape owns, in storage order.
    fn points(&self) -> Vec<Point>;
}

/// Enum wrapper for all shape types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Stroke(Stroke),
    Rectangle(Rectangle),
    Ellipse(Ellipse),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Stroke(s) => s.id(),
            Shape::Rectangle(s) => s.id(),
            Shape::Ellipse(s) => s.id(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Stroke(_) => ShapeKind::Stroke,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Ellipse(_) => ShapeKind::Ellipse,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Stroke(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Ellipse(s) => s.bounds(),
        }
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Stroke(s) => s.style(),
            Shape::Rectangle(s) => s.style(),
            Shape::Ellipse(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Stroke(s) => s.style_mut(),
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Ellipse(s) => s.style_mut(),
        }
    }

    pub fn transform(&mut self, affine: Affine) {
        match self {
            Shape::Stroke(s) => s.transform(affine),
            Shape::Rectangle(s) => s.transform(affine),
            Shape::Ellipse(s) => s.transform(affine),
        }
    }

    pub fn points(&self) -> Vec<Point> {
        match self {
            Shape::Stroke(s) => s.points(),
            Shape::Rectangle(s) => s.points(),
            Shape::Ellipse(s) => s.points(),
        }
    }

    /// Translate every point owned by the shape.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.transform(Affine::translate((dx, dy)));
    }

    /// Check if this shape is a stroke.
    pub fn is_stroke(&self) -> bool {
        matches!(self, Shape::Stroke(_))
    }

    /// Get the stroke if this shape is a stroke.
    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Shape::Stroke(s) => Some(s),
            _ => None,
        }
    }

    /// Get the mutable stroke if this shape is a stroke.
    pub fn as_stroke_mut(&mut self) -> Option<&mut Stroke> {
        match self {
            Shape::Stroke(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Stroke> for Shape {
    fn from(stroke: Stroke) -> Self {
        Shape::Stroke(stroke)
    }
}

impl From<Rectangle> for Shape {
    fn from(rect: Rectangle) -> Self {
        Shape::Rectangle(rect)
    }
}

impl From<Ellipse> for Shape {
    fn from(ellipse: Ellipse) -> Self {
        Shape::Ellipse(ellipse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        let red = Color::from_hex("#FF0000").unwrap();
        assert_eq!(red, Color::new(1.0, 0.0, 0.0, 1.0));

        let short = Color::from_hex("#fff").unwrap();
        assert_eq!(short, Color::WHITE);

        let translucent = Color::from_hex("#00000080").unwrap();
        assert!((translucent.a - 128.0 / 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_color_from_hex_errors() {
        assert!(matches!(
            Color::from_hex("FF0000"),
            Err(ColorError::MissingHash(_))
        ));
        assert_eq!(Color::from_hex("#12345"), Err(ColorError::InvalidLength(5)));
        assert!(matches!(
            Color::from_hex("#GG0000"),
            Err(ColorError::InvalidDigit(_))
        ));
    }

    #[test]
    fn test_color_clamps() {
        let c = Color::new(2.0, -1.0, 0.5, 1.5);
        assert_eq!(c, Color::new(1.0, 0.0, 0.5, 1.0));
    }

    #[test]
    fn test_peniko_conversion() {
        let color = Color::new(0.25, 0.5, 0.75, 1.0);
        let peniko_color: peniko::Color = color.into();
        let back: Color = peniko_color.into();
        assert_eq!(color, back);
    }

    #[test]
    fn test_shape_translate_moves_all_points() {
        let mut rect: Shape = Rectangle::from_corners(Point::new(0.0, 0.0), Point::new(10.0, 5.0)).into();
        rect.translate(3.0, -2.0);
        assert_eq!(rect.points(), vec![Point::new(3.0, -2.0), Point::new(13.0, 3.0)]);

        let mut ellipse: Shape = Ellipse::circle(Point::new(1.0, 1.0), 4.0).into();
        ellipse.translate(1.0, 1.0);
        assert_eq!(ellipse.points(), vec![Point::new(2.0, 2.0)]);
    }

    #[test]
    fn test_kind_and_downcast() {
        let stroke: Shape = Stroke::default().into();
        assert_eq!(stroke.kind(), ShapeKind::Stroke);
        assert!(stroke.as_stroke().is_some());

        let ellipse: Shape = Ellipse::circle(Point::ZERO, 1.0).into();
        assert!(!ellipse.is_stroke());
        assert!(ellipse.as_stroke().is_none());
    }
}
