//! Inkboard Core Library
//!
//! Shapes, the undoable drawing-command engine, polyline simplification and
//! the JSON wire protocol shared with the relay server.

pub mod engine;
pub mod history;
pub mod protocol;
pub mod shapes;
pub mod simplify;

pub use engine::{DrawingEngine, VERTEX_STRIDE};
pub use history::{CommandKind, DrawingCommand, History, MAX_UNDO_HISTORY};
pub use protocol::{Envelope, ProtocolError, RemoteEvent, StrokeRecord, message_type};
pub use shapes::{Color, ColorError, Ellipse, Rectangle, Shape, ShapeId, ShapeKind, ShapeStyle, ShapeTrait, Stroke};
pub use simplify::{point_to_segment_dist, simplify};
