//! Drawing command engine.
//!
//! Owns one ordered shape collection per peer. Operations come in three
//! addressing flavours:
//! - positional (`remove_shape`, `move_shape`): index into the whole collection;
//! - stroke rank (`remove_stroke`, `add_point_to_stroke`, ...): the n-th shape
//!   of kind Stroke, skipping other kinds when counting;
//! - stable id (`remove_shape_by_id`, `move_shape_by_id`, ...).
//!
//! Positional and rank indices shift after any removal; ids never do. Invalid
//! indices and unknown ids are silent no-ops and record nothing.

use crate::history::{CommandKind, DrawingCommand, Edit, History};
use crate::protocol::{Envelope, ProtocolError, RemoteEvent};
use crate::shapes::{Color, Ellipse, Rectangle, Shape, ShapeId, ShapeStyle, Stroke};
use kurbo::Point;

/// Number of floats emitted per stroke point by [`DrawingEngine::vertex_buffer_data`].
pub const VERTEX_STRIDE: usize = 7;

/// Local, undoable drawing engine.
#[derive(Debug, Clone, Default)]
pub struct DrawingEngine {
    shapes: Vec<Shape>,
    history: History,
    /// Style applied to shapes created through the convenience primitives.
    style: ShapeStyle,
    eraser: bool,
    /// Stroke being captured from pointer input, not yet committed.
    pending: Option<Stroke>,
}

impl DrawingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine whose undo history keeps at most `limit` entries.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: History::with_limit(limit),
            ..Self::default()
        }
    }

    // --- Queries ---

    /// All shapes in insertion order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Stroke shapes only, in collection order.
    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.shapes.iter().filter_map(Shape::as_stroke)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Current positional index of a shape.
    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.shapes.iter().position(|s| s.id() == id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Position in the collection of the `nth` stroke.
    fn stroke_position(&self, nth: usize) -> Option<usize> {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_stroke())
            .nth(nth)
            .map(|(i, _)| i)
    }

    // --- Positional operations ---

    /// Append a shape. Returns its id.
    pub fn add_shape(&mut self, shape: impl Into<Shape>) -> ShapeId {
        let shape = shape.into();
        let id = shape.id();
        let command = DrawingCommand::new(
            CommandKind::AddShape,
            shape.points(),
            *shape.style(),
            Edit::Insert {
                index: self.shapes.len(),
                shape,
            },
        );
        self.execute(command);
        id
    }

    /// Remove the shape at `index`. Out of range is a no-op.
    pub fn remove_shape(&mut self, index: usize) -> Option<Shape> {
        let shape = self.shapes.get(index)?.clone();
        let command = DrawingCommand::new(
            CommandKind::RemoveShape,
            shape.points(),
            *shape.style(),
            Edit::Remove {
                index,
                shape: shape.clone(),
            },
        );
        self.execute(command);
        Some(shape)
    }

    /// Translate every point of the shape at `index`. Out of range is a no-op.
    pub fn move_shape(&mut self, index: usize, dx: f64, dy: f64) -> bool {
        let Some(before) = self.shapes.get(index).cloned() else {
            return false;
        };
        let mut after = before.clone();
        after.translate(dx, dy);
        let command = DrawingCommand::new(
            CommandKind::MoveShape,
            after.points(),
            *after.style(),
            Edit::Replace { before, after },
        );
        self.execute(command);
        true
    }

    // --- Stroke-rank operations ---

    /// Append a stroke. Returns its id.
    pub fn add_stroke(&mut self, stroke: Stroke) -> ShapeId {
        self.add_shape(stroke)
    }

    /// Remove the `nth` stroke, counting strokes only.
    pub fn remove_stroke(&mut self, nth: usize) -> Option<Stroke> {
        let index = self.stroke_position(nth)?;
        match self.remove_shape(index) {
            Some(Shape::Stroke(stroke)) => Some(stroke),
            _ => None,
        }
    }

    /// Append a point to the `nth` stroke.
    pub fn add_point_to_stroke(&mut self, nth: usize, point: Point) -> bool {
        match self.stroke_position(nth) {
            Some(index) => {
                let id = self.shapes[index].id();
                self.add_point_to_shape(id, point)
            }
            None => false,
        }
    }

    /// Translate the `nth` stroke.
    pub fn move_stroke(&mut self, nth: usize, dx: f64, dy: f64) -> bool {
        match self.stroke_position(nth) {
            Some(index) => self.move_shape(index, dx, dy),
            None => false,
        }
    }

    /// Run Ramer-Douglas-Peucker on the `nth` stroke in place.
    ///
    /// Only recorded when the point count actually changes.
    pub fn simplify_stroke(&mut self, nth: usize, epsilon: f64) -> bool {
        match self.stroke_position(nth) {
            Some(index) => {
                let id = self.shapes[index].id();
                self.simplify_shape(id, epsilon)
            }
            None => false,
        }
    }

    // --- Id-based operations ---

    pub fn remove_shape_by_id(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.index_of(id)?;
        self.remove_shape(index)
    }

    pub fn move_shape_by_id(&mut self, id: ShapeId, dx: f64, dy: f64) -> bool {
        match self.index_of(id) {
            Some(index) => self.move_shape(index, dx, dy),
            None => false,
        }
    }

    /// Append a point to the stroke with this id. Non-strokes are ignored.
    pub fn add_point_to_shape(&mut self, id: ShapeId, point: Point) -> bool {
        let Some(style) = self
            .shape(id)
            .and_then(Shape::as_stroke)
            .map(|stroke| stroke.style)
        else {
            return false;
        };
        let command = DrawingCommand::new(
            CommandKind::AddPoint,
            vec![point],
            style,
            Edit::AppendPoint { id, point },
        );
        self.execute(command);
        true
    }

    pub fn simplify_shape(&mut self, id: ShapeId, epsilon: f64) -> bool {
        let Some(before) = self.shape(id).filter(|s| s.is_stroke()).cloned() else {
            return false;
        };
        let mut after = before.clone();
        let Some(stroke) = after.as_stroke_mut() else {
            return false;
        };
        let original_len = stroke.len();
        stroke.simplify(epsilon);
        if stroke.len() == original_len {
            return false;
        }
        log::debug!(
            "simplified stroke {id} from {original_len} to {} points",
            stroke.len()
        );

        let command = DrawingCommand::new(
            CommandKind::Simplify,
            after.points(),
            *after.style(),
            Edit::Replace { before, after },
        );
        self.execute(command);
        true
    }

    /// Remove every shape. Undoable; clearing an empty engine records nothing.
    pub fn clear(&mut self) -> bool {
        if self.shapes.is_empty() {
            return false;
        }
        let command = DrawingCommand::new(
            CommandKind::Clear,
            Vec::new(),
            self.style,
            Edit::Clear {
                shapes: self.shapes.clone(),
            },
        );
        self.execute(command);
        true
    }

    fn execute(&mut self, command: DrawingCommand) {
        command.edit().apply(&mut self.shapes);
        self.history.record(command);
    }

    // --- Undo / redo ---

    /// Undo the last command. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.history
            .undo_with(|command| command.edit().revert(&mut self.shapes))
    }

    /// Redo the last undone command. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.history
            .redo_with(|command| command.edit().apply(&mut self.shapes))
    }

    // --- Render export ---

    /// Flatten every stroke into `[x, y, r, g, b, a, thickness]` records.
    ///
    /// Rectangles and ellipses contribute nothing.
    pub fn vertex_buffer_data(&self) -> Vec<f32> {
        let total: usize = self.strokes().map(Stroke::len).sum();
        let mut data = Vec::with_capacity(total * VERTEX_STRIDE);

        for stroke in self.strokes() {
            let Color { r, g, b, a } = stroke.style.color;
            for point in &stroke.points {
                data.extend_from_slice(&[
                    point.x as f32,
                    point.y as f32,
                    r,
                    g,
                    b,
                    a,
                    stroke.style.thickness,
                ]);
            }
        }

        data
    }

    // --- Current style and convenience primitives ---

    pub fn style(&self) -> ShapeStyle {
        self.style
    }

    pub fn set_color(&mut self, color: Color) {
        self.style.color = color;
    }

    pub fn set_thickness(&mut self, thickness: f32) {
        self.style.thickness = thickness.max(0.0);
    }

    pub fn set_eraser(&mut self, eraser: bool) {
        self.eraser = eraser;
    }

    pub fn is_eraser(&self) -> bool {
        self.eraser
    }

    fn styled_stroke(&self, points: Vec<Point>) -> Stroke {
        let stroke = Stroke::from_points(points, self.style);
        if self.eraser { stroke.eraser() } else { stroke }
    }

    /// Add a straight two-point stroke with the current style.
    pub fn draw_line(&mut self, from: Point, to: Point) -> ShapeId {
        let stroke = self.styled_stroke(vec![from, to]);
        self.add_shape(stroke)
    }

    pub fn draw_rectangle(&mut self, corner: Point, opposite: Point) -> ShapeId {
        let rect = Rectangle::from_corners(corner, opposite).with_style(self.style);
        self.add_shape(rect)
    }

    pub fn draw_ellipse(&mut self, center: Point, radius_x: f64, radius_y: f64) -> ShapeId {
        let ellipse = Ellipse::new(center, radius_x, radius_y).with_style(self.style);
        self.add_shape(ellipse)
    }

    pub fn draw_circle(&mut self, center: Point, radius: f64) -> ShapeId {
        self.draw_ellipse(center, radius, radius)
    }

    // --- Live stroke capture ---

    /// Start capturing a stroke. Any capture in progress is discarded.
    pub fn begin_stroke(&mut self, point: Point) {
        self.pending = Some(self.styled_stroke(vec![point]));
    }

    /// Extend the stroke being captured. Ignored when no capture is active.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(stroke) = self.pending.as_mut() {
            stroke.add_point(point);
        }
    }

    /// The stroke being captured, for preview rendering.
    pub fn pending_stroke(&self) -> Option<&Stroke> {
        self.pending.as_ref()
    }

    /// Commit the captured stroke as a single undoable command, optionally
    /// simplified first.
    pub fn end_stroke(&mut self, epsilon: Option<f64>) -> Option<ShapeId> {
        let mut stroke = self.pending.take()?;
        if let Some(epsilon) = epsilon {
            stroke.simplify(epsilon);
        }
        Some(self.add_shape(stroke))
    }

    // --- Remote sync ---

    /// Feed an envelope received from the relay.
    ///
    /// `board:sync` replaces the collection and resets history; `stroke:add`
    /// appends; `stroke:erase` removes by stroke rank. Remote changes are not
    /// recorded on the local undo history. Returns whether the envelope was
    /// relevant to the engine.
    pub fn apply_remote(&mut self, envelope: &Envelope) -> Result<bool, ProtocolError> {
        match RemoteEvent::from_envelope(envelope)? {
            RemoteEvent::BoardSync(sync) => {
                self.shapes = sync
                    .strokes
                    .iter()
                    .map(|record| Shape::Stroke(record.to_stroke()))
                    .collect();
                self.history.clear();
                log::debug!("board sync loaded {} strokes", self.shapes.len());
            }
            RemoteEvent::StrokeAdd(record) => {
                let stroke = record.to_stroke();
                if self.index_of(stroke.id).is_some() {
                    // Echo of a stroke we already hold.
                    log::debug!("ignoring duplicate stroke {}", stroke.id);
                } else {
                    self.shapes.push(Shape::Stroke(stroke));
                }
            }
            RemoteEvent::StrokeErase(erase) => {
                let position = usize::try_from(erase.stroke_index)
                    .ok()
                    .and_then(|nth| self.stroke_position(nth));
                match position {
                    Some(index) => {
                        self.shapes.remove(index);
                    }
                    None => log::warn!("stroke erase index {} out of range", erase.stroke_index),
                }
            }
            RemoteEvent::Ignored => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MAX_UNDO_HISTORY;
    use crate::protocol::{StrokeRecord, message_type};
    use serde_json::json;

    fn stroke(points: &[(f64, f64)]) -> Stroke {
        Stroke::from_points(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            ShapeStyle::default(),
        )
    }

    /// Stroke, rectangle, stroke, ellipse, stroke.
    fn mixed_engine() -> DrawingEngine {
        let mut engine = DrawingEngine::new();
        engine.add_stroke(stroke(&[(0.0, 0.0), (1.0, 1.0)]));
        engine.add_shape(Rectangle::new(Point::new(0.0, 0.0), 10.0, 10.0));
        engine.add_stroke(stroke(&[(5.0, 5.0), (6.0, 6.0), (7.0, 5.0)]));
        engine.add_shape(Ellipse::circle(Point::new(3.0, 3.0), 2.0));
        engine.add_stroke(stroke(&[(9.0, 9.0)]));
        engine
    }

    #[test]
    fn test_add_and_remove_shape() {
        let mut engine = mixed_engine();
        assert_eq!(engine.len(), 5);

        let removed = engine.remove_shape(1).unwrap();
        assert!(matches!(removed, Shape::Rectangle(_)));
        assert_eq!(engine.len(), 4);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut engine = mixed_engine();
        let before = engine.shapes().to_vec();
        let history_len = engine.history().len();

        assert!(engine.remove_shape(5).is_none());
        assert!(!engine.move_shape(99, 1.0, 1.0));
        assert!(engine.remove_stroke(3).is_none());
        assert!(!engine.move_stroke(3, 1.0, 1.0));
        assert!(!engine.add_point_to_stroke(3, Point::ZERO));
        assert!(!engine.simplify_stroke(3, 1.0));

        assert_eq!(engine.shapes(), before.as_slice());
        assert_eq!(engine.history().len(), history_len);
    }

    #[test]
    fn test_stroke_rank_skips_other_shapes() {
        let mut engine = mixed_engine();

        // Stroke rank 1 is collection index 2.
        assert!(engine.add_point_to_stroke(1, Point::new(8.0, 8.0)));
        assert_eq!(engine.shapes()[2].points().len(), 4);

        // Positional index 1 is the rectangle, untouched by stroke-rank ops.
        assert!(engine.move_stroke(1, 1.0, 0.0));
        assert_eq!(engine.shapes()[2].points()[0], Point::new(6.0, 5.0));
        assert_eq!(engine.shapes()[1].points()[0], Point::new(0.0, 0.0));

        let removed = engine.remove_stroke(2).unwrap();
        assert_eq!(removed.points, vec![Point::new(9.0, 9.0)]);
        assert_eq!(engine.strokes().count(), 2);
    }

    #[test]
    fn test_move_shape_translates_every_kind() {
        let mut engine = mixed_engine();
        assert!(engine.move_shape(1, 2.0, 3.0));
        assert_eq!(
            engine.shapes()[1].points(),
            vec![Point::new(2.0, 3.0), Point::new(12.0, 13.0)]
        );
        assert!(engine.move_shape(3, -1.0, 0.0));
        assert_eq!(engine.shapes()[3].points(), vec![Point::new(2.0, 3.0)]);
    }

    #[test]
    fn test_id_addressing_survives_removal() {
        let mut engine = DrawingEngine::new();
        let first = engine.add_stroke(stroke(&[(0.0, 0.0)]));
        let second = engine.add_stroke(stroke(&[(1.0, 1.0)]));

        engine.remove_shape_by_id(first).unwrap();
        assert_eq!(engine.index_of(second), Some(0));
        assert!(engine.move_shape_by_id(second, 1.0, 1.0));
        assert_eq!(engine.shape(second).unwrap().points(), vec![Point::new(2.0, 2.0)]);

        assert!(engine.remove_shape_by_id(first).is_none());
        assert!(!engine.move_shape_by_id(first, 1.0, 1.0));
    }

    #[test]
    fn test_add_point_to_non_stroke_is_ignored() {
        let mut engine = DrawingEngine::new();
        let rect = engine.draw_rectangle(Point::ZERO, Point::new(1.0, 1.0));
        assert!(!engine.add_point_to_shape(rect, Point::new(5.0, 5.0)));
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_undo_redo_restores_state() {
        let mut engine = DrawingEngine::new();
        let mut states = vec![engine.shapes().to_vec()];

        engine.add_stroke(stroke(&[(0.0, 0.0), (1.0, 0.1), (2.0, 0.0)]));
        states.push(engine.shapes().to_vec());
        engine.draw_rectangle(Point::new(1.0, 1.0), Point::new(4.0, 5.0));
        states.push(engine.shapes().to_vec());
        engine.add_point_to_stroke(0, Point::new(3.0, 3.0));
        states.push(engine.shapes().to_vec());
        engine.move_shape(1, 0.1, 0.2);
        states.push(engine.shapes().to_vec());
        engine.simplify_stroke(0, 10.0);
        states.push(engine.shapes().to_vec());
        engine.remove_shape(0);
        states.push(engine.shapes().to_vec());
        engine.clear();
        states.push(engine.shapes().to_vec());

        let n = states.len() - 1;
        for step in (0..n).rev() {
            assert!(engine.undo());
            assert_eq!(engine.shapes(), states[step].as_slice(), "after undo to {step}");
        }
        assert!(!engine.undo());

        for step in 1..=n {
            assert!(engine.redo());
            assert_eq!(engine.shapes(), states[step].as_slice(), "after redo to {step}");
        }
        assert!(!engine.redo());
    }

    #[test]
    fn test_fresh_edit_clears_redo() {
        let mut engine = DrawingEngine::new();
        engine.add_stroke(stroke(&[(0.0, 0.0)]));
        assert!(engine.undo());
        assert!(engine.can_redo());

        engine.add_stroke(stroke(&[(1.0, 1.0)]));
        assert!(!engine.can_redo());
        assert!(!engine.redo());
    }

    #[test]
    fn test_undo_on_empty_history() {
        let mut engine = DrawingEngine::new();
        assert!(!engine.undo());
        assert!(!engine.redo());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_clear_is_undoable() {
        let mut engine = mixed_engine();
        let before = engine.shapes().to_vec();

        assert!(engine.clear());
        assert!(engine.is_empty());
        assert_eq!(engine.history().commands().last().unwrap().kind(), CommandKind::Clear);

        assert!(engine.undo());
        assert_eq!(engine.shapes(), before.as_slice());
    }

    #[test]
    fn test_clear_empty_records_nothing() {
        let mut engine = DrawingEngine::new();
        assert!(!engine.clear());
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_history_limit() {
        let mut engine = DrawingEngine::with_history_limit(3);
        for i in 0..5 {
            engine.add_stroke(stroke(&[(i as f64, 0.0)]));
        }
        let mut undone = 0;
        while engine.undo() {
            undone += 1;
        }
        assert_eq!(undone, 3);
        assert_eq!(engine.len(), 2);
        assert_eq!(DrawingEngine::new().history().len(), 0);
        assert_eq!(MAX_UNDO_HISTORY, 100);
    }

    #[test]
    fn test_vertex_buffer_layout() {
        let mut engine = mixed_engine();
        engine.set_color(Color::new(1.0, 0.5, 0.25, 1.0));
        engine.set_thickness(4.0);
        engine.draw_line(Point::new(10.0, 20.0), Point::new(30.0, 40.0));

        let data = engine.vertex_buffer_data();
        let stroke_points: usize = engine.strokes().map(Stroke::len).sum();
        assert_eq!(stroke_points, 8);
        assert_eq!(data.len(), VERTEX_STRIDE * stroke_points);

        // The drawn line is the last stroke.
        let tail = &data[data.len() - 2 * VERTEX_STRIDE..];
        assert_eq!(&tail[..VERTEX_STRIDE], &[10.0, 20.0, 1.0, 0.5, 0.25, 1.0, 4.0]);
        assert_eq!(&tail[VERTEX_STRIDE..], &[30.0, 40.0, 1.0, 0.5, 0.25, 1.0, 4.0]);
    }

    #[test]
    fn test_vertex_buffer_ignores_non_strokes() {
        let mut engine = DrawingEngine::new();
        engine.draw_rectangle(Point::ZERO, Point::new(5.0, 5.0));
        engine.draw_circle(Point::ZERO, 3.0);
        assert!(engine.vertex_buffer_data().is_empty());
    }

    #[test]
    fn test_simplify_stroke_in_place() {
        let mut engine = DrawingEngine::new();
        engine.draw_rectangle(Point::ZERO, Point::new(1.0, 1.0));
        engine.add_stroke(stroke(&[(0.0, 0.0), (1.0, 0.05), (2.0, 0.1), (3.0, 1.0)]));

        assert!(engine.simplify_stroke(0, 0.6));
        let simplified = engine.strokes().next().unwrap();
        assert_eq!(simplified.points, vec![Point::new(0.0, 0.0), Point::new(3.0, 1.0)]);

        // Nothing left to drop: no new history entry.
        let recorded = engine.history().len();
        assert!(!engine.simplify_stroke(0, 0.6));
        assert_eq!(engine.history().len(), recorded);
    }

    #[test]
    fn test_live_capture_commits_one_command() {
        let mut engine = DrawingEngine::new();
        engine.set_eraser(true);
        engine.begin_stroke(Point::new(0.0, 0.0));
        for i in 1..=10 {
            engine.extend_stroke(Point::new(i as f64, 0.0));
        }
        assert_eq!(engine.pending_stroke().unwrap().len(), 11);
        assert!(engine.is_empty());

        let id = engine.end_stroke(Some(0.5)).unwrap();
        assert!(engine.pending_stroke().is_none());
        assert_eq!(engine.history().len(), 1);

        let committed = engine.shape(id).and_then(Shape::as_stroke).unwrap();
        assert!(committed.is_eraser);
        assert_eq!(committed.points, vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);

        assert!(engine.end_stroke(None).is_none());
        engine.extend_stroke(Point::ZERO);
        assert!(engine.pending_stroke().is_none());
    }

    #[test]
    fn test_apply_remote_board_sync_and_add() {
        let mut engine = DrawingEngine::new();
        engine.add_stroke(stroke(&[(0.0, 0.0)]));

        let record = StrokeRecord::from_stroke(&stroke(&[(1.0, 2.0), (3.0, 4.0)]), None, None);
        let sync = Envelope::new(
            message_type::BOARD_SYNC,
            json!({"strokes": [record], "users": []}),
        );
        assert!(engine.apply_remote(&sync).unwrap());
        assert_eq!(engine.len(), 1);
        assert!(!engine.can_undo());

        let added = stroke(&[(5.0, 5.0)]);
        let add = Envelope::new(
            message_type::STROKE_ADD,
            json!({"stroke": StrokeRecord::from_stroke(&added, Some("u".into()), None)}),
        );
        assert!(engine.apply_remote(&add).unwrap());
        // Echoed twice: held once.
        assert!(engine.apply_remote(&add).unwrap());
        assert_eq!(engine.len(), 2);
        assert!(!engine.can_undo());
    }

    fn remote_stroke_add(id: &str) -> Envelope {
        Envelope::new(
            message_type::STROKE_ADD,
            json!({"stroke": {
                "id": id,
                "color": {"r": 0.0, "g": 0.0, "b": 0.0, "a": 1.0},
                "thickness": 2.0,
                "points": [{"x": 1.0, "y": 1.0}, {"x": 2.0, "y": 2.0}]
            }}),
        )
    }

    #[test]
    fn test_redo_clear_keeps_remote_strokes() {
        let mut engine = DrawingEngine::new();
        let local = engine.add_stroke(stroke(&[(0.0, 0.0)]));
        assert!(engine.clear());
        assert!(engine.apply_remote(&remote_stroke_add("remote-1")).unwrap());
        assert_eq!(engine.len(), 1);

        assert!(engine.undo());
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.index_of(local), Some(0));

        assert!(engine.redo());
        assert_eq!(engine.len(), 1);
        assert!(engine.shape(local).is_none());

        assert!(engine.undo());
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.index_of(local), Some(0));
    }

    #[test]
    fn test_duplicate_delivery_with_non_uuid_id() {
        let mut engine = DrawingEngine::new();
        let add = remote_stroke_add("stress_stroke_0");
        assert!(engine.apply_remote(&add).unwrap());
        assert!(engine.apply_remote(&add).unwrap());
        assert_eq!(engine.len(), 1);

        assert!(engine.apply_remote(&remote_stroke_add("stress_stroke_1")).unwrap());
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_board_sync_loads_valid_strokes_only() {
        let mut engine = DrawingEngine::new();
        let good = StrokeRecord::from_stroke(&stroke(&[(1.0, 2.0), (3.0, 4.0)]), None, None);
        let sync = Envelope::new(
            message_type::BOARD_SYNC,
            json!({
                "strokes": [
                    good,
                    {"color": {"r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0}, "thickness": 3.0,
                     "points": [{"x": 0.0, "y": 0.0}]},
                    {"id": "no-points"}
                ],
                "users": []
            }),
        );
        assert!(engine.apply_remote(&sync).unwrap());
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.strokes().map(Stroke::len).sum::<usize>(), 3);

        // A stroke committed just before the sync arrives again on the live
        // stream; it is held once.
        let echo = Envelope::new(message_type::STROKE_ADD, json!({"stroke": good}));
        assert!(engine.apply_remote(&echo).unwrap());
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_apply_remote_erase_by_rank() {
        let mut engine = mixed_engine();
        let erase = Envelope::new(
            message_type::STROKE_ERASE,
            json!({"userId": "u", "strokeIndex": 1}),
        );
        assert!(engine.apply_remote(&erase).unwrap());
        assert_eq!(engine.strokes().count(), 2);
        assert_eq!(engine.len(), 4);

        let bad = Envelope::new(
            message_type::STROKE_ERASE,
            json!({"userId": "u", "strokeIndex": -1}),
        );
        assert!(engine.apply_remote(&bad).unwrap());
        assert_eq!(engine.len(), 4);
    }

    #[test]
    fn test_apply_remote_ignores_chat_and_rejects_bad_payloads() {
        let mut engine = DrawingEngine::new();
        let chat = Envelope::new(message_type::CHAT_MESSAGE, json!({"user": "a", "message": "hi"}));
        assert!(!engine.apply_remote(&chat).unwrap());

        let broken = Envelope::new(message_type::STROKE_ADD, json!({}));
        assert!(engine.apply_remote(&broken).is_err());
        assert!(engine.is_empty());
    }
}
