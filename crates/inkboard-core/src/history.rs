//! Linear undo/redo history of drawing commands.

use crate::shapes::{Shape, ShapeId, ShapeStyle};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Maximum number of undo entries to keep.
pub const MAX_UNDO_HISTORY: usize = 100;

/// The primitive operation a command recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    AddShape,
    RemoveShape,
    MoveShape,
    AddPoint,
    Simplify,
    Clear,
}

/// The reversible change behind a command.
///
/// Shapes are addressed by id so that entries stay valid when remote edits
/// shift positional indices in between.
#[derive(Debug, Clone)]
pub(crate) enum Edit {
    Insert { index: usize, shape: Shape },
    Remove { index: usize, shape: Shape },
    Replace { before: Shape, after: Shape },
    AppendPoint { id: ShapeId, point: Point },
    Clear { shapes: Vec<Shape> },
}

fn position(shapes: &[Shape], id: ShapeId) -> Option<usize> {
    shapes.iter().position(|s| s.id() == id)
}

fn replace(shapes: &mut [Shape], with: &Shape) {
    if let Some(slot) = shapes.iter_mut().find(|s| s.id() == with.id()) {
        *slot = with.clone();
    }
}

impl Edit {
    pub(crate) fn apply(&self, shapes: &mut Vec<Shape>) {
        match self {
            Edit::Insert { index, shape } => {
                shapes.insert((*index).min(shapes.len()), shape.clone());
            }
            Edit::Remove { shape, .. } => {
                if let Some(i) = position(shapes, shape.id()) {
                    shapes.remove(i);
                }
            }
            Edit::Replace { after, .. } => replace(shapes, after),
            Edit::AppendPoint { id, point } => {
                if let Some(stroke) = shapes
                    .iter_mut()
                    .find(|s| s.id() == *id)
                    .and_then(Shape::as_stroke_mut)
                {
                    stroke.add_point(*point);
                }
            }
            Edit::Clear { shapes: saved } => {
                // Shapes that arrived after the clear are not part of it.
                shapes.retain(|s| position(saved, s.id()).is_none());
            }
        }
    }

    pub(crate) fn revert(&self, shapes: &mut Vec<Shape>) {
        match self {
            Edit::Insert { shape, .. } => {
                if let Some(i) = position(shapes, shape.id()) {
                    shapes.remove(i);
                }
            }
            Edit::Remove { index, shape } => {
                shapes.insert((*index).min(shapes.len()), shape.clone());
            }
            Edit::Replace { before, .. } => replace(shapes, before),
            Edit::AppendPoint { id, .. } => {
                if let Some(stroke) = shapes
                    .iter_mut()
                    .find(|s| s.id() == *id)
                    .and_then(Shape::as_stroke_mut)
                {
                    stroke.points.pop();
                }
            }
            Edit::Clear { shapes: saved } => {
                let arrived_since = std::mem::take(shapes);
                shapes.extend(saved.iter().cloned());
                shapes.extend(arrived_since);
            }
        }
    }
}

/// A recorded primitive operation.
#[derive(Debug, Clone)]
pub struct DrawingCommand {
    kind: CommandKind,
    points: Vec<Point>,
    style: ShapeStyle,
    edit: Edit,
}

impl DrawingCommand {
    pub(crate) fn new(kind: CommandKind, points: Vec<Point>, style: ShapeStyle, edit: Edit) -> Self {
        Self {
            kind,
            points,
            style,
            edit,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Points the command touched: the added or removed shape's points, the
    /// appended point, or the stroke's points after simplification.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn style(&self) -> &ShapeStyle {
        &self.style
    }

    pub(crate) fn edit(&self) -> &Edit {
        &self.edit
    }
}

/// Undo and redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<DrawingCommand>,
    redo_stack: Vec<DrawingCommand>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(MAX_UNDO_HISTORY)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that keeps at most `limit` undo entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a fresh command. Clears the redo stack.
    pub fn record(&mut self, command: DrawingCommand) {
        log::trace!("recording {:?}", command.kind);
        self.undo_stack.push(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the newest command for undo, moving it onto the redo stack once the
    /// caller has reverted it.
    pub(crate) fn undo_with(&mut self, revert: impl FnOnce(&DrawingCommand)) -> bool {
        match self.undo_stack.pop() {
            Some(command) => {
                revert(&command);
                self.redo_stack.push(command);
                true
            }
            None => false,
        }
    }

    pub(crate) fn redo_with(&mut self, apply: impl FnOnce(&DrawingCommand)) -> bool {
        match self.redo_stack.pop() {
            Some(command) => {
                apply(&command);
                self.undo_stack.push(command);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undoable commands.
    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    /// Recorded commands, oldest first.
    pub fn commands(&self) -> &[DrawingCommand] {
        &self.undo_stack
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
