//! First-class decorations data model.
//!
//! Decorations are UI-facing annotations anchored to document positions without modifying the
//! document. Common examples:
//!
//! - external highlights (search matches, spell-check or style-guide hints)
//! - widgets rendered between positions
//! - node-level classes (e.g. "selected element")
//!
//! Decorations are derived state. A [`DecorationSource`] recomputes them from the current
//! [`EditorState`](crate::EditorState) after every transaction; they are never stored on nodes.
//! Element controllers hand each nested editor only the slice of decorations that falls inside
//! its child node, shifted into the child's own coordinates.

use crate::state::EditorState;
use std::sync::Arc;

/// A half-open position range (`start..end`).
///
/// For point-anchored decorations (widgets), use `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DecorationRange {
    /// Range start (inclusive).
    pub start: usize,
    /// Range end (exclusive).
    pub end: usize,
}

impl DecorationRange {
    /// Create a new decoration range.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A coarse decoration kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DecorationKind {
    /// Styling applied to inline content.
    Inline,
    /// Styling applied to a whole node.
    Node,
    /// A widget rendered at a point.
    Widget,
    /// A custom, integration-defined kind.
    Custom(u32),
}

/// A single decoration item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    /// Anchor range.
    pub range: DecorationRange,
    /// A coarse decoration kind.
    pub kind: DecorationKind,
    /// Optional CSS-like class name for the host renderer.
    pub class: Option<String>,
    /// Optional integration-specific payload (JSON text).
    pub data_json: Option<String>,
}

impl Decoration {
    /// Inline decoration over `start..end` with a class.
    pub fn inline(start: usize, end: usize, class: &str) -> Self {
        Self {
            range: DecorationRange::new(start, end),
            kind: DecorationKind::Inline,
            class: Some(class.to_string()),
            data_json: None,
        }
    }

    /// Widget decoration at `pos`.
    pub fn widget(pos: usize) -> Self {
        Self {
            range: DecorationRange::new(pos, pos),
            kind: DecorationKind::Widget,
            class: None,
            data_json: None,
        }
    }
}

/// An immutable, range-sorted set of decorations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set (sorted by range).
    pub fn new(mut decorations: Vec<Decoration>) -> Self {
        decorations.sort_by_key(|d| d.range);
        Self { decorations }
    }

    /// Whether the set holds no decorations.
    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    /// Number of decorations.
    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    /// Decorations in range order.
    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    /// Decorations inside `from..=to`, shifted so `from` becomes 0. Inline decorations
    /// overlapping the range are clipped to it; other kinds must lie entirely inside.
    pub fn slice(&self, from: usize, to: usize) -> Self {
        let decorations = self
            .decorations
            .iter()
            .filter_map(|d| {
                let range = match d.kind {
                    DecorationKind::Inline if d.range.start < to && d.range.end > from => {
                        DecorationRange::new(d.range.start.max(from), d.range.end.min(to))
                    }
                    _ if d.range.start >= from && d.range.end <= to => d.range,
                    _ => return None,
                };
                Some(Decoration {
                    range: DecorationRange::new(range.start - from, range.end - from),
                    ..d.clone()
                })
            })
            .collect();
        Self { decorations }
    }
}

/// Computes the decorations for a state.
pub type DecorationSource = Arc<dyn Fn(&EditorState) -> DecorationSet + Send + Sync>;
