//! Editor state.
//!
//! [`EditorState`] is an immutable snapshot: a document, a selection, the schema it conforms to,
//! and a version number. Applying a [`Transaction`] yields the next snapshot.
//!
//! # Example
//!
//! ```rust
//! use element_core::{EditorState, Schema, SchemaSpec};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(Schema::new(SchemaSpec::basic()).unwrap());
//! let state = EditorState::empty(schema).unwrap();
//!
//! let mut tr = state.tr();
//! tr.insert(1, vec![state.schema().text("Hello")]).unwrap();
//! let next = state.apply(&tr).unwrap();
//!
//! assert_eq!(next.doc().text_content(), "Hello");
//! assert_eq!(next.version(), 1);
//! ```

use crate::error::{SchemaError, TransformError};
use crate::model::{Attrs, Node};
use crate::schema::Schema;
use crate::transform::{Mapping, StepMap, Transaction};
use std::sync::Arc;

/// A text selection expressed as two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Fixed end.
    pub anchor: usize,
    /// Moving end.
    pub head: usize,
}

impl Selection {
    /// Selection between two positions.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Empty selection at `pos`.
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Lower bound.
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Upper bound.
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Whether the selection is a cursor.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map through a mapping.
    pub fn map(&self, mapping: &Mapping) -> Self {
        Self {
            anchor: mapping.map(self.anchor, 1),
            head: mapping.map(self.head, 1),
        }
    }

    pub(crate) fn map_step(&self, map: &StepMap) -> Self {
        Self {
            anchor: map.map(self.anchor, 1),
            head: map.map(self.head, 1),
        }
    }

    /// Clamp both ends into `0..=max`.
    pub fn clamp(&self, max: usize) -> Self {
        Self {
            anchor: self.anchor.min(max),
            head: self.head.min(max),
        }
    }
}

/// Immutable editor snapshot.
#[derive(Debug, Clone)]
pub struct EditorState {
    doc: Node,
    selection: Selection,
    schema: Arc<Schema>,
    version: u64,
}

impl EditorState {
    /// Create a state for `doc`, with the cursor at the document start.
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        Self {
            doc,
            selection: Selection::cursor(0),
            schema,
            version: 0,
        }
    }

    /// Create a state holding the smallest valid document of the schema's top node type.
    pub fn empty(schema: Arc<Schema>) -> Result<Self, SchemaError> {
        let doc = schema
            .create_and_fill(schema.top_node(), Attrs::new(), Vec::new())
            .ok_or_else(|| SchemaError::InvalidContent {
                node: schema.top_node().to_string(),
            })?;
        Ok(Self::new(schema, doc))
    }

    /// Replace the selection (clamped to the document).
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection.clamp(self.doc.content_size());
        self
    }

    /// Current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Current selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Version number (incremented by every applied transaction).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Start a transaction from this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(
            Arc::clone(&self.schema),
            self.doc.clone(),
            self.selection,
            self.version,
        )
    }

    /// Apply a transaction created from this state.
    pub fn apply(&self, tr: &Transaction) -> Result<EditorState, TransformError> {
        if tr.base_version() != self.version {
            return Err(TransformError::StaleTransaction {
                expected: tr.base_version(),
                found: self.version,
            });
        }
        Ok(Self {
            doc: tr.doc().clone(),
            selection: tr.selection().clamp(tr.doc().content_size()),
            schema: Arc::clone(&self.schema),
            version: self.version + 1,
        })
    }

    /// Replace the document wholesale, keeping the selection (clamped) and bumping the version.
    pub(crate) fn replace_doc(&self, doc: Node) -> EditorState {
        let selection = self.selection.clamp(doc.content_size());
        Self {
            doc,
            selection,
            schema: Arc::clone(&self.schema),
            version: self.version + 1,
        }
    }
}
