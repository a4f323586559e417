//! Nested child editors.
//!
//! A rich-text field lives in a child node of its element. A [`NestedEditor`] edits that child
//! as a self-contained document with its own selection, which the outer document does not track.
//! Local edits are applied to the nested state first and then handed back to the element
//! controller as a replacement child node.

use crate::decorations::DecorationSet;
use crate::error::{ElementError, TransformError};
use crate::model::Node;
use crate::schema::Schema;
use crate::state::EditorState;
use crate::transform::Transaction;
use std::sync::Arc;

/// Editor over one rich-text child node.
#[derive(Debug, Clone)]
pub struct NestedEditor {
    field: String,
    offset: usize,
    state: EditorState,
    decorations: DecorationSet,
    closed: bool,
}

impl NestedEditor {
    /// Open an editor over `child`, which sits at content offset `offset` inside its element.
    pub fn open(
        schema: Arc<Schema>,
        field: &str,
        child: &Node,
        offset: usize,
        decorations: DecorationSet,
    ) -> Self {
        Self {
            field: field.to_string(),
            offset,
            state: EditorState::new(schema, child.clone()),
            decorations,
            closed: false,
        }
    }

    /// Field this editor belongs to.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Offset of the child node inside its element's content.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Local editor state. Its document is the child node.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Decorations in the child's own coordinates.
    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    /// Whether the editor was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take a new child node, offset and decorations from the parent element.
    ///
    /// The local selection survives when the child content is unchanged, which is the case when
    /// the parent echoes back an edit made here.
    pub fn update(&mut self, child: &Node, offset: usize, decorations: DecorationSet) -> bool {
        if self.closed || child.type_name() != self.state.doc().type_name() {
            return false;
        }
        self.offset = offset;
        self.decorations = decorations;
        if self.state.doc() != child {
            self.state = self.state.replace_doc(child.clone());
        }
        true
    }

    /// Start a local transaction.
    pub fn tr(&self) -> Transaction {
        self.state.tr()
    }

    /// Apply a local transaction. Returns the new child node when the content changed.
    pub fn apply_local(&mut self, tr: &Transaction) -> Result<Option<Node>, ElementError> {
        if self.closed {
            return Err(ElementError::Destroyed);
        }
        let next = self.state.apply(tr).map_err(ElementError::from)?;
        let changed = tr.doc_changed();
        self.state = next;
        Ok(changed.then(|| self.state.doc().clone()))
    }

    /// Close the editor. Later local edits fail with [`ElementError::Destroyed`].
    pub fn close(&mut self) {
        self.closed = true;
        self.decorations = DecorationSet::empty();
    }
}

/// Run `edit` against a fresh local transaction of `editor`.
pub(crate) fn edit_locally<F>(editor: &mut NestedEditor, edit: F) -> Result<Option<Node>, ElementError>
where
    F: FnOnce(&mut Transaction) -> Result<(), TransformError>,
{
    let mut tr = editor.tr();
    edit(&mut tr)?;
    editor.apply_local(&tr)
}
