//! Document steps and transactions.
//!
//! A [`Transaction`] accumulates [`Step`]s against a starting document. Each step is applied
//! eagerly, so [`Transaction::doc`] always reflects the result so far, and each step's inverse is
//! recorded for history. Steps that would not change the document are not recorded, which makes
//! [`Transaction::doc_changed`] a reliable "is there anything to dispatch" test.

use crate::error::TransformError;
use crate::model::{Attrs, Node, fragment_size};
use crate::schema::Schema;
use crate::state::Selection;
use std::sync::Arc;

/// A single structural change.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace the content between two positions that share a parent.
    Replace {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
        /// Replacement content.
        content: Vec<Node>,
    },
    /// Change the type and attributes of the node starting at `pos`, keeping its content.
    SetNodeMarkup {
        /// Position directly before the node.
        pos: usize,
        /// New node type name.
        type_name: String,
        /// New attributes (defaults are filled in).
        attrs: Attrs,
    },
}

impl Step {
    /// Apply the step to `doc`.
    pub fn apply(&self, doc: &Node, schema: &Schema) -> Result<Node, TransformError> {
        match self {
            Step::Replace { from, to, content } => apply_replace(doc, schema, *from, *to, content),
            Step::SetNodeMarkup {
                pos,
                type_name,
                attrs,
            } => apply_set_markup(doc, schema, *pos, type_name, attrs),
        }
    }

    /// The step that undoes this one, given the document it applies to.
    pub fn invert(&self, doc: &Node) -> Result<Step, TransformError> {
        match self {
            Step::Replace { from, to, content } => {
                let resolved = doc.resolve(*from)?;
                let start = resolved.start(resolved.depth());
                let old = resolved
                    .parent()
                    .cut_content(from - start, to - start);
                Ok(Step::Replace {
                    from: *from,
                    to: from + fragment_size(content),
                    content: old,
                })
            }
            Step::SetNodeMarkup { pos, .. } => {
                let node = doc.node_at(*pos).ok_or(TransformError::NoNodeAt(*pos))?;
                Ok(Step::SetNodeMarkup {
                    pos: *pos,
                    type_name: node.type_name().to_string(),
                    attrs: node.attrs().clone(),
                })
            }
        }
    }

    /// Position map of this step.
    pub fn map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, content } => StepMap {
                start: *from,
                old_size: to - from,
                new_size: fragment_size(content),
            },
            Step::SetNodeMarkup { pos, .. } => StepMap {
                start: *pos,
                old_size: 0,
                new_size: 0,
            },
        }
    }
}

fn apply_replace(
    doc: &Node,
    schema: &Schema,
    from: usize,
    to: usize,
    content: &[Node],
) -> Result<Node, TransformError> {
    if to < from {
        return Err(TransformError::InvalidRange { from, to });
    }
    let rfrom = doc.resolve(from)?;
    let rto = doc.resolve(to)?;
    let depth = rfrom.depth();
    if depth != rto.depth() || rfrom.start(depth) != rto.start(depth) {
        return Err(TransformError::NotSameParent { from, to });
    }

    for node in content {
        schema.check_node(node)?;
    }

    let parent = rfrom.parent();
    let start = rfrom.start(depth);
    let end = parent.content_size();
    let mut children = parent.cut_content(0, from - start);
    children.extend(content.iter().cloned());
    children.extend(parent.cut_content(to - start, end));

    let replaced = parent.with_content(children);
    schema.check_content(replaced.type_name(), replaced.content())?;
    Ok(doc.replace_at_path(&rfrom.path(), replaced))
}

fn apply_set_markup(
    doc: &Node,
    schema: &Schema,
    pos: usize,
    type_name: &str,
    attrs: &Attrs,
) -> Result<Node, TransformError> {
    let resolved = doc.resolve(pos)?;
    let node = resolved.node_after().ok_or(TransformError::NoNodeAt(pos))?;
    if node.is_text() {
        return Err(TransformError::NoNodeAt(pos));
    }
    let attrs = schema.compute_attrs(type_name, attrs)?;
    let updated = node.with_markup(type_name, attrs, schema.is_leaf(type_name));
    schema.check_content(type_name, updated.content())?;

    let mut path = resolved.path();
    path.push(resolved.index());
    Ok(doc.replace_at_path(&path, updated))
}

/// How one step moves positions: `old_size` positions at `start` became `new_size` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    /// Start of the changed range.
    pub start: usize,
    /// Size of the range before the step.
    pub old_size: usize,
    /// Size of the range after the step.
    pub new_size: usize,
}

impl StepMap {
    /// Map a position. `assoc < 0` keeps positions inside a replaced range at its start,
    /// otherwise they move to its end.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        let end = self.start + self.old_size;
        if pos < self.start || (pos == self.start && assoc < 0) {
            pos
        } else if pos > end || (pos == end && self.old_size > 0 && assoc >= 0) {
            pos - self.old_size + self.new_size
        } else if assoc < 0 {
            self.start
        } else {
            self.start + self.new_size
        }
    }

    /// Map a node occupying `pos..pos + size`. Returns the node's new position and size, or
    /// `None` when the step replaced the node.
    pub fn map_node(&self, pos: usize, size: usize) -> Option<(usize, usize)> {
        let end = self.start + self.old_size;
        if self.old_size == 0 && self.new_size == 0 {
            return Some((pos, size));
        }
        if pos + size <= self.start {
            Some((pos, size))
        } else if pos >= end {
            Some((pos - self.old_size + self.new_size, size))
        } else if pos < self.start && end < pos + size {
            Some((pos, size - self.old_size + self.new_size))
        } else {
            None
        }
    }
}

/// A sequence of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    /// Step maps in application order.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// Map a position through every step.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.maps.iter().fold(pos, |pos, m| m.map(pos, assoc))
    }

    /// Map a node range through every step; `None` once any step replaced the node.
    pub fn map_node(&self, pos: usize, size: usize) -> Option<usize> {
        self.maps
            .iter()
            .try_fold((pos, size), |(pos, size), m| m.map_node(pos, size))
            .map(|(pos, _)| pos)
    }

    fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }
}

/// How the history should treat a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Start a new undo group.
    #[default]
    NewGroup,
    /// Join the most recent undo group.
    AppendToLast,
    /// Do not record.
    Skip,
}

/// Whether `pos` sits between two sibling nodes that can be merged into one.
pub fn can_join(doc: &Node, schema: &Schema, pos: usize) -> bool {
    let Ok(resolved) = doc.resolve(pos) else {
        return false;
    };
    let (Some(before), Some(after)) = (resolved.node_before(), resolved.node_after()) else {
        return false;
    };
    if before.is_text() || after.is_text() || before.is_leaf() || after.is_leaf() {
        return false;
    }
    if before.type_name() != after.type_name() {
        return false;
    }
    let mut merged = before.content().to_vec();
    merged.extend(after.content().iter().cloned());
    schema.check_content(before.type_name(), &merged).is_ok()
}

/// A batch of steps applied together as one document edit.
#[derive(Debug, Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    base_version: u64,
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    inverted: Vec<Step>,
    mapping: Mapping,
    selection: Selection,
    selection_set: bool,
    history: HistoryMode,
}

impl Transaction {
    pub(crate) fn new(schema: Arc<Schema>, doc: Node, selection: Selection, base_version: u64) -> Self {
        Self {
            schema,
            base_version,
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            inverted: Vec::new(),
            mapping: Mapping::default(),
            selection,
            selection_set: false,
            history: HistoryMode::NewGroup,
        }
    }

    /// Schema the transaction validates against.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Version of the state this transaction was created from.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Document before any step.
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// Document after all steps so far.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Recorded steps.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Inverses of the recorded steps, in application order.
    pub fn inverted_steps(&self) -> &[Step] {
        &self.inverted
    }

    /// Position mapping from `before` to `doc`.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Whether any step changed the document.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Selection after the transaction: the explicitly set one, or the start selection mapped
    /// through every step.
    pub fn selection(&self) -> Selection {
        if self.selection_set {
            self.selection
        } else {
            self.selection.map(&self.mapping)
        }
    }

    /// Whether the selection was set explicitly.
    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    /// History treatment.
    pub fn history_mode(&self) -> HistoryMode {
        self.history
    }

    /// Set the history treatment.
    pub fn set_history_mode(&mut self, mode: HistoryMode) -> &mut Self {
        self.history = mode;
        self
    }

    /// Set the selection explicitly.
    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self.selection_set = true;
        self
    }

    /// Apply a step. Steps that leave the document unchanged are dropped.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let next = step.apply(&self.doc, &self.schema)?;
        if next == self.doc {
            return Ok(self);
        }
        let inverse = step.invert(&self.doc)?;
        if self.selection_set {
            self.selection = self.selection.map_step(&step.map());
        }
        self.mapping.push(step.map());
        self.inverted.push(inverse);
        self.steps.push(step);
        self.doc = next;
        Ok(self)
    }

    /// Replace the content between `from` and `to`.
    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: Vec<Node>,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::Replace { from, to, content })
    }

    /// Delete the content between `from` and `to`.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace_with(from, to, Vec::new())
    }

    /// Insert content at `pos`.
    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, content)
    }

    /// Change the attributes (and optionally the type) of the node at `pos`.
    pub fn set_node_markup(
        &mut self,
        pos: usize,
        type_name: Option<&str>,
        attrs: Attrs,
    ) -> Result<&mut Self, TransformError> {
        let node = self.doc.node_at(pos).ok_or(TransformError::NoNodeAt(pos))?;
        let type_name = type_name.unwrap_or(node.type_name()).to_string();
        self.step(Step::SetNodeMarkup {
            pos,
            type_name,
            attrs,
        })
    }

    /// Merge the two sibling nodes around `pos` into one.
    pub fn join(&mut self, pos: usize) -> Result<&mut Self, TransformError> {
        if !can_join(&self.doc, &self.schema, pos) {
            return Err(TransformError::CannotJoin(pos));
        }
        let resolved = self.doc.resolve(pos)?;
        let (Some(before), Some(after)) = (resolved.node_before(), resolved.node_after()) else {
            return Err(TransformError::CannotJoin(pos));
        };
        let mut content = before.content().to_vec();
        content.extend(after.content().iter().cloned());
        let merged = before.with_content(content);
        let from = pos - before.node_size();
        let to = pos + after.node_size();
        self.replace_with(from, to, vec![merged])
    }

    /// Replace the selection with a block node.
    ///
    /// A non-empty selection inside one parent is deleted first. Then, when the cursor sits in a
    /// textblock, an empty textblock is replaced, a cursor at its start or end inserts before or
    /// after it, and a cursor in the middle splits it around the new node. The selection ends up
    /// directly after the inserted node.
    pub fn replace_selection_with(&mut self, node: Node) -> Result<&mut Self, TransformError> {
        let selection = self.selection();
        let (from, to) = (selection.from(), selection.to());
        if from != to {
            let rfrom = self.doc.resolve(from)?;
            let rto = self.doc.resolve(to)?;
            let same_parent = rfrom.depth() == rto.depth()
                && rfrom.start(rfrom.depth()) == rto.start(rto.depth());
            if same_parent {
                self.delete(from, to)?;
            }
        }

        let pos = self.selection().from();
        let resolved = self.doc.resolve(pos)?;
        let depth = resolved.depth();
        let parent = resolved.parent();
        let size = node.node_size();

        let (insert_at, after) = if depth >= 1 && self.schema.is_textblock(parent.type_name()) {
            let before = resolved.before(depth);
            let end = resolved.after(depth);
            let offset = resolved.parent_offset();
            if parent.content_size() == 0 {
                self.replace_with(before, end, vec![node])?;
                (before, before + size)
            } else if offset == 0 {
                self.insert(before, vec![node])?;
                (before, before + size)
            } else if offset == parent.content_size() {
                self.insert(end, vec![node])?;
                (end, end + size)
            } else {
                let left = parent.with_content(parent.cut_content(0, offset));
                let right = parent.with_content(parent.cut_content(offset, parent.content_size()));
                let left_size = left.node_size();
                self.replace_with(before, end, vec![left, node, right])?;
                (before + left_size, before + left_size + size)
            }
        } else {
            self.insert(pos, vec![node])?;
            (pos, pos + size)
        };

        tracing::trace!(pos = insert_at, "inserted node at selection");
        self.set_selection(Selection::cursor(after));
        Ok(self)
    }
}
