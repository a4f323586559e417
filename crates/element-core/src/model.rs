//! Document tree model.
//!
//! Documents are immutable trees of [`Node`]s. Every edit produces a new tree; unchanged subtrees
//! are cloned, which keeps the model simple and makes structural equality (`==`) meaningful for
//! "did anything change" checks.
//!
//! # Positions
//!
//! Positions are integer offsets into a node's *content*, counted the same way ProseMirror does:
//!
//! - a text node counts one per `char`,
//! - a leaf node (no content expression) counts 1,
//! - any other node counts its content size plus 2 (one for entering, one for leaving).
//!
//! ```rust
//! use element_core::Node;
//!
//! let doc = Node::branch(
//!     "doc",
//!     Default::default(),
//!     vec![Node::branch("paragraph", Default::default(), vec![Node::text("hi")])],
//! );
//! assert_eq!(doc.content_size(), 4);
//! assert_eq!(doc.node_at(0).map(|n| n.type_name()), Some("paragraph"));
//! ```

use crate::error::TransformError;
use serde_json::Value;

/// Node attributes (a JSON object).
pub type Attrs = serde_json::Map<String, Value>;

/// Type name used for text nodes.
pub const TEXT_NODE: &str = "text";

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    type_name: String,
    attrs: Attrs,
    content: Vec<Node>,
    text: Option<String>,
    leaf: bool,
}

impl Node {
    /// Create a node that may hold content.
    pub fn branch(type_name: impl Into<String>, attrs: Attrs, content: Vec<Node>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
            content: normalize(content),
            text: None,
            leaf: false,
        }
    }

    /// Create a leaf node (size 1, never holds content).
    pub fn leaf(type_name: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
            content: Vec::new(),
            text: None,
            leaf: true,
        }
    }

    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            type_name: TEXT_NODE.to_string(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(text.into()),
            leaf: true,
        }
    }

    /// Node type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Node attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Look up a single attribute.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// Child nodes.
    pub fn content(&self) -> &[Node] {
        &self.content
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    /// Whether this is a text node.
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// Whether this node can never hold content.
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Text of a text node.
    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Size of the node in positions.
    pub fn node_size(&self) -> usize {
        match &self.text {
            Some(text) => text.chars().count(),
            None if self.leaf => 1,
            None => self.content_size() + 2,
        }
    }

    /// Size of the node's content in positions.
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.iter().map(Node::text_content).collect(),
        }
    }

    /// Copy of this node with different content.
    pub fn with_content(&self, content: Vec<Node>) -> Self {
        Self {
            type_name: self.type_name.clone(),
            attrs: self.attrs.clone(),
            content: normalize(content),
            text: None,
            leaf: self.leaf,
        }
    }

    /// Copy of this node with a different type and attributes, keeping its content.
    pub fn with_markup(&self, type_name: impl Into<String>, attrs: Attrs, leaf: bool) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
            content: self.content.clone(),
            text: self.text.clone(),
            leaf,
        }
    }

    /// Visit every descendant with its position (relative to this node's content start) and
    /// parent. Returning `false` from `f` skips that node's children. Every node is visited.
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node) -> bool,
    {
        self.descendants_from(0, f);
    }

    fn descendants_from<F>(&self, start: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node) -> bool,
    {
        let mut pos = start;
        for child in &self.content {
            if f(child, pos, self) && !child.content.is_empty() {
                child.descendants_from(pos + 1, f);
            }
            pos += child.node_size();
        }
    }

    /// Iterate over children together with their offsets inside this node's content.
    pub fn children_with_offsets(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.content.iter().scan(0usize, |offset, child| {
            let here = *offset;
            *offset += child.node_size();
            Some((here, child))
        })
    }

    /// The non-text node that starts exactly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.find_index(pos)?;
            let child = node.content.get(index)?;
            if offset == pos {
                return (!child.is_text()).then_some(child);
            }
            if child.is_text() {
                return None;
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Find the child index containing content offset `pos`, plus the child's start offset.
    ///
    /// Returns `(child_count, content_size)` for the end position, and `None` when `pos` is out
    /// of range.
    pub(crate) fn find_index(&self, pos: usize) -> Option<(usize, usize)> {
        if pos == 0 {
            return Some((0, 0));
        }
        let size = self.content_size();
        if pos == size {
            return Some((self.content.len(), size));
        }
        if pos > size {
            return None;
        }
        let mut cur = 0;
        for (index, child) in self.content.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Some((index + 1, end));
                }
                return Some((index, cur));
            }
            cur = end;
        }
        None
    }

    /// Resolve `pos` into its ancestry.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, TransformError> {
        ResolvedPos::resolve(self, pos)
    }

    /// Content between `from` and `to` (content offsets), cutting text nodes where needed.
    ///
    /// Non-text children straddling a boundary are kept whole.
    pub(crate) fn cut_content(&self, from: usize, to: usize) -> Vec<Node> {
        let mut out = Vec::new();
        let mut pos = 0;
        for child in &self.content {
            let size = child.node_size();
            let end = pos + size;
            if end > from && pos < to {
                match &child.text {
                    Some(text) => {
                        let start = from.saturating_sub(pos);
                        let stop = (to - pos).min(size);
                        let cut: String = text.chars().skip(start).take(stop - start).collect();
                        out.push(Node::text(cut));
                    }
                    None => out.push(child.clone()),
                }
            }
            pos = end;
        }
        normalize(out)
    }

    /// Rebuild the tree with the node at `path` (child indices from this node) replaced.
    pub(crate) fn replace_at_path(&self, path: &[usize], replacement: Node) -> Node {
        match path.split_first() {
            None => replacement,
            Some((&index, rest)) => {
                let mut content = self.content.clone();
                if let Some(child) = content.get(index) {
                    content[index] = child.replace_at_path(rest, replacement);
                }
                self.with_content(content)
            }
        }
    }
}

/// Merge adjacent text nodes and drop empty ones.
pub(crate) fn normalize(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if let Some(text) = &node.text {
            if text.is_empty() {
                continue;
            }
            if let Some(last) = out.last_mut()
                && let Some(prev) = last.text.as_mut()
            {
                prev.push_str(text);
                continue;
            }
        }
        out.push(node);
    }
    out
}

/// Sum of node sizes in a fragment.
pub fn fragment_size(content: &[Node]) -> usize {
    content.iter().map(Node::node_size).sum()
}

/// One ancestor level of a [`ResolvedPos`].
#[derive(Debug, Clone, Copy)]
struct Level<'a> {
    node: &'a Node,
    index: usize,
    start: usize,
}

/// A position resolved against a document: the chain of ancestors containing it.
///
/// Depth 0 is the document itself.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    levels: Vec<Level<'a>>,
    parent_offset: usize,
    text_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    fn resolve(doc: &'a Node, pos: usize) -> Result<Self, TransformError> {
        let size = doc.content_size();
        if pos > size {
            return Err(TransformError::OutOfRange { pos, size });
        }

        let mut levels = Vec::new();
        let mut node = doc;
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node
                .find_index(parent_offset)
                .ok_or(TransformError::OutOfRange { pos, size })?;
            let rem = parent_offset - offset;
            levels.push(Level { node, index, start });
            if rem == 0 {
                return Ok(Self {
                    pos,
                    levels,
                    parent_offset,
                    text_offset: 0,
                });
            }
            let child = &node.content[index];
            if child.is_text() {
                return Ok(Self {
                    pos,
                    levels,
                    parent_offset,
                    text_offset: rem,
                });
            }
            node = child;
            start += offset + 1;
            parent_offset = rem - 1;
        }
    }

    /// The resolved position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Depth of the innermost parent (0 = document).
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Innermost node containing the position.
    pub fn parent(&self) -> &'a Node {
        self.levels[self.depth()].node
    }

    /// Ancestor at `depth`.
    pub fn node(&self, depth: usize) -> &'a Node {
        self.levels[depth].node
    }

    /// Index into the parent's children at which the position sits.
    pub fn index(&self) -> usize {
        self.levels[self.depth()].index
    }

    /// Index into the ancestor at `depth`.
    pub fn index_at(&self, depth: usize) -> usize {
        self.levels[depth].index
    }

    /// Offset of the position inside its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Offset inside a text node (0 when the position sits between children).
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    /// Absolute position of the content start of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        self.levels[depth].start
    }

    /// Absolute position directly before the ancestor at `depth` (`depth >= 1`).
    pub fn before(&self, depth: usize) -> usize {
        self.levels[depth].start - 1
    }

    /// Absolute position directly after the ancestor at `depth` (`depth >= 1`).
    pub fn after(&self, depth: usize) -> usize {
        self.before(depth) + self.levels[depth].node.node_size()
    }

    /// Child indices leading from the document to the parent.
    pub fn path(&self) -> Vec<usize> {
        self.levels[..self.depth()]
            .iter()
            .map(|level| level.index)
            .collect()
    }

    /// Node directly before the position, when it sits between two children.
    pub fn node_before(&self) -> Option<&'a Node> {
        if self.text_offset > 0 {
            return None;
        }
        let index = self.index();
        index.checked_sub(1).and_then(|i| self.parent().child(i))
    }

    /// Node directly after the position, when it sits between two children.
    pub fn node_after(&self) -> Option<&'a Node> {
        if self.text_offset > 0 {
            return None;
        }
        self.parent().child(self.index())
    }
}
