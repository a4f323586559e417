//! Host document schema.
//!
//! A [`Schema`] is compiled from an ordered list of [`NodeSpec`]s. Each spec may carry a content
//! expression (a space-separated sequence of node names or group names, each optionally followed
//! by `*`, `+` or `?`), a group, and attribute declarations with optional defaults.
//!
//! ```rust
//! use element_core::{Schema, SchemaSpec};
//!
//! let schema = Schema::new(SchemaSpec::basic()).unwrap();
//! let doc = schema.create_and_fill("doc", Default::default(), vec![]).unwrap();
//! // `doc` requires `block+`, so an empty paragraph was filled in.
//! assert_eq!(doc.child_count(), 1);
//! ```

use crate::error::SchemaError;
use crate::model::{Attrs, Node, TEXT_NODE};
use indexmap::IndexMap;
use serde_json::Value;

/// Maximum nesting explored while synthesizing required content.
const MAX_FILL_DEPTH: usize = 16;

/// Declaration of one node attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    /// Default value; `None` makes the attribute required.
    pub default: Option<Value>,
}

/// Declaration of a node type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeSpec {
    /// Content expression. `None` declares a leaf node.
    pub content: Option<String>,
    /// Group the node belongs to (e.g. `block`, `inline`).
    pub group: Option<String>,
    /// Attribute declarations, in declaration order.
    pub attrs: IndexMap<String, AttrSpec>,
    /// Whether the node is inline content.
    pub inline: bool,
    /// Whether the node is treated as a single unit by selections.
    pub atom: bool,
}

impl NodeSpec {
    /// A block-level node with the given content expression.
    pub fn block(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            group: Some("block".to_string()),
            ..Self::default()
        }
    }

    /// A leaf node with no content.
    pub fn leaf() -> Self {
        Self::default()
    }

    /// Set the content expression.
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    /// Set the group.
    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Declare an attribute with a default.
    pub fn with_attr(mut self, name: &str, default: Value) -> Self {
        self.attrs.insert(
            name.to_string(),
            AttrSpec {
                default: Some(default),
            },
        );
        self
    }

    /// Declare an attribute that must be supplied.
    pub fn with_required_attr(mut self, name: &str) -> Self {
        self.attrs
            .insert(name.to_string(), AttrSpec { default: None });
        self
    }

    /// Mark the node as inline.
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Mark the node as an atom.
    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }
}

/// An ordered set of node specs contributed by one party (e.g. the element plugin).
pub type SchemaFragment = IndexMap<String, NodeSpec>;

/// Uncompiled schema: node specs in declaration order plus the top node name.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSpec {
    /// Node specs, in declaration order.
    pub nodes: IndexMap<String, NodeSpec>,
    /// Name of the document node type.
    pub top_node: String,
}

impl SchemaSpec {
    /// Empty spec with the given top node name.
    pub fn new(top_node: &str) -> Self {
        Self {
            nodes: IndexMap::new(),
            top_node: top_node.to_string(),
        }
    }

    /// A small basic schema: `doc`, `paragraph`, `heading`, `blockquote`, `horizontal_rule`,
    /// `text`.
    pub fn basic() -> Self {
        let mut spec = Self::new("doc");
        spec.nodes
            .insert("doc".to_string(), NodeSpec::leaf().with_content("block+"));
        spec.nodes
            .insert("paragraph".to_string(), NodeSpec::block("inline*"));
        spec.nodes.insert(
            "heading".to_string(),
            NodeSpec::block("inline*").with_attr("level", Value::from(1)),
        );
        spec.nodes
            .insert("blockquote".to_string(), NodeSpec::block("block+"));
        spec.nodes.insert(
            "horizontal_rule".to_string(),
            NodeSpec::leaf().in_group("block"),
        );
        spec.nodes.insert(
            TEXT_NODE.to_string(),
            NodeSpec::leaf().in_group("inline").inline(),
        );
        spec
    }

    /// Add a node spec.
    pub fn add_node(&mut self, name: &str, spec: NodeSpec) -> Result<(), SchemaError> {
        if self.nodes.contains_key(name) {
            return Err(SchemaError::DuplicateNodeType(name.to_string()));
        }
        self.nodes.insert(name.to_string(), spec);
        Ok(())
    }

    /// Merge a fragment into this spec. Fragment nodes are appended after existing ones.
    pub fn append(&mut self, fragment: &SchemaFragment) -> Result<(), SchemaError> {
        for (name, spec) in fragment {
            self.add_node(name, spec.clone())?;
        }
        Ok(())
    }
}

/// One term of a compiled content expression.
#[derive(Debug, Clone, PartialEq)]
struct ContentTerm {
    choices: Vec<String>,
    min: usize,
    max: Option<usize>,
}

impl ContentTerm {
    fn accepts(&self, type_name: &str) -> bool {
        self.choices.iter().any(|c| c == type_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct NodeType {
    spec: NodeSpec,
    terms: Vec<ContentTerm>,
}

/// A compiled schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    types: IndexMap<String, NodeType>,
    top_node: String,
}

impl Schema {
    /// Compile a schema spec.
    pub fn new(spec: SchemaSpec) -> Result<Self, SchemaError> {
        if !spec.nodes.contains_key(&spec.top_node) {
            return Err(SchemaError::MissingTopNode(spec.top_node));
        }

        let mut types = IndexMap::with_capacity(spec.nodes.len());
        for (name, node_spec) in &spec.nodes {
            let terms = match &node_spec.content {
                Some(expr) => parse_content(name, expr, &spec.nodes)?,
                None => Vec::new(),
            };
            types.insert(
                name.clone(),
                NodeType {
                    spec: node_spec.clone(),
                    terms,
                },
            );
        }

        Ok(Self {
            types,
            top_node: spec.top_node,
        })
    }

    /// Name of the document node type.
    pub fn top_node(&self) -> &str {
        &self.top_node
    }

    /// Whether the schema declares a node type.
    pub fn has_node_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Spec of a node type.
    pub fn node_spec(&self, name: &str) -> Option<&NodeSpec> {
        self.types.get(name).map(|t| &t.spec)
    }

    /// Names of all node types, in declaration order.
    pub fn node_type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Whether nodes of this type are leaves.
    pub fn is_leaf(&self, name: &str) -> bool {
        self.node_spec(name).is_none_or(|s| s.content.is_none())
    }

    /// Whether nodes of this type hold inline content only (paragraph-like).
    pub fn is_textblock(&self, name: &str) -> bool {
        let Some(node_type) = self.types.get(name) else {
            return false;
        };
        node_type.spec.content.is_some()
            && !node_type.terms.is_empty()
            && node_type.terms.iter().all(|term| {
                term.choices
                    .iter()
                    .all(|c| self.node_spec(c).is_some_and(|s| s.inline))
            })
    }

    /// Fill in attribute defaults, dropping undeclared attributes.
    pub fn compute_attrs(&self, name: &str, given: &Attrs) -> Result<Attrs, SchemaError> {
        let node_type = self
            .types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_string()))?;
        let mut attrs = Attrs::new();
        for (attr, spec) in &node_type.spec.attrs {
            match given.get(attr).or(spec.default.as_ref()) {
                Some(value) => {
                    attrs.insert(attr.clone(), value.clone());
                }
                None => {
                    return Err(SchemaError::MissingAttribute {
                        node: name.to_string(),
                        attr: attr.clone(),
                    });
                }
            }
        }
        Ok(attrs)
    }

    /// Check that `content` is valid for a node of type `name`.
    pub fn check_content(&self, name: &str, content: &[Node]) -> Result<(), SchemaError> {
        let node_type = self
            .types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_string()))?;
        if matches_terms(&node_type.terms, content) {
            Ok(())
        } else {
            Err(SchemaError::InvalidContent {
                node: name.to_string(),
            })
        }
    }

    /// Check `node` and all of its descendants against their content expressions.
    pub fn check_node(&self, node: &Node) -> Result<(), SchemaError> {
        if node.is_text() {
            return Ok(());
        }
        if self.is_leaf(node.type_name()) {
            if !self.types.contains_key(node.type_name()) {
                return Err(SchemaError::UnknownNodeType(node.type_name().to_string()));
            }
            if node.child_count() > 0 {
                return Err(SchemaError::InvalidContent {
                    node: node.type_name().to_string(),
                });
            }
            return Ok(());
        }
        self.check_content(node.type_name(), node.content())?;
        node.content().iter().try_for_each(|child| self.check_node(child))
    }

    /// Create a node, validating attributes and content.
    pub fn node(&self, name: &str, attrs: &Attrs, content: Vec<Node>) -> Result<Node, SchemaError> {
        let attrs = self.compute_attrs(name, attrs)?;
        if self.is_leaf(name) {
            if !content.is_empty() {
                return Err(SchemaError::InvalidContent {
                    node: name.to_string(),
                });
            }
            return Ok(Node::leaf(name, attrs));
        }
        let node = Node::branch(name, attrs, content);
        self.check_content(name, node.content())?;
        Ok(node)
    }

    /// Create a text node.
    pub fn text(&self, text: impl Into<String>) -> Node {
        Node::text(text)
    }

    /// Create a node, synthesizing any required children missing from `content`.
    ///
    /// Returns `None` when the given content cannot be completed into valid content, or when
    /// a required child cannot itself be created (for instance because it has an attribute
    /// without a default).
    pub fn create_and_fill(&self, name: &str, attrs: Attrs, content: Vec<Node>) -> Option<Node> {
        self.fill_node(name, &attrs, content, 0)
    }

    fn fill_node(&self, name: &str, attrs: &Attrs, content: Vec<Node>, depth: usize) -> Option<Node> {
        if depth > MAX_FILL_DEPTH {
            return None;
        }
        let attrs = self.compute_attrs(name, attrs).ok()?;
        if self.is_leaf(name) {
            return content.is_empty().then(|| Node::leaf(name, attrs));
        }
        let node_type = self.types.get(name)?;
        let filled = self.fill_terms(&node_type.terms, content, depth)?;
        Some(Node::branch(name, attrs, filled))
    }

    fn fill_terms(&self, terms: &[ContentTerm], content: Vec<Node>, depth: usize) -> Option<Vec<Node>> {
        let mut out = Vec::with_capacity(content.len());
        let mut rest = content.into_iter().peekable();
        for term in terms {
            let mut count = 0;
            while term.max.is_none_or(|max| count < max)
                && rest.peek().is_some_and(|n| term.accepts(n.type_name()))
            {
                out.extend(rest.next());
                count += 1;
            }
            while count < term.min {
                let filler = term.choices.iter().find_map(|choice| {
                    if choice == TEXT_NODE {
                        return None;
                    }
                    self.fill_node(choice, &Attrs::new(), Vec::new(), depth + 1)
                })?;
                out.push(filler);
                count += 1;
            }
        }
        rest.peek().is_none().then_some(out)
    }
}

fn matches_terms(terms: &[ContentTerm], content: &[Node]) -> bool {
    let mut index = 0;
    for term in terms {
        let mut count = 0;
        while term.max.is_none_or(|max| count < max)
            && content
                .get(index)
                .is_some_and(|n| term.accepts(n.type_name()))
        {
            index += 1;
            count += 1;
        }
        if count < term.min {
            return false;
        }
    }
    index == content.len()
}

fn parse_content(
    node: &str,
    expr: &str,
    nodes: &IndexMap<String, NodeSpec>,
) -> Result<Vec<ContentTerm>, SchemaError> {
    let mut terms = Vec::new();
    for token in expr.split_whitespace() {
        let (name, min, max) = match token.as_bytes().last() {
            Some(b'*') => (&token[..token.len() - 1], 0, None),
            Some(b'+') => (&token[..token.len() - 1], 1, None),
            Some(b'?') => (&token[..token.len() - 1], 0, Some(1)),
            _ => (token, 1, Some(1)),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(SchemaError::InvalidContentExpression {
                node: node.to_string(),
                expr: expr.to_string(),
                message: format!("unexpected token '{token}'"),
            });
        }

        let choices: Vec<String> = if nodes.contains_key(name) {
            vec![name.to_string()]
        } else {
            nodes
                .iter()
                .filter(|(_, spec)| spec.group.as_deref() == Some(name))
                .map(|(n, _)| n.clone())
                .collect()
        };
        if choices.is_empty() {
            return Err(SchemaError::UnknownContentReference {
                node: node.to_string(),
                name: name.to_string(),
            });
        }
        terms.push(ContentTerm { choices, min, max });
    }
    Ok(terms)
}
