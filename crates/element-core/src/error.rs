//! Error taxonomy.
//!
//! Configuration mistakes (an element registry that disagrees with the host schema, a field
//! declared with a value of the wrong kind, ...) are reported as `Err` values and are meant for
//! developers. Validation problems are *not* errors in this sense: they travel as
//! [`ValidationError`](crate::ValidationError) data through the normal update path.

use thiserror::Error;

use crate::field::FieldKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while building or querying a [`Schema`](crate::Schema).
pub enum SchemaError {
    #[error("unknown node type '{0}'")]
    /// A node type name is not part of the schema.
    UnknownNodeType(String),

    #[error("node type '{0}' is declared twice")]
    /// Two node specs share a name.
    DuplicateNodeType(String),

    #[error("top node type '{0}' is not declared")]
    /// The schema's top node type is missing.
    MissingTopNode(String),

    #[error("invalid content expression '{expr}' for '{node}': {message}")]
    /// A content expression could not be parsed.
    InvalidContentExpression {
        /// Node type owning the expression.
        node: String,
        /// The expression source.
        expr: String,
        /// What went wrong.
        message: String,
    },

    #[error("content expression for '{node}' references unknown node or group '{name}'")]
    /// A content expression names neither a node type nor a group.
    UnknownContentReference {
        /// Node type owning the expression.
        node: String,
        /// The unresolved name.
        name: String,
    },

    #[error("missing required attribute '{attr}' for node type '{node}'")]
    /// An attribute without a default was not supplied.
    MissingAttribute {
        /// Node type being created.
        node: String,
        /// Attribute name.
        attr: String,
    },

    #[error("invalid content for node type '{node}'")]
    /// The children do not satisfy the node's content expression.
    InvalidContent {
        /// Node type whose content was rejected.
        node: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while building or applying document steps.
pub enum TransformError {
    #[error("position {pos} is out of range (content size {size})")]
    /// A position lies outside the document.
    OutOfRange {
        /// Offending position.
        pos: usize,
        /// Content size of the document.
        size: usize,
    },

    #[error("positions {from} and {to} do not share a parent")]
    /// A replace range crosses node boundaries.
    NotSameParent {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
    },

    #[error("invalid range {from}..{to}")]
    /// A range whose end precedes its start.
    InvalidRange {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
    },

    #[error("no node starts at position {0}")]
    /// A position does not point at the start of a non-text node.
    NoNodeAt(usize),

    #[error("nodes around position {0} cannot be joined")]
    /// The nodes on both sides of a position are not joinable.
    CannotJoin(usize),

    #[error("transaction was built against version {expected}, state is at {found}")]
    /// A transaction was created from a state that is no longer current.
    StaleTransaction {
        /// Version the transaction was created from.
        expected: u64,
        /// Current state version.
        found: u64,
    },

    #[error(transparent)]
    /// The resulting document violates the schema.
    Schema(#[from] SchemaError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Registration and build-time mistakes.
pub enum ConfigError {
    #[error("element name must not be empty")]
    /// An element was registered without a name.
    EmptyElementName,

    #[error("element '{0}' is registered twice")]
    /// Two elements share a name.
    DuplicateElement(String),

    #[error("{name} is not recognised. Only {known} can be added")]
    /// An insertion requested an element type that was never registered.
    UnknownElement {
        /// The requested element name.
        name: String,
        /// Comma-separated registered names.
        known: String,
    },

    #[error(
        "{0} is not included in the state schema. Did you add the schema fragment generated by this plugin to the schema?"
    )]
    /// The host schema lacks the element's node type.
    MissingNodeType(String),

    #[error("field '{field}' of element '{element}' has kind {kind:?} but a value of another kind")]
    /// A field's default value does not match its declared kind.
    FieldKindMismatch {
        /// Element name.
        element: String,
        /// Field name.
        field: String,
        /// Declared kind.
        kind: FieldKind,
    },

    #[error("dropdown field '{field}' of element '{element}' defaults to '{value}', which is not an option")]
    /// A dropdown default is missing from its option list.
    InvalidDropdownDefault {
        /// Element name.
        element: String,
        /// Field name.
        field: String,
        /// The default value.
        value: String,
    },

    #[error(
        "attempted to instantiate a nested editor for field '{field}' of element '{element}', but another instance with that name has already been created"
    )]
    /// Two child nodes of one element map to the same rich-text field.
    DuplicateNestedEditor {
        /// Element name.
        element: String,
        /// Field name.
        field: String,
    },

    #[error("regex compile error for pattern '{pattern}': {message}")]
    /// A `pattern` validator failed to compile.
    InvalidPattern {
        /// The regex pattern string.
        pattern: String,
        /// The compiler error message.
        message: String,
    },
}

#[derive(Debug, Error)]
/// Errors produced while encoding or decoding persisted documents.
pub enum SerializeError {
    #[error("JSON error: {0}")]
    /// JSON decoding failed.
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    /// The decoded node does not fit the schema.
    Schema(#[from] SchemaError),

    #[error("node JSON is missing '{0}'")]
    /// A required key is missing from a node object.
    MissingKey(&'static str),

    #[error("malformed node JSON: {0}")]
    /// A node object has the wrong shape.
    Malformed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors returned by the element API.
pub enum ElementError {
    #[error(transparent)]
    /// A configuration mistake.
    Config(#[from] ConfigError),

    #[error(transparent)]
    /// A document edit could not be built or applied.
    Transform(#[from] TransformError),

    #[error(transparent)]
    /// A schema lookup failed.
    Schema(#[from] SchemaError),

    #[error("element '{element}' has no field '{field}'")]
    /// A field name is not declared by the element.
    UnknownField {
        /// Element name.
        element: String,
        /// Field name.
        field: String,
    },

    #[error("field '{field}' expects a {expected:?} value")]
    /// A value of the wrong kind was supplied for a field.
    FieldValueMismatch {
        /// Field name.
        field: String,
        /// Declared kind.
        expected: FieldKind,
    },

    #[error("field '{0}' is not a rich-text field with a live nested editor")]
    /// A nested edit targeted a field without a nested editor.
    NotNested(String),

    #[error("no mounted element at position {0}")]
    /// No element controller is mounted at the position.
    NoElementAt(usize),

    #[error("element controller has been destroyed")]
    /// A callback reached a destroyed controller.
    Destroyed,
}
