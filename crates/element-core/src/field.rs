//! Field declarations and values.
//!
//! A [`FieldSpec`] declares one field of an element: its [`FieldKind`], validators, default
//! value, omission rule and kind-specific options. Specs are immutable once the element is
//! registered.

use crate::field_view::FieldViewFactory;
use crate::model::Node;
use crate::validation::Validator;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of a field, which decides how it is stored and which view edits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Plain text, stored as an attribute.
    Text,
    /// Rich text, stored as a child node with its own nested editor.
    RichText,
    /// A boolean, stored as an attribute.
    Checkbox,
    /// One choice out of a fixed option list, stored as an attribute.
    Dropdown,
    /// Arbitrary JSON, stored as an attribute.
    Custom,
}

impl FieldKind {
    /// Whether values of this kind live in a child node rather than in attributes.
    pub fn is_structural(self) -> bool {
        self == FieldKind::RichText
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain text.
    Text(String),
    /// Rich text: the block content of the field's child node.
    RichText(Vec<Node>),
    /// Checkbox state.
    Bool(bool),
    /// Selected dropdown value.
    Choice(String),
    /// Custom JSON value.
    Custom(Value),
}

impl FieldValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::RichText(_) => FieldKind::RichText,
            FieldValue::Bool(_) => FieldKind::Checkbox,
            FieldValue::Choice(_) => FieldKind::Dropdown,
            FieldValue::Custom(_) => FieldKind::Custom,
        }
    }

    /// Whether this is the empty sentinel of its kind.
    ///
    /// Empty text, rich text without any text, an empty choice and JSON `null` are empty. A
    /// checkbox is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) | FieldValue::Choice(text) => text.is_empty(),
            FieldValue::RichText(blocks) => blocks.iter().all(|b| b.text_content().is_empty()),
            FieldValue::Bool(_) => false,
            FieldValue::Custom(value) => value.is_null(),
        }
    }

    /// Text seen by validators. Rich-text blocks are joined with newlines, a checked checkbox
    /// reads `"true"` and an unchecked one reads empty.
    pub fn plain_text(&self) -> String {
        match self {
            FieldValue::Text(text) | FieldValue::Choice(text) => text.clone(),
            FieldValue::RichText(blocks) => blocks
                .iter()
                .map(Node::text_content)
                .collect::<Vec<_>>()
                .join("\n"),
            FieldValue::Bool(true) => "true".to_string(),
            FieldValue::Bool(false) => String::new(),
            FieldValue::Custom(Value::String(text)) => text.clone(),
            FieldValue::Custom(Value::Null) => String::new(),
            FieldValue::Custom(value) => value.to_string(),
        }
    }

    /// JSON form of a scalar value. Rich text has none.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            FieldValue::Text(text) | FieldValue::Choice(text) => Some(Value::String(text.clone())),
            FieldValue::Bool(value) => Some(Value::Bool(*value)),
            FieldValue::Custom(value) => Some(value.clone()),
            FieldValue::RichText(_) => None,
        }
    }

    /// Read a scalar value of `kind` from JSON. Returns `None` for a value of the wrong shape.
    pub fn from_json(kind: FieldKind, value: &Value) -> Option<FieldValue> {
        match (kind, value) {
            (FieldKind::Text, Value::String(text)) => Some(FieldValue::Text(text.clone())),
            (FieldKind::Dropdown, Value::String(text)) => Some(FieldValue::Choice(text.clone())),
            (FieldKind::Checkbox, Value::Bool(value)) => Some(FieldValue::Bool(*value)),
            (FieldKind::Custom, value) => Some(FieldValue::Custom(value.clone())),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Field values keyed by field name, in declaration order.
pub type FieldValues = IndexMap<String, FieldValue>;

/// Field declarations keyed by field name. Declaration order decides child-node order.
pub type FieldSpecs = IndexMap<String, FieldSpec>;

/// One option of a dropdown field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    /// Label shown to the user.
    pub text: String,
    /// Stored value.
    pub value: String,
}

impl DropdownOption {
    /// Create an option.
    pub fn new(text: &str, value: &str) -> Self {
        Self {
            text: text.to_string(),
            value: value.to_string(),
        }
    }
}

/// Declaration of one element field.
#[derive(Clone)]
pub struct FieldSpec {
    /// Field kind.
    pub kind: FieldKind,
    /// Validators, run in declaration order.
    pub validators: Vec<Validator>,
    /// Value used when the field is missing from storage.
    pub default_value: FieldValue,
    /// Omit the field from storage when its value is empty.
    pub absent_on_empty: bool,
    /// Placeholder text for text-like views.
    pub placeholder: Option<String>,
    /// Visible rows for multi-line text views.
    pub rows: Option<u32>,
    /// Options of a dropdown field.
    pub options: Vec<DropdownOption>,
    /// Content expression of a rich-text field's child node.
    pub content: String,
    /// Replaces the built-in field view.
    pub view_factory: Option<FieldViewFactory>,
}

impl FieldSpec {
    fn with_kind(kind: FieldKind, default_value: FieldValue) -> Self {
        Self {
            kind,
            validators: Vec::new(),
            default_value,
            absent_on_empty: false,
            placeholder: None,
            rows: None,
            options: Vec::new(),
            content: "paragraph+".to_string(),
            view_factory: None,
        }
    }

    /// A plain-text field defaulting to the empty string.
    pub fn text() -> Self {
        Self::with_kind(FieldKind::Text, FieldValue::Text(String::new()))
    }

    /// A rich-text field whose child node holds `paragraph+`.
    pub fn rich_text() -> Self {
        Self::with_kind(FieldKind::RichText, FieldValue::RichText(Vec::new()))
    }

    /// A checkbox field.
    pub fn checkbox(default: bool) -> Self {
        Self::with_kind(FieldKind::Checkbox, FieldValue::Bool(default))
    }

    /// A dropdown field.
    pub fn dropdown(default: &str, options: Vec<DropdownOption>) -> Self {
        Self {
            options,
            ..Self::with_kind(FieldKind::Dropdown, FieldValue::Choice(default.to_string()))
        }
    }

    /// A field holding arbitrary JSON.
    pub fn custom(default: Value) -> Self {
        Self::with_kind(FieldKind::Custom, FieldValue::Custom(default))
    }

    /// Append a validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Omit the field from storage when empty.
    pub fn absent_on_empty(mut self) -> Self {
        self.absent_on_empty = true;
        self
    }

    /// Replace the default value.
    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default_value = value;
        self
    }

    /// Set the placeholder.
    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    /// Set the visible row count.
    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Set the content expression of a rich-text field.
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    /// Use a custom field view.
    pub fn with_view(mut self, factory: FieldViewFactory) -> Self {
        self.view_factory = Some(factory);
        self
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("kind", &self.kind)
            .field("validators", &self.validators.len())
            .field("default_value", &self.default_value)
            .field("absent_on_empty", &self.absent_on_empty)
            .field("placeholder", &self.placeholder)
            .field("rows", &self.rows)
            .field("options", &self.options)
            .field("content", &self.content)
            .field("custom_view", &self.view_factory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Attrs;

    #[test]
    fn emptiness_per_kind() {
        assert!(FieldValue::Text(String::new()).is_empty());
        assert!(!FieldValue::Bool(false).is_empty());
        assert!(FieldValue::Custom(Value::Null).is_empty());
        let blank = Node::branch("paragraph", Attrs::new(), vec![]);
        assert!(FieldValue::RichText(vec![blank]).is_empty());
    }

    #[test]
    fn scalar_json_respects_kind() {
        let json = Value::from("b");
        assert_eq!(
            FieldValue::from_json(FieldKind::Dropdown, &json),
            Some(FieldValue::Choice("b".into()))
        );
        assert_eq!(FieldValue::from_json(FieldKind::Checkbox, &json), None);
        assert_eq!(FieldValue::RichText(vec![]).to_json(), None);
    }
}
