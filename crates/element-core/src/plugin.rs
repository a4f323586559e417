//! Element plugin: registry, aggregate error state and insertion.
//!
//! The plugin is built once from the registered [`ElementSpec`]s and is immutable afterwards.
//! It contributes a schema fragment, which must be merged into the host schema before any
//! document containing elements is parsed, and derives [`PluginState`] from every document.
//!
//! # Example
//!
//! ```rust
//! use element_core::{
//!     EditorState, ElementPluginBuilder, ElementSpec, FieldSpec, FieldSpecs, FieldValues, Schema,
//!     SchemaSpec,
//! };
//! use std::sync::Arc;
//!
//! let mut fields = FieldSpecs::new();
//! fields.insert("caption".into(), FieldSpec::text());
//! let plugin = ElementPluginBuilder::new()
//!     .element(ElementSpec::new("image", fields).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut spec = SchemaSpec::basic();
//! plugin.extend_schema(&mut spec).unwrap();
//! let state = EditorState::empty(Arc::new(Schema::new(spec).unwrap())).unwrap();
//!
//! let mut dispatched = Vec::new();
//! let inserted = plugin
//!     .insert_element("image", &FieldValues::new(), &state, Some(&mut |tr| dispatched.push(tr)))
//!     .unwrap();
//! assert!(inserted);
//! let next = state.apply(&dispatched[0]).unwrap();
//! assert!(!plugin.state_for(next.doc()).has_errors);
//! ```

use crate::builder::build_element_node;
use crate::commands::Dispatch;
use crate::compiler::{stored_errors, stored_has_errors};
use crate::decorations::{DecorationSet, DecorationSource};
use crate::element::ElementSpec;
use crate::error::{ConfigError, ElementError, SchemaError};
use crate::field::FieldValues;
use crate::model::Node;
use crate::schema::{Schema, SchemaFragment, SchemaSpec};
use crate::state::EditorState;
use crate::transform::Transaction;
use crate::validation::ValidationError;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// One displayed validation error found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementIssue {
    /// Element name.
    pub element: String,
    /// Position of the element node.
    pub pos: usize,
    /// Field name.
    pub field: String,
    /// The error.
    pub error: ValidationError,
}

/// Document-wide error state, derived from the element nodes of a document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PluginState {
    /// Whether any element node has `hasErrors` set.
    pub has_errors: bool,
    /// Every displayed error, in document order.
    pub issues: Vec<ElementIssue>,
}

/// Field values of one element, detached from the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Element name.
    pub element_name: String,
    /// Field values with defaults applied.
    pub values: FieldValues,
}

/// Collects element specs and options before building an [`ElementPlugin`].
#[derive(Default)]
pub struct ElementPluginBuilder {
    elements: Vec<ElementSpec>,
    decorations: Option<DecorationSource>,
}

impl ElementPluginBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element.
    pub fn element(mut self, spec: ElementSpec) -> Self {
        self.elements.push(spec);
        self
    }

    /// Set the decoration source consulted after every transaction.
    pub fn decorations(mut self, source: DecorationSource) -> Self {
        self.decorations = Some(source);
        self
    }

    /// Validate the registry and build the plugin.
    pub fn build(self) -> Result<ElementPlugin, ConfigError> {
        let mut elements = IndexMap::with_capacity(self.elements.len());
        for spec in self.elements {
            if spec.name().is_empty() {
                return Err(ConfigError::EmptyElementName);
            }
            if elements.contains_key(spec.name()) {
                let err = ConfigError::DuplicateElement(spec.name().to_string());
                tracing::error!(error = %err, "invalid element registry");
                return Err(err);
            }
            elements.insert(spec.name().to_string(), Arc::new(spec));
        }
        Ok(ElementPlugin {
            elements,
            decorations: self.decorations,
        })
    }
}

/// The built element plugin.
#[derive(Clone)]
pub struct ElementPlugin {
    elements: IndexMap<String, Arc<ElementSpec>>,
    decorations: Option<DecorationSource>,
}

impl ElementPlugin {
    /// Node specs for every element and its rich-text children.
    pub fn schema_fragment(&self) -> SchemaFragment {
        self.elements
            .values()
            .flat_map(|spec| spec.fields().schema_fragment())
            .collect()
    }

    /// Merge [`ElementPlugin::schema_fragment`] into a host schema spec.
    pub fn extend_schema(&self, spec: &mut SchemaSpec) -> Result<(), SchemaError> {
        spec.append(&self.schema_fragment())
    }

    /// Check that `schema` declares every element node type.
    pub fn check_schema(&self, schema: &Schema) -> Result<(), ConfigError> {
        match self.elements.keys().find(|name| !schema.has_node_type(name)) {
            Some(name) => {
                let err = ConfigError::MissingNodeType(name.clone());
                tracing::error!(error = %err, "element plugin does not match the schema");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Registered element names, in registration order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Look up an element.
    pub fn element(&self, name: &str) -> Option<&Arc<ElementSpec>> {
        self.elements.get(name)
    }

    /// Whether `node` is a registered element node.
    pub fn is_element(&self, node: &Node) -> bool {
        self.elements.contains_key(node.type_name())
    }

    /// Plugin state for a fresh editor state.
    pub fn init(&self, state: &EditorState) -> PluginState {
        self.state_for(state.doc())
    }

    /// Plugin state after a transaction. Always a full rescan of the new document.
    pub fn apply(&self, _tr: &Transaction, new_state: &EditorState) -> PluginState {
        self.state_for(new_state.doc())
    }

    /// Scan every node of `doc` and aggregate element errors.
    pub fn state_for(&self, doc: &Node) -> PluginState {
        let mut state = PluginState::default();
        doc.descendants(&mut |node, pos, _| {
            if !self.is_element(node) {
                return true;
            }
            state.has_errors |= stored_has_errors(node);
            for (field, errors) in stored_errors(node) {
                state.issues.extend(errors.into_iter().map(|error| ElementIssue {
                    element: node.type_name().to_string(),
                    pos,
                    field: field.clone(),
                    error,
                }));
            }
            false
        });
        state
    }

    /// Decorations for `state`, or the empty set without a decoration source.
    pub fn decorations(&self, state: &EditorState) -> DecorationSet {
        match &self.decorations {
            Some(source) => source(state),
            None => DecorationSet::empty(),
        }
    }

    /// Insert a new element in place of the selection.
    ///
    /// Fails with a configuration error when `name` is not registered or the state's schema
    /// lacks its node type. Returns `Ok(false)` without dispatching when the element node cannot
    /// be filled. With `dispatch == None` only checks that the insertion would succeed.
    pub fn insert_element(
        &self,
        name: &str,
        values: &FieldValues,
        state: &EditorState,
        dispatch: Dispatch<'_>,
    ) -> Result<bool, ElementError> {
        let Some(spec) = self.elements.get(name) else {
            let err = ConfigError::UnknownElement {
                name: name.to_string(),
                known: self.element_names().collect::<Vec<_>>().join(", "),
            };
            tracing::error!(error = %err, "rejected element insertion");
            return Err(err.into());
        };
        if !state.schema().has_node_type(name) {
            let err = ConfigError::MissingNodeType(name.to_string());
            tracing::error!(error = %err, "rejected element insertion");
            return Err(err.into());
        }

        let Some(node) = build_element_node(state.schema(), spec, values) else {
            tracing::warn!(element = name, "abandoned element insertion");
            return Ok(false);
        };
        let mut tr = state.tr();
        tr.replace_selection_with(node)?;
        if let Some(dispatch) = dispatch {
            dispatch(tr);
        }
        Ok(true)
    }

    /// Read the element data held by an element node.
    pub fn element_data_from_node(&self, node: &Node) -> Option<ElementData> {
        let spec = self.elements.get(node.type_name())?;
        Some(ElementData {
            element_name: spec.name().to_string(),
            values: spec.fields().from_storage(node),
        })
    }

    /// Build an element node from detached element data.
    pub fn node_from_element_data(&self, data: &ElementData, schema: &Schema) -> Option<Node> {
        let spec = self.elements.get(&data.element_name)?;
        build_element_node(schema, spec, &data.values)
    }
}

impl fmt::Debug for ElementPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementPlugin")
            .field("elements", &self.elements.keys().collect::<Vec<_>>())
            .field("decorations", &self.decorations.is_some())
            .finish()
    }
}

impl fmt::Debug for ElementPluginBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementPluginBuilder")
            .field("elements", &self.elements)
            .field("decorations", &self.decorations.is_some())
            .finish()
    }
}
