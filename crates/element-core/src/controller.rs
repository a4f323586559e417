//! Element view controller.
//!
//! One [`ElementController`] is mounted per live element node. It owns the element's field
//! views, its nested child editors and its renderer, and mediates both update directions:
//!
//! - **downward** ([`ElementController::update`]): the document changed; push the node's values
//!   into every field view and forward child nodes and decoration slices to nested editors,
//! - **upward** ([`ElementController::input`], [`ElementController::edit_nested`]): a field
//!   emitted a value; merge it into the full value set, revalidate, and build exactly one
//!   transaction that rewrites the node in place.
//!
//! Lifecycle: `Mounting -> Live -> Destroyed`. A destroyed controller never emits again.

use crate::commands::{self, CommandAvailability};
use crate::compiler::{FIELDS_ATTR, element_attrs, stored_errors, stored_has_errors};
use crate::decorations::DecorationSet;
use crate::element::{ElementRenderer, ElementSpec, RenderContext, Validation};
use crate::error::{ConfigError, ElementError, SchemaError, TransformError};
use crate::field::{FieldValue, FieldValues};
use crate::field_view::{FieldViewState, create_field_view};
use crate::model::{Attrs, Node};
use crate::nested::{NestedEditor, edit_locally};
use crate::state::EditorState;
use crate::transform::Transaction;
use crate::validation::{FieldErrors, ValidationError};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Field views and nested editors are being created.
    Mounting,
    /// Mounted and receiving updates.
    Live,
    /// Torn down. Terminal.
    Destroyed,
}

/// Node type plus the types of its children. Controllers are only reused for nodes with the
/// signature they were mounted with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeSignature {
    node_type: String,
    children: Vec<String>,
}

impl ShapeSignature {
    /// Signature of `node`.
    pub fn of(node: &Node) -> Self {
        Self {
            node_type: node.type_name().to_string(),
            children: node
                .content()
                .iter()
                .map(|child| child.type_name().to_string())
                .collect(),
        }
    }
}

/// Live controller for one element node.
pub struct ElementController {
    spec: Arc<ElementSpec>,
    pos: usize,
    node: Node,
    signature: ShapeSignature,
    lifecycle: Lifecycle,
    values: FieldValues,
    validation: Validation,
    fields: IndexMap<String, FieldViewState>,
    nested: IndexMap<String, NestedEditor>,
    renderer: Box<dyn ElementRenderer>,
    commands: CommandAvailability,
}

impl ElementController {
    /// Mount a controller for `node`, which starts at `pos` in `state`'s document.
    pub fn mount(
        spec: Arc<ElementSpec>,
        node: &Node,
        pos: usize,
        state: &EditorState,
        decorations: &DecorationSet,
    ) -> Self {
        let values = spec.fields().from_storage(node);
        let validation = spec.validate(&values);

        let mut fields = IndexMap::new();
        for (name, field) in spec.fields().iter() {
            let value = values.get(name).unwrap_or(&field.spec.default_value);
            let mut view_state = FieldViewState::new(create_field_view(&field.spec, value));
            view_state.errors = validation.displayed.get(name).cloned().unwrap_or_default();
            fields.insert(name.to_string(), view_state);
        }

        let mut nested = IndexMap::new();
        for (offset, child) in node.children_with_offsets() {
            let Some(field) = spec.fields().child_field(child.type_name()) else {
                continue;
            };
            if nested.contains_key(field) {
                let err = ConfigError::DuplicateNestedEditor {
                    element: spec.name().to_string(),
                    field: field.to_string(),
                };
                tracing::error!(error = %err, "discarding duplicate nested editor");
                continue;
            }
            let slice = child_decorations(decorations, pos, offset, child);
            let editor = NestedEditor::open(Arc::clone(state.schema()), field, child, offset, slice);
            nested.insert(field.to_string(), editor);
        }

        let renderer = spec.renderer();
        let mut controller = Self {
            spec,
            pos,
            node: node.clone(),
            signature: ShapeSignature::of(node),
            lifecycle: Lifecycle::Mounting,
            values,
            validation,
            fields,
            nested,
            renderer,
            commands: commands::for_position(pos).availability(state),
        };

        controller.lifecycle = Lifecycle::Live;
        controller.render(true);
        tracing::debug!(element = controller.spec.name(), pos, "mounted element controller");
        controller
    }

    /// Element spec.
    pub fn spec(&self) -> &Arc<ElementSpec> {
        &self.spec
    }

    /// Element name.
    pub fn element(&self) -> &str {
        self.spec.name()
    }

    /// Position of the element node.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Node seen at the last mount or update.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Shape the controller was mounted with.
    pub fn signature(&self) -> &ShapeSignature {
        &self.signature
    }

    /// Lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Current field values.
    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Value held by a field view.
    pub fn field_value(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field).map(|state| state.view.value())
    }

    /// Errors displayed for a field.
    pub fn field_errors(&self, field: &str) -> &[ValidationError] {
        self.fields
            .get(field)
            .map(|state| state.errors.as_slice())
            .unwrap_or_default()
    }

    /// Latest validation result.
    pub fn validation(&self) -> &Validation {
        &self.validation
    }

    /// Whether any field currently carries an `ERROR`.
    pub fn has_errors(&self) -> bool {
        self.validation.has_errors
    }

    /// Nested editor of a rich-text field.
    pub fn nested(&self, field: &str) -> Option<&NestedEditor> {
        self.nested.get(field)
    }

    /// Number of nested editors.
    pub fn nested_count(&self) -> usize {
        self.nested.len()
    }

    /// Command availability computed at the last mount or update.
    pub fn commands(&self) -> CommandAvailability {
        self.commands
    }

    /// Downward update with the node now found at `pos`.
    ///
    /// Returns `false` when the node no longer has the mounted shape; the caller must then
    /// destroy this controller and mount a new one.
    pub fn update(
        &mut self,
        node: &Node,
        pos: usize,
        state: &EditorState,
        decorations: &DecorationSet,
    ) -> bool {
        if self.lifecycle != Lifecycle::Live {
            return false;
        }
        if ShapeSignature::of(node) != self.signature {
            tracing::debug!(
                element = self.spec.name(),
                pos,
                found = node.type_name(),
                "element shape changed, controller cannot be reused"
            );
            return false;
        }

        self.pos = pos;
        self.node = node.clone();
        self.values = self.spec.fields().from_storage(node);
        self.validation = self.spec.validate(&self.values);

        let mut changed = Vec::new();
        for (name, view_state) in &mut self.fields {
            if let Some(value) = self.values.get(name)
                && view_state.view.update(value)
            {
                changed.push(name.clone());
            }
            view_state.errors = self
                .validation
                .displayed
                .get(name)
                .cloned()
                .unwrap_or_default();
        }
        if !changed.is_empty() {
            tracing::trace!(element = self.spec.name(), pos, fields = ?changed, "pushed values into field views");
        }

        let mut seen = Vec::with_capacity(self.nested.len());
        for (offset, child) in node.children_with_offsets() {
            let Some(field) = self.spec.fields().child_field(child.type_name()) else {
                continue;
            };
            if seen.contains(&field) {
                continue;
            }
            seen.push(field);
            if let Some(editor) = self.nested.get_mut(field) {
                let slice = child_decorations(decorations, pos, offset, child);
                editor.update(child, offset, slice);
            }
        }

        self.commands = commands::for_position(pos).availability(state);
        self.render(false);
        true
    }

    /// Attributes correcting the stored validation result of the last seen node, or `None` when
    /// it already matches the freshly computed one.
    pub fn attr_correction(&self) -> Option<Attrs> {
        if self.lifecycle != Lifecycle::Live {
            return None;
        }
        let stored_ok = stored_has_errors(&self.node) == self.validation.has_errors
            && stored_errors(&self.node) == non_empty(&self.validation.displayed);
        if stored_ok {
            return None;
        }
        let fields = self
            .node
            .attr(FIELDS_ATTR)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Some(element_attrs(
            fields,
            &self.validation.displayed,
            self.validation.has_errors,
        ))
    }

    /// Upward update: a user edited `field`.
    ///
    /// Returns the transaction rewriting the node, or `None` when the field view did not emit or
    /// the node would not change.
    pub fn input(
        &mut self,
        state: &EditorState,
        field: &str,
        value: FieldValue,
    ) -> Result<Option<Transaction>, ElementError> {
        if self.lifecycle != Lifecycle::Live {
            return Err(ElementError::Destroyed);
        }
        let spec = Arc::clone(&self.spec);
        let declared = spec
            .fields()
            .field(field)
            .ok_or_else(|| ElementError::UnknownField {
                element: spec.name().to_string(),
                field: field.to_string(),
            })?;
        if value.kind() != declared.kind {
            return Err(ElementError::FieldValueMismatch {
                field: field.to_string(),
                expected: declared.kind,
            });
        }
        let view_state = self
            .fields
            .get_mut(field)
            .ok_or_else(|| ElementError::UnknownField {
                element: spec.name().to_string(),
                field: field.to_string(),
            })?;
        let Some(emitted) = view_state.view.input(value) else {
            tracing::trace!(element = spec.name(), field, "field view did not emit");
            return Ok(None);
        };

        let built = self.input_transaction(state, field, emitted);
        if !matches!(built, Ok(Some(_))) {
            self.resync_field(field);
        }
        built
    }

    /// Reset the view of `field` to the value last seen in the document. Used when an emitted
    /// value never reached the document.
    pub fn resync_field(&mut self, field: &str) {
        if let (Some(view_state), Some(value)) = (self.fields.get_mut(field), self.values.get(field))
            && view_state.view.update(value)
        {
            tracing::debug!(element = self.spec.name(), field, "field view reset to stored value");
        }
        if let Some(editor) = self.nested.get_mut(field)
            && let Some((offset, child)) = self
                .node
                .children_with_offsets()
                .find(|(_, child)| child.type_name() == editor.state().doc().type_name())
        {
            let decorations = editor.decorations().clone();
            editor.update(child, offset, decorations);
        }
    }

    fn input_transaction(
        &self,
        state: &EditorState,
        field: &str,
        emitted: FieldValue,
    ) -> Result<Option<Transaction>, ElementError> {
        let node = self.current_node(state)?;
        let mut values = self.spec.fields().from_storage(node);
        values.insert(field.to_string(), emitted.clone());

        let mut tr = state.tr();
        if let FieldValue::RichText(blocks) = emitted {
            self.replace_child(&mut tr, node, field, blocks)?;
        }
        self.rewrite_attrs(&mut tr, &values)?;
        Ok(self.finish(tr, field))
    }

    /// Upward update from a nested editor: run `edit` on the nested editor of `field`, then
    /// patch the child node and the element's validation attributes in one transaction.
    pub fn edit_nested<F>(
        &mut self,
        state: &EditorState,
        field: &str,
        edit: F,
    ) -> Result<Option<Transaction>, ElementError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), TransformError>,
    {
        if self.lifecycle != Lifecycle::Live {
            return Err(ElementError::Destroyed);
        }
        let editor = self
            .nested
            .get_mut(field)
            .ok_or_else(|| ElementError::NotNested(field.to_string()))?;
        let offset = editor.offset();
        let Some(child) = edit_locally(editor, edit)? else {
            return Ok(None);
        };

        let built = self.nested_transaction(state, field, offset, child);
        if !matches!(built, Ok(Some(_))) {
            self.resync_field(field);
        }
        built
    }

    fn nested_transaction(
        &self,
        state: &EditorState,
        field: &str,
        offset: usize,
        child: Node,
    ) -> Result<Option<Transaction>, ElementError> {
        let node = self.current_node(state)?;
        let child_pos = self.pos + 1 + offset;
        let old = state
            .doc()
            .node_at(child_pos)
            .filter(|n| n.type_name() == child.type_name())
            .ok_or(TransformError::NoNodeAt(child_pos))?;

        let mut tr = state.tr();
        tr.replace_with(child_pos, child_pos + old.node_size(), vec![child])?;
        let node_after = tr.doc().node_at(self.pos).unwrap_or(node);
        let values = self.spec.fields().from_storage(node_after);
        self.rewrite_attrs(&mut tr, &values)?;
        Ok(self.finish(tr, field))
    }

    /// Tear down field views, nested editors and the renderer. Idempotent.
    pub fn destroy(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        for view_state in self.fields.values_mut() {
            view_state.view.destroy();
        }
        for editor in self.nested.values_mut() {
            editor.close();
        }
        self.renderer.destroy();
        self.lifecycle = Lifecycle::Destroyed;
        tracing::debug!(element = self.spec.name(), pos = self.pos, "destroyed element controller");
    }

    fn current_node<'s>(&self, state: &'s EditorState) -> Result<&'s Node, ElementError> {
        state
            .doc()
            .node_at(self.pos)
            .filter(|node| node.type_name() == self.spec.name())
            .ok_or(ElementError::NoElementAt(self.pos))
    }

    fn replace_child(
        &self,
        tr: &mut Transaction,
        node: &Node,
        field: &str,
        blocks: Vec<Node>,
    ) -> Result<(), ElementError> {
        let Some((offset, child)) = node
            .children_with_offsets()
            .find(|(_, child)| self.spec.fields().child_field(child.type_name()) == Some(field))
        else {
            return Err(ElementError::NotNested(field.to_string()));
        };
        let replacement = if blocks.is_empty() {
            tr.schema()
                .create_and_fill(child.type_name(), Attrs::new(), Vec::new())
                .ok_or_else(|| SchemaError::InvalidContent {
                    node: child.type_name().to_string(),
                })?
        } else {
            let replacement = child.with_content(blocks);
            tr.schema().check_node(&replacement)?;
            replacement
        };
        let child_pos = self.pos + 1 + offset;
        tr.replace_with(child_pos, child_pos + child.node_size(), vec![replacement])?;
        Ok(())
    }

    fn rewrite_attrs(&self, tr: &mut Transaction, values: &FieldValues) -> Result<(), ElementError> {
        let (attrs, _) = self.spec.storage(values);
        tr.set_node_markup(self.pos, None, attrs)?;
        Ok(())
    }

    fn finish(&self, tr: Transaction, field: &str) -> Option<Transaction> {
        if tr.doc_changed() {
            Some(tr)
        } else {
            tracing::debug!(element = self.spec.name(), field, "suppressed no-op upward edit");
            None
        }
    }

    fn render(&mut self, mount: bool) {
        let ctx = RenderContext {
            element: self.spec.name(),
            pos: self.pos,
            values: &self.values,
            errors: &self.validation.displayed,
            has_errors: self.validation.has_errors,
            commands: self.commands,
        };
        if mount {
            self.renderer.mount(&ctx);
        } else {
            self.renderer.update(&ctx);
        }
    }
}

impl Drop for ElementController {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for ElementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementController")
            .field("element", &self.spec.name())
            .field("pos", &self.pos)
            .field("lifecycle", &self.lifecycle)
            .field("fields", &self.fields)
            .field("nested", &self.nested.keys().collect::<Vec<_>>())
            .field("commands", &self.commands)
            .finish()
    }
}

/// Decorations inside `child`'s content, shifted into its own coordinates.
fn child_decorations(
    decorations: &DecorationSet,
    element_pos: usize,
    offset: usize,
    child: &Node,
) -> DecorationSet {
    let content_start = element_pos + 1 + offset + 1;
    decorations.slice(content_start, content_start + child.content_size())
}

fn non_empty(errors: &FieldErrors) -> FieldErrors {
    errors
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(field, list)| (field.clone(), list.clone()))
        .collect()
}
