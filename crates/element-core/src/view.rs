//! Editor view: the host-side dispatch loop.
//!
//! [`EditorView`] owns the current [`EditorState`], the element plugin, one
//! [`ElementController`] per element node, the undo history and the change subscribers.
//!
//! # Reconciliation
//!
//! After every applied transaction the view:
//!
//! 1. maps each controller's position through the transaction,
//! 2. updates controllers whose node survived; a controller that refuses the update (different
//!    shape) is destroyed and its position remounted,
//! 3. parks controllers whose node was replaced, reusing one for an identical node of the same
//!    element that now sits elsewhere (a moved node) and destroying the rest,
//! 4. mounts controllers for element nodes still without one,
//! 5. recomputes [`PluginState`],
//! 6. notifies subscribers,
//! 7. dispatches attribute corrections for controllers whose stored validation result is stale,
//!    appended to the previous undo group.
//!
//! # Example
//!
//! ```rust
//! use element_core::{
//!     EditorState, EditorView, ElementPluginBuilder, ElementSpec, FieldSpec, FieldSpecs,
//!     FieldValue, FieldValues, HistoryConfig, Schema, SchemaSpec, required,
//! };
//! use std::sync::Arc;
//!
//! let mut fields = FieldSpecs::new();
//! fields.insert("src".into(), FieldSpec::text().with_validator(required("Source is required")));
//! let plugin = ElementPluginBuilder::new()
//!     .element(ElementSpec::new("embed", fields).unwrap())
//!     .build()
//!     .unwrap();
//! let mut spec = SchemaSpec::basic();
//! plugin.extend_schema(&mut spec).unwrap();
//! let state = EditorState::empty(Arc::new(Schema::new(spec).unwrap())).unwrap();
//!
//! let mut view = EditorView::new(state, plugin, HistoryConfig::default()).unwrap();
//! view.insert_element("embed", &FieldValues::new()).unwrap();
//! assert!(view.plugin_state().has_errors);
//!
//! view.update_field(0, "src", FieldValue::from("https://example.com")).unwrap();
//! assert!(!view.plugin_state().has_errors);
//!
//! view.undo().unwrap();
//! assert!(view.plugin_state().has_errors);
//! ```

use crate::commands::{self, ElementCommand};
use crate::controller::ElementController;
use crate::decorations::DecorationSet;
use crate::error::{ConfigError, ElementError, TransformError};
use crate::field::{FieldValue, FieldValues};
use crate::history::{History, HistoryConfig};
use crate::model::{Attrs, Node};
use crate::plugin::{ElementPlugin, PluginState};
use crate::state::{EditorState, Selection};
use crate::transform::{HistoryMode, Transaction};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum rounds of attribute corrections dispatched after one transaction.
const MAX_CORRECTION_ROUNDS: usize = 1;

/// Kind of state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeType {
    /// The document changed.
    DocumentModified,
    /// Only the selection changed.
    SelectionChanged,
}

/// A state change delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// Change type.
    pub change_type: StateChangeType,
    /// Version before the change.
    pub old_version: u64,
    /// Version after the change.
    pub new_version: u64,
    /// Aggregate error flag after the change.
    pub has_errors: bool,
}

/// State change callback.
pub type StateChangeCallback = Box<dyn FnMut(&StateChange) + Send>;

/// Host-side view over an editor state with mounted element controllers.
pub struct EditorView {
    state: EditorState,
    plugin: ElementPlugin,
    plugin_state: PluginState,
    decorations: DecorationSet,
    controllers: BTreeMap<usize, ElementController>,
    history: History,
    callbacks: Vec<StateChangeCallback>,
}

impl EditorView {
    /// Create a view and mount controllers for every element in `state`.
    ///
    /// Elements whose stored validation result is stale are corrected without an undo step.
    pub fn new(
        state: EditorState,
        plugin: ElementPlugin,
        history: HistoryConfig,
    ) -> Result<Self, ConfigError> {
        plugin.check_schema(state.schema())?;
        let plugin_state = plugin.init(&state);
        let decorations = plugin.decorations(&state);
        let mut view = Self {
            state,
            plugin,
            plugin_state,
            decorations,
            controllers: BTreeMap::new(),
            history: History::new(history),
            callbacks: Vec::new(),
        };
        view.mount_missing(Vec::new());

        let corrections = view.corrections();
        if let Err(err) = view.dispatch_corrections(corrections, HistoryMode::Skip, 0) {
            tracing::warn!(error = %err, "could not correct stored element errors");
        }
        Ok(view)
    }

    /// Current state.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Element plugin.
    pub fn plugin(&self) -> &ElementPlugin {
        &self.plugin
    }

    /// Current aggregate error state.
    pub fn plugin_state(&self) -> &PluginState {
        &self.plugin_state
    }

    /// Decorations computed for the current state.
    pub fn decorations(&self) -> &DecorationSet {
        &self.decorations
    }

    /// Undo history.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Controller mounted at `pos`.
    pub fn controller(&self, pos: usize) -> Option<&ElementController> {
        self.controllers.get(&pos)
    }

    /// Mounted controllers in document order.
    pub fn controllers(&self) -> impl Iterator<Item = &ElementController> {
        self.controllers.values()
    }

    /// Subscribe to state changes.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Apply a transaction created from the current state.
    pub fn dispatch(&mut self, tr: Transaction) -> Result<(), ElementError> {
        self.apply_and_reconcile(tr, 0)
    }

    /// Set the selection.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), ElementError> {
        let mut tr = self.state.tr();
        tr.set_selection(selection.clamp(self.state.doc().content_size()));
        self.dispatch(tr)
    }

    /// User edit of a field of the element at `pos`. Returns whether a transaction was
    /// dispatched.
    pub fn update_field(
        &mut self,
        pos: usize,
        field: &str,
        value: FieldValue,
    ) -> Result<bool, ElementError> {
        let controller = self
            .controllers
            .get_mut(&pos)
            .ok_or(ElementError::NoElementAt(pos))?;
        match controller.input(&self.state, field, value)? {
            Some(tr) => self.dispatch_field_edit(pos, field, tr),
            None => Ok(false),
        }
    }

    /// Edit the nested editor of rich-text `field` of the element at `pos`. Returns whether a
    /// transaction was dispatched.
    pub fn edit_nested<F>(&mut self, pos: usize, field: &str, edit: F) -> Result<bool, ElementError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), TransformError>,
    {
        let controller = self
            .controllers
            .get_mut(&pos)
            .ok_or(ElementError::NoElementAt(pos))?;
        match controller.edit_nested(&self.state, field, edit)? {
            Some(tr) => self.dispatch_field_edit(pos, field, tr),
            None => Ok(false),
        }
    }

    fn dispatch_field_edit(
        &mut self,
        pos: usize,
        field: &str,
        tr: Transaction,
    ) -> Result<bool, ElementError> {
        match self.dispatch(tr) {
            Ok(()) => Ok(true),
            Err(err) => {
                if let Some(controller) = self.controllers.get_mut(&pos) {
                    controller.resync_field(field);
                }
                Err(err)
            }
        }
    }

    /// Insert a new element in place of the selection.
    pub fn insert_element(&mut self, name: &str, values: &FieldValues) -> Result<bool, ElementError> {
        let mut built = None;
        let inserted =
            self.plugin
                .insert_element(name, values, &self.state, Some(&mut |tr| built = Some(tr)))?;
        match built {
            Some(tr) if inserted => self.dispatch(tr).map(|()| true),
            _ => Ok(false),
        }
    }

    /// Whether `command` applies to the element at `pos`.
    pub fn can_run(&self, pos: usize, command: ElementCommand) -> bool {
        commands::for_position(pos).run(command, &self.state, None)
    }

    /// Run a structural command on the node at `pos`. Returns whether it applied.
    pub fn run_command(&mut self, pos: usize, command: ElementCommand) -> Result<bool, ElementError> {
        let mut built = None;
        commands::for_position(pos).run(command, &self.state, Some(&mut |tr| built = Some(tr)));
        match built {
            Some(tr) => self.dispatch(tr).map(|()| true),
            None => Ok(false),
        }
    }

    /// Undo the most recent history group. Returns whether anything was undone.
    pub fn undo(&mut self) -> Result<bool, ElementError> {
        match self.history.undo(&self.state)? {
            Some(tr) => self.dispatch(tr).map(|()| true),
            None => Ok(false),
        }
    }

    /// Redo the most recently undone group. Returns whether anything was redone.
    pub fn redo(&mut self) -> Result<bool, ElementError> {
        match self.history.redo(&self.state)? {
            Some(tr) => self.dispatch(tr).map(|()| true),
            None => Ok(false),
        }
    }

    fn apply_and_reconcile(&mut self, tr: Transaction, round: usize) -> Result<(), ElementError> {
        let selection_before = self.state.selection();
        let next = self.state.apply(&tr)?;
        self.history.record(&tr, selection_before);

        let old_version = self.state.version();
        self.state = next;
        self.decorations = self.plugin.decorations(&self.state);
        if tr.doc_changed() {
            self.reconcile(&tr);
        }
        self.plugin_state = self.plugin.apply(&tr, &self.state);

        let change = StateChange {
            change_type: if tr.doc_changed() {
                StateChangeType::DocumentModified
            } else {
                StateChangeType::SelectionChanged
            },
            old_version,
            new_version: self.state.version(),
            has_errors: self.plugin_state.has_errors,
        };
        for callback in &mut self.callbacks {
            callback(&change);
        }

        let corrections = self.corrections();
        let mode = match tr.history_mode() {
            HistoryMode::Skip => HistoryMode::Skip,
            HistoryMode::NewGroup | HistoryMode::AppendToLast => HistoryMode::AppendToLast,
        };
        self.dispatch_corrections(corrections, mode, round)
    }

    fn reconcile(&mut self, tr: &Transaction) {
        let old = std::mem::take(&mut self.controllers);
        let mut parked = Vec::new();

        for (pos, mut controller) in old {
            let size = controller.node().node_size();
            let Some(new_pos) = tr.mapping().map_node(pos, size) else {
                parked.push(controller);
                continue;
            };
            let Some(node) = self
                .state
                .doc()
                .node_at(new_pos)
                .filter(|node| self.plugin.is_element(node))
            else {
                controller.destroy();
                continue;
            };
            if self.controllers.contains_key(&new_pos) {
                controller.destroy();
                continue;
            }
            if controller.update(node, new_pos, &self.state, &self.decorations) {
                self.controllers.insert(new_pos, controller);
            } else {
                tracing::debug!(pos = new_pos, "remounting element controller");
                controller.destroy();
            }
        }

        self.mount_missing(parked);
    }

    /// Mount a controller for every element node without one, reusing parked controllers for
    /// identical nodes. Unused parked controllers are destroyed.
    fn mount_missing(&mut self, mut parked: Vec<ElementController>) {
        let mut missing: Vec<(usize, Node)> = Vec::new();
        self.state.doc().descendants(&mut |node, pos, _| {
            if !self.plugin.is_element(node) {
                return true;
            }
            if !self.controllers.contains_key(&pos) {
                missing.push((pos, node.clone()));
            }
            false
        });

        for (pos, node) in missing {
            let reusable = parked
                .iter()
                .position(|c| c.element() == node.type_name() && c.node() == &node);
            if let Some(index) = reusable {
                let mut controller = parked.swap_remove(index);
                if controller.update(&node, pos, &self.state, &self.decorations) {
                    tracing::debug!(pos, element = node.type_name(), "reused moved element controller");
                    self.controllers.insert(pos, controller);
                    continue;
                }
                controller.destroy();
            }
            let Some(spec) = self.plugin.element(node.type_name()).cloned() else {
                continue;
            };
            let controller =
                ElementController::mount(spec, &node, pos, &self.state, &self.decorations);
            self.controllers.insert(pos, controller);
        }

        for mut controller in parked {
            controller.destroy();
        }
    }

    fn corrections(&self) -> Vec<(usize, Attrs)> {
        self.controllers
            .iter()
            .filter_map(|(pos, controller)| controller.attr_correction().map(|attrs| (*pos, attrs)))
            .collect()
    }

    fn dispatch_corrections(
        &mut self,
        corrections: Vec<(usize, Attrs)>,
        mode: HistoryMode,
        round: usize,
    ) -> Result<(), ElementError> {
        if corrections.is_empty() {
            return Ok(());
        }
        if round >= MAX_CORRECTION_ROUNDS {
            tracing::warn!(
                pending = corrections.len(),
                "element attributes still stale after correction"
            );
            return Ok(());
        }
        let mut tr = self.state.tr();
        tr.set_history_mode(mode);
        for (pos, attrs) in corrections {
            tr.set_node_markup(pos, None, attrs)?;
        }
        if !tr.doc_changed() {
            return Ok(());
        }
        tracing::trace!(steps = tr.steps().len(), "dispatching element attribute corrections");
        self.apply_and_reconcile(tr, round + 1)
    }
}

impl fmt::Debug for EditorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorView")
            .field("version", &self.state.version())
            .field("plugin", &self.plugin)
            .field("plugin_state", &self.plugin_state)
            .field("controllers", &self.controllers)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
