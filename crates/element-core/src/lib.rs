#![warn(missing_docs)]
//! Element Core - Headless Structured Elements for Rich-Text Documents
//!
//! # Overview
//!
//! `element-core` lets a structured "element" (an image, a quote, a linked-data triple, an
//! embed) live inside a rich-text document as a first-class node with typed, validated fields.
//! Fields are edited through live views, while the surrounding document keeps normal editing,
//! undo/redo and structural reordering.
//!
//! The central problem is keeping two representations of the same data in sync:
//!
//! - the durable element node stored and serialized by the document,
//! - the live field views (and nested rich-text editors) a user interacts with.
//!
//! # Core Features
//!
//! - **Field Spec Compiler**: declarative fields become a schema fragment plus storage
//!   conversions, with defaults and omission of empty values
//! - **Element Controllers**: two explicit one-way update paths (document to view, view to
//!   document) with an "only emit when changed" guard
//! - **Nested Editors**: rich-text fields edited as self-contained documents with their own
//!   selection and decoration slices
//! - **Structural Commands**: remove and move commands with a dry-run mode for UI affordances
//! - **Aggregate Errors**: document-wide error state recomputed after every transaction
//! - **Undo/Redo**: one field edit is one undo step
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditorView (dispatch + reconciliation)     │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  ElementPlugin (registry, errors, insert)   │  ← Document-wide state
//! ├─────────────────────────────────────────────┤
//! │  ElementController + FieldView + Nested     │  ← Synchronization core
//! ├─────────────────────────────────────────────┤
//! │  Compiler + Builder + Commands              │  ← Storage and structure
//! ├─────────────────────────────────────────────┤
//! │  Schema + Transform + State + History       │  ← Document substrate
//! ├─────────────────────────────────────────────┤
//! │  Node tree (positions, resolve)             │  ← Document model
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use element_core::{
//!     EditorState, EditorView, ElementPluginBuilder, ElementSpec, ErrorLevel, FieldSpec,
//!     FieldSpecs, FieldValue, FieldValues, HistoryConfig, Schema, SchemaSpec, max_length,
//! };
//! use std::sync::Arc;
//!
//! let mut fields = FieldSpecs::new();
//! fields.insert(
//!     "title".into(),
//!     FieldSpec::text().with_validator(max_length(10, None, ErrorLevel::Error)),
//! );
//! fields.insert("body".into(), FieldSpec::rich_text());
//!
//! let plugin = ElementPluginBuilder::new()
//!     .element(ElementSpec::new("callout", fields).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let mut spec = SchemaSpec::basic();
//! plugin.extend_schema(&mut spec).unwrap();
//! let state = EditorState::empty(Arc::new(Schema::new(spec).unwrap())).unwrap();
//! let mut view = EditorView::new(state, plugin, HistoryConfig::default()).unwrap();
//!
//! view.insert_element("callout", &FieldValues::new()).unwrap();
//! view.update_field(0, "title", FieldValue::from("Far too long a title")).unwrap();
//! assert!(view.plugin_state().has_errors);
//! assert_eq!(view.plugin_state().issues[0].error.message, "Too long: 20/10");
//! ```
//!
//! # Module Description
//!
//! - [`model`] - Document nodes and positions
//! - [`schema`] - Node specs and content expressions
//! - [`transform`] - Steps, position mapping and transactions
//! - [`state`] - Immutable editor state
//! - [`history`] - Undo/redo
//! - [`decorations`] - Ephemeral position-anchored annotations
//! - [`validation`] - Validation errors, validators and error policies
//! - [`field`] - Field declarations and values
//! - [`compiler`] - Field spec compiler
//! - [`builder`] - Element node builder
//! - [`element`] - Element definitions and renderers
//! - [`field_view`] - Field view controllers
//! - [`nested`] - Nested rich-text editors
//! - [`controller`] - Element view controller
//! - [`commands`] - Structural commands
//! - [`plugin`] - Element plugin, aggregate errors and insertion
//! - [`view`] - Dispatch loop and controller reconciliation
//! - [`serialize`] - JSON document form and attribute pairs
//! - [`error`] - Error types
//!
//! # Logging
//!
//! Diagnostics go through `tracing`; no subscriber is installed by this crate. Configuration
//! errors are logged at `error`, abandoned insertions and discarded nested editors at `warn`,
//! controller lifecycle events at `debug` and `trace`.

pub mod builder;
pub mod commands;
pub mod compiler;
pub mod controller;
pub mod decorations;
pub mod element;
pub mod error;
pub mod field;
pub mod field_view;
pub mod history;
pub mod model;
pub mod nested;
pub mod plugin;
pub mod schema;
pub mod serialize;
pub mod state;
pub mod transform;
pub mod validation;
pub mod view;

pub use builder::build_element_node;
pub use commands::{CommandAvailability, Dispatch, ElementCommand, ElementCommands, for_position};
pub use compiler::{CompiledFields, StorageSlot, StoredFields, compile};
pub use controller::{ElementController, Lifecycle, ShapeSignature};
pub use decorations::{Decoration, DecorationKind, DecorationRange, DecorationSet, DecorationSource};
pub use element::{
    ElementRenderer, ElementSpec, ElementValidator, NoopRenderer, RenderContext, Validation,
    ViewFactory,
};
pub use error::{ConfigError, ElementError, SchemaError, SerializeError, TransformError};
pub use field::{DropdownOption, FieldKind, FieldSpec, FieldSpecs, FieldValue, FieldValues};
pub use field_view::{FieldView, FieldViewFactory, FieldViewState, create_field_view};
pub use history::{History, HistoryConfig};
pub use model::{Attrs, Node, ResolvedPos};
pub use nested::NestedEditor;
pub use plugin::{ElementData, ElementIssue, ElementPlugin, ElementPluginBuilder, PluginState};
pub use schema::{AttrSpec, NodeSpec, Schema, SchemaFragment, SchemaSpec};
pub use state::{EditorState, Selection};
pub use transform::{HistoryMode, Mapping, Step, StepMap, Transaction, can_join};
pub use validation::{
    ErrorLevel, ErrorPolicy, FieldErrors, ValidationError, Validator, max_length, pattern,
    required,
};
pub use view::{EditorView, StateChange, StateChangeCallback, StateChangeType};
