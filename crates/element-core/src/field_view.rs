//! Field view controllers.
//!
//! A [`FieldView`] is the live, per-field object a user edits. It holds the field's current
//! value and is driven from two directions:
//!
//! - downward, [`FieldView::update`] pushes the value found in the document,
//! - upward, [`FieldView::input`] takes a user edit and returns the value to emit, if any.
//!
//! Both directions are idempotent: a view never emits a value it already holds, so a view
//! receiving its own just-emitted value back from the document stays silent.

use crate::field::{DropdownOption, FieldKind, FieldSpec, FieldValue};
use crate::validation::ValidationError;
use std::sync::Arc;

/// Creates a field view seeded with an initial value.
pub type FieldViewFactory = Arc<dyn Fn(&FieldSpec, &FieldValue) -> Box<dyn FieldView> + Send + Sync>;

/// A live view over one field.
pub trait FieldView: Send {
    /// Kind of field this view edits.
    fn kind(&self) -> FieldKind;

    /// Current value.
    fn value(&self) -> &FieldValue;

    /// Push a value from the document. Returns whether the held value changed.
    fn update(&mut self, value: &FieldValue) -> bool;

    /// Apply a user edit. Returns the value to emit upward, or `None` when nothing changed or
    /// the edit is not acceptable for this view.
    fn input(&mut self, value: FieldValue) -> Option<FieldValue>;

    /// Release the view. Later calls to [`FieldView::input`] emit nothing.
    fn destroy(&mut self);

    /// Whether [`FieldView::destroy`] ran.
    fn is_destroyed(&self) -> bool;
}

/// Value cell shared by the built-in views.
#[derive(Debug, Clone)]
struct Cell {
    value: FieldValue,
    destroyed: bool,
}

impl Cell {
    fn new(value: &FieldValue) -> Self {
        Self {
            value: value.clone(),
            destroyed: false,
        }
    }

    fn update(&mut self, kind: FieldKind, value: &FieldValue) -> bool {
        if self.destroyed || value.kind() != kind || &self.value == value {
            return false;
        }
        self.value = value.clone();
        true
    }

    fn input(&mut self, kind: FieldKind, value: FieldValue) -> Option<FieldValue> {
        if self.destroyed || value.kind() != kind || self.value == value {
            return None;
        }
        self.value = value.clone();
        Some(value)
    }
}

macro_rules! delegate_cell {
    ($kind:expr) => {
        fn kind(&self) -> FieldKind {
            $kind
        }

        fn value(&self) -> &FieldValue {
            &self.cell.value
        }

        fn update(&mut self, value: &FieldValue) -> bool {
            self.cell.update($kind, value)
        }

        fn destroy(&mut self) {
            self.cell.destroyed = true;
        }

        fn is_destroyed(&self) -> bool {
            self.cell.destroyed
        }
    };
}

/// Single- or multi-line plain text input.
#[derive(Debug, Clone)]
pub struct TextFieldView {
    cell: Cell,
    /// Placeholder shown while empty.
    pub placeholder: Option<String>,
    /// Visible rows (multi-line when greater than one).
    pub rows: u32,
}

impl FieldView for TextFieldView {
    delegate_cell!(FieldKind::Text);

    fn input(&mut self, value: FieldValue) -> Option<FieldValue> {
        self.cell.input(FieldKind::Text, value)
    }
}

/// Mirror of a rich-text field. Editing happens in the field's nested editor; this view only
/// tracks the committed content.
#[derive(Debug, Clone)]
pub struct RichTextFieldView {
    cell: Cell,
}

impl FieldView for RichTextFieldView {
    delegate_cell!(FieldKind::RichText);

    fn input(&mut self, value: FieldValue) -> Option<FieldValue> {
        self.cell.input(FieldKind::RichText, value)
    }
}

/// Checkbox.
#[derive(Debug, Clone)]
pub struct CheckboxFieldView {
    cell: Cell,
}

impl FieldView for CheckboxFieldView {
    delegate_cell!(FieldKind::Checkbox);

    fn input(&mut self, value: FieldValue) -> Option<FieldValue> {
        self.cell.input(FieldKind::Checkbox, value)
    }
}

/// Dropdown over a fixed option list. Choices outside the list are ignored.
#[derive(Debug, Clone)]
pub struct DropdownFieldView {
    cell: Cell,
    /// Available options.
    pub options: Vec<DropdownOption>,
}

impl FieldView for DropdownFieldView {
    delegate_cell!(FieldKind::Dropdown);

    fn input(&mut self, value: FieldValue) -> Option<FieldValue> {
        if let FieldValue::Choice(choice) = &value
            && !self.options.iter().any(|o| &o.value == choice)
        {
            tracing::debug!(choice = %choice, "ignoring dropdown choice outside the option list");
            return None;
        }
        self.cell.input(FieldKind::Dropdown, value)
    }
}

/// Holder for arbitrary JSON edited by an integration-specific widget.
#[derive(Debug, Clone)]
pub struct CustomFieldView {
    cell: Cell,
}

impl FieldView for CustomFieldView {
    delegate_cell!(FieldKind::Custom);

    fn input(&mut self, value: FieldValue) -> Option<FieldValue> {
        self.cell.input(FieldKind::Custom, value)
    }
}

/// Create the view for a field: its custom factory if set, otherwise the built-in view of its
/// kind.
pub fn create_field_view(spec: &FieldSpec, value: &FieldValue) -> Box<dyn FieldView> {
    if let Some(factory) = &spec.view_factory {
        return factory(spec, value);
    }
    let cell = Cell::new(value);
    match spec.kind {
        FieldKind::Text => Box::new(TextFieldView {
            cell,
            placeholder: spec.placeholder.clone(),
            rows: spec.rows.unwrap_or(1),
        }),
        FieldKind::RichText => Box::new(RichTextFieldView { cell }),
        FieldKind::Checkbox => Box::new(CheckboxFieldView { cell }),
        FieldKind::Dropdown => Box::new(DropdownFieldView {
            cell,
            options: spec.options.clone(),
        }),
        FieldKind::Custom => Box::new(CustomFieldView { cell }),
    }
}

/// A field view together with its freshly computed errors.
pub struct FieldViewState {
    /// The view.
    pub view: Box<dyn FieldView>,
    /// Displayed errors after the last update.
    pub errors: Vec<ValidationError>,
}

impl FieldViewState {
    /// Wrap a view with no errors yet.
    pub fn new(view: Box<dyn FieldView>) -> Self {
        Self {
            view,
            errors: Vec::new(),
        }
    }
}

impl std::fmt::Debug for FieldViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldViewState")
            .field("kind", &self.view.kind())
            .field("value", self.view.value())
            .field("errors", &self.errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_do_not_reemit_held_values() {
        let spec = FieldSpec::text();
        let mut view = create_field_view(&spec, &FieldValue::from("a"));
        assert_eq!(view.input(FieldValue::from("b")), Some(FieldValue::from("b")));
        assert!(!view.update(&FieldValue::from("b")));
        assert_eq!(view.input(FieldValue::from("b")), None);
    }

    #[test]
    fn dropdown_rejects_unknown_choices() {
        let spec = FieldSpec::dropdown(
            "inline",
            vec![
                DropdownOption::new("Inline", "inline"),
                DropdownOption::new("Thumbnail", "thumbnail"),
            ],
        );
        let mut view = create_field_view(&spec, &spec.default_value);
        assert_eq!(view.input(FieldValue::Choice("wide".into())), None);
        assert_eq!(
            view.input(FieldValue::Choice("thumbnail".into())),
            Some(FieldValue::Choice("thumbnail".into()))
        );
    }

    #[test]
    fn destroyed_views_stay_silent() {
        let mut view = create_field_view(&FieldSpec::checkbox(false), &FieldValue::Bool(false));
        view.destroy();
        assert!(view.is_destroyed());
        assert_eq!(view.input(FieldValue::Bool(true)), None);
        assert!(!view.update(&FieldValue::Bool(true)));
    }
}
