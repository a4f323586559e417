//! Element definitions.
//!
//! An [`ElementSpec`] is a named set of fields plus the per-element behaviour around them: the
//! error-selection policy, an optional element-level validator and the renderer factory used
//! when a controller mounts.

use crate::commands::CommandAvailability;
use crate::compiler::{CompiledFields, StoredFields, compile, element_attrs};
use crate::error::ConfigError;
use crate::field::{FieldSpecs, FieldValues};
use crate::model::Attrs;
use crate::validation::{ErrorPolicy, FieldErrors, ValidationError, run_validators};
use std::fmt;
use std::sync::Arc;

/// Validates the whole value set of an element and returns extra errors per field.
pub type ElementValidator = Arc<dyn Fn(&FieldValues) -> FieldErrors + Send + Sync>;

/// Creates the renderer for a newly mounted element controller.
pub type ViewFactory = Arc<dyn Fn(&ElementSpec) -> Box<dyn ElementRenderer> + Send + Sync>;

/// What a renderer sees on mount and on every update.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Element name.
    pub element: &'a str,
    /// Position of the element node.
    pub pos: usize,
    /// Current field values.
    pub values: &'a FieldValues,
    /// Displayed errors per field.
    pub errors: &'a FieldErrors,
    /// Whether any field carries an `ERROR`.
    pub has_errors: bool,
    /// Which structural commands currently apply.
    pub commands: CommandAvailability,
}

/// Host-side presentation of one mounted element.
///
/// Renderers only display state. User input reaches the element through
/// [`EditorView::update_field`](crate::EditorView::update_field).
pub trait ElementRenderer: Send {
    /// Called once when the controller mounts.
    fn mount(&mut self, ctx: &RenderContext<'_>);

    /// Called after every downward or upward update.
    fn update(&mut self, ctx: &RenderContext<'_>);

    /// Called once when the controller is destroyed.
    fn destroy(&mut self);
}

/// A renderer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl ElementRenderer for NoopRenderer {
    fn mount(&mut self, _ctx: &RenderContext<'_>) {}

    fn update(&mut self, _ctx: &RenderContext<'_>) {}

    fn destroy(&mut self) {}
}

/// Result of validating a value set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Validation {
    /// Every failure per field: validator results in declaration order, then element-level
    /// errors.
    pub all: FieldErrors,
    /// Errors picked for display by the element's policy, followed by element-level errors.
    pub displayed: FieldErrors,
    /// Whether any failure is `ERROR`-level, whether displayed or not.
    pub has_errors: bool,
}

/// A registered element type.
#[derive(Clone)]
pub struct ElementSpec {
    name: String,
    compiled: CompiledFields,
    policy: ErrorPolicy,
    validator: Option<ElementValidator>,
    view_factory: Option<ViewFactory>,
}

impl ElementSpec {
    /// Declare an element. Fails when the fields do not compile.
    pub fn new(name: &str, fields: FieldSpecs) -> Result<Self, ConfigError> {
        let compiled = compile(name, &fields)?;
        Ok(Self {
            name: name.to_string(),
            compiled,
            policy: ErrorPolicy::default(),
            validator: None,
            view_factory: None,
        })
    }

    /// Set the error-selection policy.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add an element-level validator.
    pub fn with_validator(mut self, validator: ElementValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Set the renderer factory.
    pub fn with_view(mut self, factory: ViewFactory) -> Self {
        self.view_factory = Some(factory);
        self
    }

    /// Element name (also its node type name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compiled field layout.
    pub fn fields(&self) -> &CompiledFields {
        &self.compiled
    }

    /// Error-selection policy.
    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Create a renderer for a new mount.
    pub fn renderer(&self) -> Box<dyn ElementRenderer> {
        match &self.view_factory {
            Some(factory) => factory(self),
            None => Box::new(NoopRenderer),
        }
    }

    /// Validate a complete value set.
    pub fn validate(&self, values: &FieldValues) -> Validation {
        let mut structural = self
            .validator
            .as_ref()
            .map(|validator| validator(values))
            .unwrap_or_default();

        let mut validation = Validation::default();
        for (name, field) in self.compiled.iter() {
            let failures = values
                .get(name)
                .map(|value| run_validators(&field.spec.validators, value))
                .unwrap_or_default();
            let extra = structural.shift_remove(name).unwrap_or_default();

            let mut displayed = self.policy.select(&failures);
            displayed.extend(extra.iter().cloned());
            let mut all = failures;
            all.extend(extra);

            validation.has_errors |= all.iter().any(ValidationError::is_error);
            validation.all.insert(name.to_string(), all);
            validation.displayed.insert(name.to_string(), displayed);
        }
        validation
    }

    /// Node attributes and rich-text children for a complete value set.
    pub fn storage(&self, values: &FieldValues) -> (Attrs, StoredFields) {
        let validation = self.validate(values);
        let stored = self.compiled.to_storage(values);
        let attrs = element_attrs(
            stored.fields.clone(),
            &validation.displayed,
            validation.has_errors,
        );
        (attrs, stored)
    }
}

impl fmt::Debug for ElementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSpec")
            .field("name", &self.name)
            .field("fields", &self.compiled)
            .field("policy", &self.policy)
            .field("validator", &self.validator.is_some())
            .field("view_factory", &self.view_factory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldSpec, FieldValue};
    use crate::validation::{ErrorLevel, max_length};

    fn headline(policy: ErrorPolicy) -> ElementSpec {
        let mut fields = FieldSpecs::new();
        fields.insert(
            "title".into(),
            FieldSpec::text()
                .with_validator(max_length(3, Some("long for display"), ErrorLevel::Warn))
                .with_validator(max_length(5, Some("too long to publish"), ErrorLevel::Error)),
        );
        ElementSpec::new("headline", fields)
            .unwrap()
            .with_policy(policy)
    }

    #[test]
    fn displayed_errors_follow_policy_but_flag_sees_all() {
        let mut values = FieldValues::new();
        values.insert("title".into(), FieldValue::from("abcdefg"));

        let warn_first = headline(ErrorPolicy::PreferWarn).validate(&values);
        assert_eq!(
            warn_first.displayed["title"],
            vec![ValidationError::warn("long for display")]
        );
        assert!(warn_first.has_errors);

        let error_first = headline(ErrorPolicy::PreferError).validate(&values);
        assert_eq!(
            error_first.displayed["title"],
            vec![ValidationError::error("too long to publish")]
        );
        assert_eq!(error_first.all["title"].len(), 2);
    }

    #[test]
    fn element_validator_adds_structural_errors() {
        let spec = headline(ErrorPolicy::FirstFailing).with_validator(Arc::new(|values| {
            let mut errors = FieldErrors::new();
            if values.get("title").is_some_and(|v| v.is_empty()) {
                errors.insert("title".into(), vec![ValidationError::error("Required")]);
            }
            errors
        }));
        let mut values = FieldValues::new();
        values.insert("title".into(), FieldValue::from(""));
        let validation = spec.validate(&values);
        assert_eq!(
            validation.displayed["title"],
            vec![ValidationError::error("Required")]
        );
        assert!(validation.has_errors);
    }
}
