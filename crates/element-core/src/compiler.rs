//! Field spec compiler.
//!
//! Compiles an element's [`FieldSpecs`] into the storage shape of its node:
//!
//! - scalar fields (text, checkbox, dropdown, custom) live in the JSON object held by the
//!   element's `fields` attribute,
//! - rich-text fields live in dedicated child nodes named `<element>__<field>`, in field
//!   declaration order, because only structural nodes can hold editable sub-content.
//!
//! The element node also carries `hasErrors` and `errors` attributes written by its controller.
//!
//! The round-trip law is `from_storage(to_storage(v)) == v` once every empty `absent_on_empty`
//! field of `v` is replaced by its default.

use crate::error::ConfigError;
use crate::field::{FieldKind, FieldSpec, FieldSpecs, FieldValue, FieldValues};
use crate::model::{Attrs, Node};
use crate::schema::{NodeSpec, SchemaFragment};
use crate::validation::{FieldErrors, ValidationError};
use serde_json::Value;

/// Attribute holding the scalar field values.
pub const FIELDS_ATTR: &str = "fields";
/// Attribute holding the element-wide error flag.
pub const HAS_ERRORS_ATTR: &str = "hasErrors";
/// Attribute holding the displayed errors per field.
pub const ERRORS_ATTR: &str = "errors";

/// Where a field's value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSlot {
    /// A key of the `fields` attribute.
    Attribute,
    /// A child node of the given type.
    Child {
        /// Child node type name.
        node_type: String,
    },
}

/// A field together with its storage slot.
#[derive(Debug, Clone)]
pub struct CompiledField {
    /// The declaration.
    pub spec: FieldSpec,
    /// Storage slot.
    pub slot: StorageSlot,
}

/// Storage form of a set of field values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredFields {
    /// Content of the `fields` attribute.
    pub fields: Attrs,
    /// Child nodes of rich-text fields that have content, in declaration order.
    pub children: Vec<Node>,
}

/// The compiled field layout of one element.
#[derive(Debug, Clone)]
pub struct CompiledFields {
    element: String,
    fields: indexmap::IndexMap<String, CompiledField>,
}

/// Name of the child node type storing rich-text field `field` of `element`.
pub fn child_node_type(element: &str, field: &str) -> String {
    format!("{element}__{field}")
}

/// Compile the fields of `element`.
pub fn compile(element: &str, specs: &FieldSpecs) -> Result<CompiledFields, ConfigError> {
    if element.is_empty() {
        return Err(ConfigError::EmptyElementName);
    }

    let mut fields = indexmap::IndexMap::with_capacity(specs.len());
    for (name, spec) in specs {
        if spec.default_value.kind() != spec.kind {
            return Err(ConfigError::FieldKindMismatch {
                element: element.to_string(),
                field: name.clone(),
                kind: spec.kind,
            });
        }
        if let FieldValue::Choice(choice) = &spec.default_value
            && !choice.is_empty()
            && !spec.options.iter().any(|o| &o.value == choice)
        {
            return Err(ConfigError::InvalidDropdownDefault {
                element: element.to_string(),
                field: name.clone(),
                value: choice.clone(),
            });
        }

        let slot = match spec.kind {
            FieldKind::RichText => StorageSlot::Child {
                node_type: child_node_type(element, name),
            },
            FieldKind::Text | FieldKind::Checkbox | FieldKind::Dropdown | FieldKind::Custom => {
                StorageSlot::Attribute
            }
        };
        fields.insert(
            name.clone(),
            CompiledField {
                spec: spec.clone(),
                slot,
            },
        );
    }

    Ok(CompiledFields {
        element: element.to_string(),
        fields,
    })
}

impl CompiledFields {
    /// Element name.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Compiled fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompiledField)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Look up a field declaration.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name).map(|f| &f.spec)
    }

    /// The rich-text field stored in child nodes of `node_type`.
    pub fn child_field(&self, node_type: &str) -> Option<&str> {
        self.fields.iter().find_map(|(name, field)| match &field.slot {
            StorageSlot::Child { node_type: t } if t == node_type => Some(name.as_str()),
            _ => None,
        })
    }

    /// Child node types in declaration order.
    pub fn child_types(&self) -> Vec<&str> {
        self.fields
            .values()
            .filter_map(|field| match &field.slot {
                StorageSlot::Child { node_type } => Some(node_type.as_str()),
                StorageSlot::Attribute => None,
            })
            .collect()
    }

    /// Schema fragment declaring the element node and one node type per rich-text field.
    pub fn schema_fragment(&self) -> SchemaFragment {
        let child_types = self.child_types();
        let mut element = if child_types.is_empty() {
            NodeSpec::leaf().in_group("block")
        } else {
            NodeSpec::block(&child_types.join(" "))
        };
        element = element
            .atom()
            .with_attr(FIELDS_ATTR, Value::Object(Attrs::new()))
            .with_attr(HAS_ERRORS_ATTR, Value::Bool(false))
            .with_attr(ERRORS_ATTR, Value::Object(Attrs::new()));

        let mut fragment = SchemaFragment::new();
        fragment.insert(self.element.clone(), element);
        for field in self.fields.values() {
            if let StorageSlot::Child { node_type } = &field.slot {
                fragment.insert(
                    node_type.clone(),
                    NodeSpec::leaf().with_content(&field.spec.content),
                );
            }
        }
        fragment
    }

    /// Every field at its default value.
    pub fn defaults(&self) -> FieldValues {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.spec.default_value.clone()))
            .collect()
    }

    /// Fill every field missing from `values` with its default. Unknown names are dropped.
    pub fn with_defaults(&self, values: &FieldValues) -> FieldValues {
        self.fields
            .iter()
            .map(|(name, field)| {
                let value = values
                    .get(name)
                    .filter(|v| v.kind() == field.spec.kind)
                    .unwrap_or(&field.spec.default_value);
                (name.clone(), value.clone())
            })
            .collect()
    }

    /// Storage form of `values`. Missing fields take their defaults; empty `absent_on_empty`
    /// fields are left out. Rich text without any block is left out too, so the schema fills
    /// the child with its minimal content.
    pub fn to_storage(&self, values: &FieldValues) -> StoredFields {
        let mut stored = StoredFields::default();
        for (name, value) in self.with_defaults(values) {
            let Some(field) = self.fields.get(&name) else {
                continue;
            };
            match (&field.slot, &value) {
                (StorageSlot::Child { node_type }, FieldValue::RichText(blocks)) => {
                    let absent = field.spec.absent_on_empty && value.is_empty();
                    if !absent && !blocks.is_empty() {
                        stored
                            .children
                            .push(Node::branch(node_type.clone(), Attrs::new(), blocks.clone()));
                    }
                }
                (StorageSlot::Attribute, _) => {
                    if field.spec.absent_on_empty && value.is_empty() {
                        continue;
                    }
                    if let Some(json) = value.to_json() {
                        stored.fields.insert(name, json);
                    }
                }
                (StorageSlot::Child { .. }, _) => {}
            }
        }
        stored
    }

    /// Read field values back from an element node. Omitted fields, values of the wrong shape
    /// and empty `absent_on_empty` fields read as the field default. Other rich text reads back
    /// exactly as its child node holds it.
    pub fn from_storage(&self, node: &Node) -> FieldValues {
        let stored = node.attr(FIELDS_ATTR).and_then(Value::as_object);
        self.fields
            .iter()
            .map(|(name, field)| {
                let value = match &field.slot {
                    StorageSlot::Attribute => stored
                        .and_then(|fields| fields.get(name))
                        .and_then(|json| FieldValue::from_json(field.spec.kind, json)),
                    StorageSlot::Child { node_type } => node
                        .content()
                        .iter()
                        .find(|child| child.type_name() == node_type)
                        .map(|child| FieldValue::RichText(child.content().to_vec()))
                        .filter(|v| !(field.spec.absent_on_empty && v.is_empty())),
                };
                let value = value.unwrap_or_else(|| field.spec.default_value.clone());
                (name.clone(), value)
            })
            .collect()
    }
}

/// Element node attributes for stored scalar fields and validation results.
pub fn element_attrs(fields: Attrs, errors: &FieldErrors, has_errors: bool) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert(FIELDS_ATTR.to_string(), Value::Object(fields));
    attrs.insert(HAS_ERRORS_ATTR.to_string(), Value::Bool(has_errors));
    attrs.insert(ERRORS_ATTR.to_string(), errors_to_json(errors));
    attrs
}

/// JSON form of per-field errors. Fields without errors are left out.
pub fn errors_to_json(errors: &FieldErrors) -> Value {
    let map = errors
        .iter()
        .filter(|(_, list)| !list.is_empty())
        .filter_map(|(field, list)| {
            serde_json::to_value(list)
                .ok()
                .map(|json| (field.clone(), json))
        })
        .collect();
    Value::Object(map)
}

/// Errors stored on an element node, in attribute order. Malformed entries are skipped.
pub fn stored_errors(node: &Node) -> FieldErrors {
    let Some(map) = node.attr(ERRORS_ATTR).and_then(Value::as_object) else {
        return FieldErrors::new();
    };
    map.iter()
        .filter_map(|(field, json)| {
            serde_json::from_value::<Vec<ValidationError>>(json.clone())
                .ok()
                .map(|list| (field.clone(), list))
        })
        .collect()
}

/// The `hasErrors` flag stored on an element node.
pub fn stored_has_errors(node: &Node) -> bool {
    node.attr(HAS_ERRORS_ATTR)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::DropdownOption;
    use pretty_assertions::assert_eq;

    fn specs() -> FieldSpecs {
        let mut specs = FieldSpecs::new();
        specs.insert("caption".into(), FieldSpec::rich_text());
        specs.insert("src".into(), FieldSpec::text().absent_on_empty());
        specs.insert("useSrc".into(), FieldSpec::checkbox(true));
        specs.insert("altText".into(), FieldSpec::rich_text());
        specs
    }

    #[test]
    fn fragment_declares_children_in_order() {
        let compiled = compile("image", &specs()).unwrap();
        let fragment = compiled.schema_fragment();
        let names: Vec<&str> = fragment.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["image", "image__caption", "image__altText"]);
        assert_eq!(
            fragment["image"].content.as_deref(),
            Some("image__caption image__altText")
        );
        assert_eq!(compiled.child_field("image__altText"), Some("altText"));
    }

    #[test]
    fn absent_fields_are_omitted_and_reinflated() {
        let compiled = compile("image", &specs()).unwrap();
        let mut values = FieldValues::new();
        values.insert("src".into(), FieldValue::Text(String::new()));
        values.insert("useSrc".into(), FieldValue::Bool(false));

        let stored = compiled.to_storage(&values);
        assert!(!stored.fields.contains_key("src"));
        assert_eq!(stored.fields.get("useSrc"), Some(&Value::Bool(false)));
        assert!(stored.children.is_empty());

        let node = Node::branch(
            "image",
            element_attrs(stored.fields, &FieldErrors::new(), false),
            vec![],
        );
        let read = compiled.from_storage(&node);
        assert_eq!(read.get("src"), Some(&FieldValue::Text(String::new())));
        assert_eq!(read.get("useSrc"), Some(&FieldValue::Bool(false)));
        assert_eq!(read.get("caption"), Some(&FieldValue::RichText(vec![])));
    }

    #[test]
    fn blank_rich_text_is_stored_as_given() {
        let compiled = compile("image", &specs()).unwrap();
        let blank = vec![Node::branch("paragraph", Attrs::new(), vec![])];
        let mut values = FieldValues::new();
        values.insert("caption".into(), FieldValue::RichText(blank.clone()));

        let stored = compiled.to_storage(&values);
        assert_eq!(stored.children.len(), 1);
        assert_eq!(stored.children[0].type_name(), "image__caption");

        let node = Node::branch(
            "image",
            element_attrs(stored.fields, &FieldErrors::new(), false),
            stored.children,
        );
        assert_eq!(
            compiled.from_storage(&node).get("caption"),
            Some(&FieldValue::RichText(blank))
        );
    }

    #[test]
    fn mismatched_defaults_fail_to_compile() {
        let mut bad = FieldSpecs::new();
        bad.insert(
            "flag".into(),
            FieldSpec::checkbox(false).with_default(FieldValue::Text("yes".into())),
        );
        assert_eq!(
            compile("x", &bad).map(|_| ()),
            Err(ConfigError::FieldKindMismatch {
                element: "x".into(),
                field: "flag".into(),
                kind: FieldKind::Checkbox,
            })
        );

        let mut dropdown = FieldSpecs::new();
        dropdown.insert(
            "role".into(),
            FieldSpec::dropdown("wide", vec![DropdownOption::new("Inline", "inline")]),
        );
        assert!(matches!(
            compile("x", &dropdown),
            Err(ConfigError::InvalidDropdownDefault { .. })
        ));
        assert_eq!(compile("", &FieldSpecs::new()).map(|_| ()), Err(ConfigError::EmptyElementName));
    }

    #[test]
    fn errors_round_trip_through_attrs() {
        let mut errors = FieldErrors::new();
        errors.insert("src".into(), vec![ValidationError::error("Required")]);
        errors.insert("caption".into(), vec![]);
        let node = Node::leaf("image", element_attrs(Attrs::new(), &errors, true));
        let read = stored_errors(&node);
        assert_eq!(read.len(), 1);
        assert_eq!(read["src"], vec![ValidationError::error("Required")]);
        assert!(stored_has_errors(&node));
    }
}
