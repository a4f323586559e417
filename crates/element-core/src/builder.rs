//! Element node builder.

use crate::element::ElementSpec;
use crate::field::FieldValues;
use crate::model::Node;
use crate::schema::Schema;

/// Build a complete element node from (possibly partial) field values.
///
/// Missing fields take their defaults and the node's validation attributes are computed up
/// front. Returns `None`, after logging a warning, when the schema cannot fill the element's
/// required content or a rich-text value does not fit its child node.
pub fn build_element_node(schema: &Schema, spec: &ElementSpec, partial: &FieldValues) -> Option<Node> {
    let values = spec.fields().with_defaults(partial);
    let (attrs, stored) = spec.storage(&values);

    for child in &stored.children {
        if let Err(err) = schema.check_node(child) {
            tracing::warn!(element = spec.name(), error = %err, "rich-text value does not fit its field");
            return None;
        }
    }

    let node = schema.create_and_fill(spec.name(), attrs, stored.children);
    if node.is_none() {
        tracing::warn!(
            element = spec.name(),
            "could not fill the element node; the field spec and the schema disagree"
        );
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{FIELDS_ATTR, HAS_ERRORS_ATTR};
    use crate::field::{FieldSpec, FieldSpecs, FieldValue};
    use crate::model::Attrs;
    use crate::schema::SchemaSpec;
    use crate::validation::required;
    use serde_json::{Value, json};

    fn quote() -> ElementSpec {
        let mut fields = FieldSpecs::new();
        fields.insert("body".into(), FieldSpec::rich_text());
        fields.insert(
            "source".into(),
            FieldSpec::text().with_validator(required("Source is required")),
        );
        ElementSpec::new("quote", fields).unwrap()
    }

    fn schema(spec: &ElementSpec) -> Schema {
        let mut schema = SchemaSpec::basic();
        schema.append(&spec.fields().schema_fragment()).unwrap();
        Schema::new(schema).unwrap()
    }

    #[test]
    fn fills_children_and_validation_attrs() {
        let spec = quote();
        let schema = schema(&spec);
        let node = build_element_node(&schema, &spec, &FieldValues::new()).unwrap();

        assert_eq!(node.child_count(), 1);
        assert_eq!(node.child(0).map(Node::type_name), Some("quote__body"));
        assert_eq!(node.attr(HAS_ERRORS_ATTR), Some(&Value::Bool(true)));
        assert_eq!(node.attr(FIELDS_ATTR), Some(&json!({ "source": "" })));
    }

    #[test]
    fn keeps_rich_text_content() {
        let spec = quote();
        let schema = schema(&spec);
        let para = Node::branch("paragraph", Attrs::new(), vec![Node::text("To be")]);
        let mut values = FieldValues::new();
        values.insert("body".into(), FieldValue::RichText(vec![para]));
        values.insert("source".into(), FieldValue::from("Hamlet"));

        let node = build_element_node(&schema, &spec, &values).unwrap();
        assert_eq!(node.text_content(), "To be");
        assert_eq!(node.attr(HAS_ERRORS_ATTR), Some(&Value::Bool(false)));
    }

    #[test]
    fn misfitting_rich_text_is_rejected() {
        let spec = quote();
        let schema = schema(&spec);
        let mut values = FieldValues::new();
        values.insert("body".into(), FieldValue::RichText(vec![Node::text("bare")]));
        assert!(build_element_node(&schema, &spec, &values).is_none());
    }
}
