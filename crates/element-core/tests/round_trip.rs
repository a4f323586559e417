//! Storage round-trip of element field values.

mod common;

use common::*;
use element_core::{
    ElementPluginBuilder, ElementSpec, FieldSpec, FieldSpecs, FieldValue, FieldValues, compiler,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn read_back(name: &str, input: FieldValues) -> FieldValues {
    let plugin = plugin();
    let schema = schema_for(&plugin);
    let node = element(&plugin, &schema, name, input);
    plugin.element_data_from_node(&node).unwrap().values
}

#[test]
fn test_absent_fields_read_back_as_defaults() {
    let input = values(&[
        ("subject", FieldValue::from("")),
        ("predicate", FieldValue::from("x")),
        ("object", FieldValue::from("y")),
        ("graph", FieldValue::from("")),
    ]);
    let read = read_back(LD, input);

    assert_eq!(read["subject"], FieldValue::from(DEFAULT_SUBJECT));
    assert_eq!(read["predicate"], FieldValue::from("x"));
    assert_eq!(read["object"], FieldValue::from("y"));
    assert_eq!(read["graph"], FieldValue::from(DEFAULT_GRAPH));
    assert_eq!(read["html"], FieldValue::Bool(false));
    assert_eq!(read["role"], FieldValue::Choice("inline".into()));
}

#[test]
fn test_absent_fields_are_not_stored() {
    let plugin = plugin();
    let schema = schema_for(&plugin);
    let node = element(
        &plugin,
        &schema,
        LD,
        values(&[
            ("subject", FieldValue::from("")),
            ("predicate", FieldValue::from("x")),
        ]),
    );

    let stored = node.attr(compiler::FIELDS_ATTR).unwrap().as_object().unwrap();
    assert!(!stored.contains_key("subject"));
    assert!(stored.contains_key("graph"));
    assert_eq!(stored["predicate"], serde_json::json!("x"));
    assert_eq!(stored["object"], serde_json::json!(""));
}

#[test]
fn test_rich_text_lives_in_child_nodes() {
    let plugin = plugin();
    let schema = schema_for(&plugin);
    let node = element(
        &plugin,
        &schema,
        IMAGE,
        values(&[
            ("caption", rich(&["first", "second"])),
            ("src", FieldValue::from("a.png")),
        ]),
    );

    let children: Vec<_> = node.content().iter().map(|c| c.type_name()).collect();
    assert_eq!(children, vec!["image__caption", "image__altText"]);
    assert_eq!(node.content()[0].text_content(), "firstsecond");

    let read = plugin.element_data_from_node(&node).unwrap().values;
    assert_eq!(read["caption"], rich(&["first", "second"]));
    assert_eq!(read["altText"], rich(&[""]));
}

#[test]
fn test_blank_paragraphs_are_kept() {
    let read = read_back(
        IMAGE,
        values(&[("caption", rich(&["", "", "x"])), ("altText", rich(&[""]))]),
    );
    assert_eq!(read["caption"], rich(&["", "", "x"]));
    assert_eq!(read["altText"], rich(&[""]));
}

#[test]
fn test_empty_absent_rich_text_reads_as_default() {
    let mut fields = FieldSpecs::new();
    fields.insert(
        "body".into(),
        FieldSpec::rich_text()
            .absent_on_empty()
            .with_default(rich(&["Write something"])),
    );
    let plugin = ElementPluginBuilder::new()
        .element(ElementSpec::new("note", fields).unwrap())
        .build()
        .unwrap();
    let schema = schema_for(&plugin);

    let node = element(&plugin, &schema, "note", values(&[("body", rich(&["", ""]))]));
    assert_eq!(node.content()[0].child_count(), 1);
    let read = plugin.element_data_from_node(&node).unwrap().values;
    assert_eq!(read["body"], rich(&["Write something"]));
}

#[test]
fn test_unknown_and_mistyped_fields_are_dropped() {
    let read = read_back(
        LD,
        values(&[
            ("bogus", FieldValue::from("?")),
            ("html", FieldValue::from("not a bool")),
            ("predicate", FieldValue::from("p")),
        ]),
    );
    assert!(!read.contains_key("bogus"));
    assert_eq!(read["html"], FieldValue::Bool(false));
    assert_eq!(read["predicate"], FieldValue::from("p"));
}

#[test]
fn test_non_element_nodes_have_no_element_data() {
    let plugin = plugin();
    assert!(plugin.element_data_from_node(&para("plain")).is_none());
}

fn role() -> impl Strategy<Value = String> {
    prop_oneof![Just("inline".to_string()), Just("showcase".to_string())]
}

fn blocks() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop_oneof![Just(String::new()), "[a-z ]{1,6}"], 1..4)
}

fn rich_value(texts: &[String]) -> FieldValue {
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    rich(&refs)
}

proptest! {
    #[test]
    fn ld_values_survive_storage(
        subject in "[a-z:]{0,8}",
        predicate in "[a-z]{0,8}",
        object in "[a-zA-Z0-9 ]{0,12}",
        graph in "[a-z:]{0,8}",
        html in any::<bool>(),
        role in role(),
    ) {
        let input = values(&[
            ("subject", FieldValue::from(subject.as_str())),
            ("predicate", FieldValue::from(predicate.as_str())),
            ("object", FieldValue::from(object.as_str())),
            ("graph", FieldValue::from(graph.as_str())),
            ("html", FieldValue::Bool(html)),
            ("role", FieldValue::Choice(role.clone())),
        ]);
        let mut expected = input.clone();
        if subject.is_empty() {
            expected.insert("subject".into(), FieldValue::from(DEFAULT_SUBJECT));
        }
        if graph.is_empty() {
            expected.insert("graph".into(), FieldValue::from(DEFAULT_GRAPH));
        }

        prop_assert_eq!(read_back(LD, input), expected);
    }

    #[test]
    fn image_values_survive_storage(
        caption in blocks(),
        alt in "[a-z]{0,10}",
        src in "[a-z./]{0,10}",
        use_src in any::<bool>(),
    ) {
        let caption = rich_value(&caption);
        let alt = rich(&[alt.as_str()]);
        let input = values(&[
            ("caption", caption.clone()),
            ("altText", alt.clone()),
            ("src", FieldValue::from(src.as_str())),
            ("useSrc", FieldValue::Bool(use_src)),
        ]);
        let expected = input.clone();

        prop_assert_eq!(read_back(IMAGE, input), expected);
    }
}
