//! Downward and upward updates between element nodes and their controllers.

mod common;

use common::*;
use element_core::serialize::{doc_from_str, doc_to_string};
use element_core::{
    Attrs, DecorationSet, EditorState, ElementController, ElementError, ElementPluginBuilder,
    ElementSpec, FieldSpec, FieldSpecs, FieldValue, Lifecycle, Node, SchemaError, Selection,
    TransformError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_repeated_field_value_is_one_edit() {
    let mut view = view_with(plugin(), |p, s| vec![para("a"), ld(p, s, "p", "o")]);

    assert!(view.update_field(3, "object", FieldValue::from("new")).unwrap());
    let version = view.state().version();
    assert!(!view.update_field(3, "object", FieldValue::from("new")).unwrap());

    assert_eq!(view.state().version(), version);
    assert_eq!(view.history().undo_depth(), 1);
    let controller = view.controller(3).unwrap();
    assert_eq!(controller.field_value("object"), Some(&FieldValue::from("new")));
    assert_eq!(controller.values()["object"], FieldValue::from("new"));
}

#[test]
fn test_value_normalizing_to_stored_state_issues_no_edit() {
    let mut view = view_with(plugin(), |p, s| {
        vec![element(
            p,
            s,
            LD,
            values(&[
                ("predicate", FieldValue::from("p")),
                ("graph", FieldValue::from("")),
            ]),
        )]
    });
    assert_eq!(
        view.controller(0).unwrap().field_value("graph"),
        Some(&FieldValue::from(DEFAULT_GRAPH))
    );

    let version = view.state().version();
    assert!(!view.update_field(0, "graph", FieldValue::from("")).unwrap());
    assert_eq!(view.state().version(), version);
    assert!(!view.history().can_undo());
    assert_eq!(
        view.controller(0).unwrap().field_value("graph"),
        Some(&FieldValue::from(DEFAULT_GRAPH))
    );

    assert!(!view.update_field(0, "graph", FieldValue::from("")).unwrap());
    assert!(view.update_field(0, "graph", FieldValue::from("urn:graph:other")).unwrap());
    assert_eq!(
        view.controller(0).unwrap().field_value("graph"),
        Some(&FieldValue::from("urn:graph:other"))
    );
}

#[test]
fn test_rich_text_that_does_not_fit_its_field_is_rejected() {
    let mut view = view_with(plugin(), |p, s| {
        vec![element(p, s, IMAGE, values(&[("caption", rich(&["kept"]))]))]
    });
    let before = view.state().doc().clone();
    let version = view.state().version();

    let bare = FieldValue::RichText(vec![Node::text("bare")]);
    for _ in 0..2 {
        let result = view.update_field(0, "caption", bare.clone());
        assert!(matches!(
            &result,
            Err(ElementError::Schema(SchemaError::InvalidContent { node })) if node == "image__caption"
        ));
        assert_eq!(
            view.controller(0).unwrap().field_value("caption"),
            Some(&rich(&["kept"]))
        );
    }

    let result = view.edit_nested(0, "caption", |tr| {
        tr.insert(0, vec![Node::text("x")])?;
        Ok(())
    });
    assert!(matches!(
        &result,
        Err(ElementError::Transform(TransformError::Schema(_)))
    ));
    assert_eq!(
        view.controller(0).unwrap().nested("caption").unwrap().state().doc().text_content(),
        "kept"
    );

    assert_eq!(view.state().doc(), &before);
    assert_eq!(view.state().version(), version);
    let text = doc_to_string(view.state().doc()).unwrap();
    assert!(doc_from_str(view.state().schema(), &text).is_ok());
}

#[test]
fn test_rich_text_with_default_can_be_cleared() {
    let mut fields = FieldSpecs::new();
    fields.insert(
        "body".into(),
        FieldSpec::rich_text().with_default(rich(&["Default body"])),
    );
    let plugin = ElementPluginBuilder::new()
        .element(ElementSpec::new("note", fields).unwrap())
        .build()
        .unwrap();
    let mut view = view_with(plugin, |p, s| vec![element(p, s, "note", values(&[]))]);
    assert_eq!(
        view.controller(0).unwrap().values()["body"],
        rich(&["Default body"])
    );

    assert!(view.update_field(0, "body", FieldValue::RichText(Vec::new())).unwrap());

    let node = view.state().doc().child(0).unwrap();
    assert_eq!(node.text_content(), "");
    let controller = view.controller(0).unwrap();
    assert_eq!(controller.values()["body"], rich(&[""]));
    assert_eq!(controller.field_value("body"), Some(&rich(&[""])));
    let read = view.plugin().element_data_from_node(node).unwrap().values;
    assert_eq!(read["body"], rich(&[""]));
}

#[test]
fn test_upward_update_rewrites_node_in_place() {
    let mut view = view_with(plugin(), |p, s| vec![ld(p, s, "", "o"), para("tail")]);
    assert!(view.plugin_state().has_errors);
    assert_eq!(view.controller(0).unwrap().field_errors("predicate").len(), 1);

    assert!(view.update_field(0, "predicate", FieldValue::from("knows")).unwrap());

    let node = view.state().doc().child(0).unwrap();
    assert_eq!(node.type_name(), LD);
    assert_eq!(node.attr("hasErrors"), Some(&serde_json::json!(false)));
    assert_eq!(node.attr("errors"), Some(&serde_json::json!({})));
    assert!(!view.plugin_state().has_errors);

    let controller = view.controller(0).unwrap();
    assert!(controller.field_errors("predicate").is_empty());
    assert_eq!(controller.lifecycle(), Lifecycle::Live);
}

#[test]
fn test_field_errors_for_unknown_or_mistyped_fields() {
    let mut view = view_with(plugin(), |p, s| vec![ld(p, s, "p", "o")]);

    assert!(matches!(
        view.update_field(0, "nope", FieldValue::from("x")),
        Err(ElementError::UnknownField { .. })
    ));
    assert!(matches!(
        view.update_field(0, "html", FieldValue::from("yes")),
        Err(ElementError::FieldValueMismatch { .. })
    ));
    assert!(matches!(
        view.update_field(5, "object", FieldValue::from("x")),
        Err(ElementError::NoElementAt(5))
    ));
}

#[test]
fn test_dropdown_rejects_choices_outside_options() {
    let mut view = view_with(plugin(), |p, s| vec![ld(p, s, "p", "o")]);

    assert!(!view.update_field(0, "role", FieldValue::Choice("hero".into())).unwrap());
    assert!(view.update_field(0, "role", FieldValue::Choice("showcase".into())).unwrap());
    assert_eq!(
        view.controller(0).unwrap().values()["role"],
        FieldValue::Choice("showcase".into())
    );
}

#[test]
fn test_shape_change_remounts_controller() {
    let log = RenderLog::default();
    let mut view = view_with(recording_plugin(&log), |p, s| {
        vec![
            para("a"),
            element(p, s, EMBED, values(&[("url", FieldValue::from("https://x"))])),
        ]
    });
    assert_eq!(
        take(&log),
        vec![RenderEvent::Mount { element: EMBED.into(), pos: 3 }]
    );

    let ld_attrs = {
        let schema = view.state().schema().clone();
        ld(view.plugin(), &schema, "p", "o").attrs().clone()
    };
    let mut tr = view.state().tr();
    tr.set_node_markup(3, Some(LD), ld_attrs).unwrap();
    view.dispatch(tr).unwrap();

    assert_eq!(
        take(&log),
        vec![
            RenderEvent::Destroy { element: EMBED.into() },
            RenderEvent::Mount { element: LD.into(), pos: 3 },
        ]
    );
    let controller = view.controller(3).unwrap();
    assert_eq!(controller.element(), LD);
    assert_eq!(controller.field_value("predicate"), Some(&FieldValue::from("p")));
}

#[test]
fn test_controller_refuses_other_shapes_and_stays_destroyed() {
    let plugin = plugin();
    let schema = schema_for(&plugin);
    let embed = element(&plugin, &schema, EMBED, values(&[]));
    let other = ld(&plugin, &schema, "p", "o");
    let state = EditorState::new(Arc::clone(&schema), doc(vec![embed.clone()]));
    let spec = Arc::clone(plugin.element(EMBED).unwrap());

    let mut controller =
        ElementController::mount(spec, &embed, 0, &state, &DecorationSet::empty());
    assert_eq!(controller.lifecycle(), Lifecycle::Live);
    assert!(!controller.update(&other, 0, &state, &DecorationSet::empty()));
    assert!(controller.update(&embed, 0, &state, &DecorationSet::empty()));

    controller.destroy();
    controller.destroy();
    assert_eq!(controller.lifecycle(), Lifecycle::Destroyed);
    assert!(!controller.update(&embed, 0, &state, &DecorationSet::empty()));
    assert!(matches!(
        controller.input(&state, "url", FieldValue::from("x")),
        Err(ElementError::Destroyed)
    ));
    assert_eq!(controller.attr_correction(), None);
}

#[test]
fn test_duplicate_nested_editor_keeps_first() {
    let plugin = plugin();
    let schema = schema_for(&plugin);
    let caption = |text: &str| Node::branch("image__caption", Attrs::new(), vec![para(text)]);
    let alt = Node::branch("image__altText", Attrs::new(), vec![para("alt")]);
    let node = Node::branch(
        IMAGE,
        Attrs::new(),
        vec![caption("first"), caption("second"), alt],
    );
    let state = EditorState::new(Arc::clone(&schema), doc(vec![node.clone()]));
    let spec = Arc::clone(plugin.element(IMAGE).unwrap());

    let controller = ElementController::mount(spec, &node, 0, &state, &DecorationSet::empty());

    assert_eq!(controller.nested_count(), 2);
    let nested = controller.nested("caption").unwrap();
    assert_eq!(nested.offset(), 0);
    assert_eq!(nested.state().doc().text_content(), "first");
    assert_eq!(controller.nested("altText").unwrap().offset(), 19);
}

#[test]
fn test_nested_edit_patches_child_and_errors_in_one_edit() {
    let mut view = view_with(plugin(), |p, s| {
        vec![
            para("a"),
            element(
                p,
                s,
                IMAGE,
                values(&[
                    ("caption", rich(&["first"])),
                    ("src", FieldValue::from("a.png")),
                ]),
            ),
        ]
    });
    assert!(view.plugin_state().has_errors);
    assert_eq!(
        view.controller(3).unwrap().field_errors("altText")[0].message,
        "Alt text is required"
    );
    let version = view.state().version();

    let edited = view
        .edit_nested(3, "altText", |tr| {
            tr.insert(1, vec![Node::text("A cat")])?;
            tr.set_selection(Selection::cursor(6));
            Ok(())
        })
        .unwrap();

    assert!(edited);
    assert_eq!(view.state().version(), version + 1);
    assert_eq!(view.history().undo_depth(), 1);
    assert!(!view.plugin_state().has_errors);

    let controller = view.controller(3).unwrap();
    assert_eq!(controller.values()["altText"], rich(&["A cat"]));
    assert!(controller.field_errors("altText").is_empty());
    let nested = controller.nested("altText").unwrap();
    assert_eq!(nested.state().doc().text_content(), "A cat");
    assert_eq!(nested.state().selection().head, 6);
}

#[test]
fn test_nested_edit_of_scalar_field_is_rejected() {
    let mut view = view_with(plugin(), |p, s| vec![element(p, s, IMAGE, values(&[]))]);
    let result = view.edit_nested(0, "src", |_| Ok(()));
    assert!(matches!(&result, Err(ElementError::NotNested(field)) if field == "src"));
}

#[test]
fn test_rich_text_input_replaces_child() {
    let mut view = view_with(plugin(), |p, s| vec![element(p, s, IMAGE, values(&[]))]);

    assert!(view.update_field(0, "caption", rich(&["one", "two"])).unwrap());
    let node = view.state().doc().child(0).unwrap();
    assert_eq!(node.content()[0].child_count(), 2);
    assert_eq!(
        view.controller(0).unwrap().nested("caption").unwrap().state().doc().text_content(),
        "onetwo"
    );

    assert!(view.update_field(0, "caption", FieldValue::RichText(Vec::new())).unwrap());
    let node = view.state().doc().child(0).unwrap();
    assert_eq!(node.content()[0].child_count(), 1);
    assert_eq!(view.controller(0).unwrap().values()["caption"], rich(&[""]));
}

#[test]
fn test_undo_restores_field_value_in_view() {
    let mut view = view_with(plugin(), |p, s| vec![ld(p, s, "p", "before")]);

    view.update_field(0, "object", FieldValue::from("after")).unwrap();
    assert!(view.undo().unwrap());
    assert_eq!(
        view.controller(0).unwrap().field_value("object"),
        Some(&FieldValue::from("before"))
    );

    assert!(view.redo().unwrap());
    assert_eq!(
        view.controller(0).unwrap().field_value("object"),
        Some(&FieldValue::from("after"))
    );
    assert!(!view.redo().unwrap());
}

#[test]
fn test_stale_stored_errors_are_corrected_without_undo_step() {
    let plugin = plugin();
    let schema = schema_for(&plugin);
    let node = ld(&plugin, &schema, "", "o");
    let mut attrs = node.attrs().clone();
    attrs.insert("hasErrors".into(), serde_json::json!(false));
    attrs.insert("errors".into(), serde_json::json!({}));
    let stale = node.with_markup(LD, attrs, true);

    let view = view(plugin, vec![stale]);

    let node = view.state().doc().child(0).unwrap();
    assert_eq!(node.attr("hasErrors"), Some(&serde_json::json!(true)));
    assert_eq!(
        node.attr("errors"),
        Some(&serde_json::json!({
            "predicate": [{ "message": "Predicate is required", "level": "ERROR" }]
        }))
    );
    assert!(view.plugin_state().has_errors);
    assert!(!view.history().can_undo());
}
