#![allow(dead_code)]

use element_core::{
    Attrs, DecorationSource, DropdownOption, EditorState, EditorView, ElementData, ElementPlugin,
    ElementPluginBuilder, ElementRenderer, ElementSpec, FieldErrors, FieldSpec, FieldSpecs,
    FieldValue, FieldValues, HistoryConfig, Node, RenderContext, Schema, SchemaSpec,
    ValidationError, required,
};
use std::sync::{Arc, Mutex};

pub const LD: &str = "ld";
pub const IMAGE: &str = "image";
pub const EMBED: &str = "embed";

pub const DEFAULT_SUBJECT: &str = "urn:subject:self";
pub const DEFAULT_GRAPH: &str = "urn:graph:default";

/// What a recording renderer saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Mount { element: String, pos: usize },
    Update { element: String, pos: usize, has_errors: bool },
    Destroy { element: String },
}

pub type RenderLog = Arc<Mutex<Vec<RenderEvent>>>;

struct RecordingRenderer {
    element: String,
    log: RenderLog,
}

impl ElementRenderer for RecordingRenderer {
    fn mount(&mut self, ctx: &RenderContext<'_>) {
        self.log.lock().unwrap().push(RenderEvent::Mount {
            element: ctx.element.to_string(),
            pos: ctx.pos,
        });
    }

    fn update(&mut self, ctx: &RenderContext<'_>) {
        self.log.lock().unwrap().push(RenderEvent::Update {
            element: ctx.element.to_string(),
            pos: ctx.pos,
            has_errors: ctx.has_errors,
        });
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().push(RenderEvent::Destroy {
            element: self.element.clone(),
        });
    }
}

fn recording(spec: ElementSpec, log: &RenderLog) -> ElementSpec {
    let log = Arc::clone(log);
    spec.with_view(Arc::new(move |spec: &ElementSpec| {
        Box::new(RecordingRenderer {
            element: spec.name().to_string(),
            log: Arc::clone(&log),
        }) as Box<dyn ElementRenderer>
    }))
}

/// Linked-data triple: four text fields, two of them absent when empty.
pub fn ld_spec() -> ElementSpec {
    let mut fields = FieldSpecs::new();
    fields.insert(
        "subject".into(),
        FieldSpec::text()
            .absent_on_empty()
            .with_default(FieldValue::from(DEFAULT_SUBJECT)),
    );
    fields.insert(
        "predicate".into(),
        FieldSpec::text().with_validator(required("Predicate is required")),
    );
    fields.insert("object".into(), FieldSpec::text().with_rows(3));
    fields.insert(
        "graph".into(),
        FieldSpec::text()
            .absent_on_empty()
            .with_default(FieldValue::from(DEFAULT_GRAPH)),
    );
    fields.insert("html".into(), FieldSpec::checkbox(false));
    fields.insert(
        "role".into(),
        FieldSpec::dropdown(
            "inline",
            vec![
                DropdownOption::new("Inline", "inline"),
                DropdownOption::new("Showcase", "showcase"),
            ],
        ),
    );
    ElementSpec::new(LD, fields).unwrap()
}

/// Image with two rich-text fields and an element-level alt text rule.
pub fn image_spec() -> ElementSpec {
    let mut fields = FieldSpecs::new();
    fields.insert("caption".into(), FieldSpec::rich_text());
    fields.insert(
        "altText".into(),
        FieldSpec::rich_text().with_content("paragraph"),
    );
    fields.insert(
        "src".into(),
        FieldSpec::text().with_validator(required("Source is required")),
    );
    fields.insert("useSrc".into(), FieldSpec::checkbox(false));
    ElementSpec::new(IMAGE, fields)
        .unwrap()
        .with_validator(Arc::new(|values: &FieldValues| {
            let mut errors = FieldErrors::new();
            if values.get("altText").is_none_or(FieldValue::is_empty) {
                errors.insert(
                    "altText".into(),
                    vec![ValidationError::error("Alt text is required")],
                );
            }
            errors
        }))
}

/// A leaf element with one text field.
pub fn embed_spec() -> ElementSpec {
    let mut fields = FieldSpecs::new();
    fields.insert("url".into(), FieldSpec::text());
    ElementSpec::new(EMBED, fields).unwrap()
}

pub fn plugin() -> ElementPlugin {
    ElementPluginBuilder::new()
        .element(ld_spec())
        .element(image_spec())
        .element(embed_spec())
        .build()
        .unwrap()
}

pub fn recording_plugin(log: &RenderLog) -> ElementPlugin {
    ElementPluginBuilder::new()
        .element(recording(ld_spec(), log))
        .element(recording(image_spec(), log))
        .element(recording(embed_spec(), log))
        .build()
        .unwrap()
}

pub fn decorated_plugin(source: DecorationSource) -> ElementPlugin {
    ElementPluginBuilder::new()
        .element(ld_spec())
        .element(image_spec())
        .element(embed_spec())
        .decorations(source)
        .build()
        .unwrap()
}

pub fn schema_for(plugin: &ElementPlugin) -> Arc<Schema> {
    let mut spec = SchemaSpec::basic();
    plugin.extend_schema(&mut spec).unwrap();
    Arc::new(Schema::new(spec).unwrap())
}

pub fn para(text: &str) -> Node {
    let content = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    Node::branch("paragraph", Attrs::new(), content)
}

pub fn doc(content: Vec<Node>) -> Node {
    Node::branch("doc", Attrs::new(), content)
}

pub fn values(pairs: &[(&str, FieldValue)]) -> FieldValues {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn rich(texts: &[&str]) -> FieldValue {
    FieldValue::RichText(texts.iter().map(|t| para(t)).collect())
}

/// Build a stored element node, validation attributes included.
pub fn element(plugin: &ElementPlugin, schema: &Schema, name: &str, values: FieldValues) -> Node {
    let data = ElementData {
        element_name: name.to_string(),
        values,
    };
    plugin.node_from_element_data(&data, schema).unwrap()
}

pub fn ld(plugin: &ElementPlugin, schema: &Schema, predicate: &str, object: &str) -> Node {
    element(
        plugin,
        schema,
        LD,
        values(&[
            ("predicate", FieldValue::from(predicate)),
            ("object", FieldValue::from(object)),
        ]),
    )
}

pub fn view(plugin: ElementPlugin, content: Vec<Node>) -> EditorView {
    let schema = schema_for(&plugin);
    let state = EditorState::new(schema, doc(content));
    EditorView::new(state, plugin, HistoryConfig::default()).unwrap()
}

/// Build a view whose document is produced from the view's own schema.
pub fn view_with<F>(plugin: ElementPlugin, build: F) -> EditorView
where
    F: FnOnce(&ElementPlugin, &Schema) -> Vec<Node>,
{
    let schema = schema_for(&plugin);
    let content = build(&plugin, &schema);
    let state = EditorState::new(schema, doc(content));
    EditorView::new(state, plugin, HistoryConfig::default()).unwrap()
}

pub fn take(log: &RenderLog) -> Vec<RenderEvent> {
    std::mem::take(&mut *log.lock().unwrap())
}
