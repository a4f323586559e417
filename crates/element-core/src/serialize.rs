//! Persisted document forms.
//!
//! Two encodings are supported:
//!
//! - the JSON document form, `{"type", "attrs"?, "content"?, "text"?}` per node,
//! - attribute pairs for markup-based storage, where every attribute becomes a string: string
//!   values are stored as-is and everything else (field objects, error lists, flags) as JSON.
//!
//! Decoding validates against a [`Schema`]: unknown node types, missing attributes and invalid
//! content are rejected.

use crate::error::{SchemaError, SerializeError};
use crate::model::{Attrs, Node, TEXT_NODE};
use crate::schema::Schema;
use serde_json::{Map, Value};

/// JSON form of a node.
pub fn node_to_json(node: &Node) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(node.type_name().to_string()));
    if let Some(text) = node.text_str() {
        obj.insert("text".to_string(), Value::String(text.to_string()));
        return Value::Object(obj);
    }
    if !node.attrs().is_empty() {
        obj.insert("attrs".to_string(), Value::Object(node.attrs().clone()));
    }
    if !node.content().is_empty() {
        obj.insert(
            "content".to_string(),
            Value::Array(node.content().iter().map(node_to_json).collect()),
        );
    }
    Value::Object(obj)
}

/// Decode a node from its JSON form.
pub fn node_from_json(schema: &Schema, json: &Value) -> Result<Node, SerializeError> {
    let obj = json
        .as_object()
        .ok_or_else(|| SerializeError::Malformed("node is not an object".to_string()))?;
    let type_name = obj
        .get("type")
        .ok_or(SerializeError::MissingKey("type"))?
        .as_str()
        .ok_or_else(|| SerializeError::Malformed("'type' is not a string".to_string()))?;

    if type_name == TEXT_NODE {
        let text = obj
            .get("text")
            .ok_or(SerializeError::MissingKey("text"))?
            .as_str()
            .ok_or_else(|| SerializeError::Malformed("'text' is not a string".to_string()))?;
        return Ok(schema.text(text));
    }

    let attrs = match obj.get("attrs") {
        None | Some(Value::Null) => Attrs::new(),
        Some(Value::Object(attrs)) => attrs.clone(),
        Some(_) => {
            return Err(SerializeError::Malformed(format!(
                "'attrs' of '{type_name}' is not an object"
            )));
        }
    };
    let content = match obj.get("content") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| node_from_json(schema, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(SerializeError::Malformed(format!(
                "'content' of '{type_name}' is not an array"
            )));
        }
    };
    Ok(schema.node(type_name, &attrs, content)?)
}

/// Serialize a document to a JSON string.
pub fn doc_to_string(doc: &Node) -> Result<String, SerializeError> {
    Ok(serde_json::to_string(&node_to_json(doc))?)
}

/// Parse a document from a JSON string.
pub fn doc_from_str(schema: &Schema, text: &str) -> Result<Node, SerializeError> {
    let json: Value = serde_json::from_str(text)?;
    let doc = node_from_json(schema, &json)?;
    if doc.type_name() != schema.top_node() {
        return Err(SerializeError::Malformed(format!(
            "expected a '{}' document, found '{}'",
            schema.top_node(),
            doc.type_name()
        )));
    }
    Ok(doc)
}

/// Encode attributes as string pairs.
pub fn encode_attrs(attrs: &Attrs) -> Vec<(String, String)> {
    attrs
        .iter()
        .map(|(name, value)| {
            let encoded = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (name.clone(), encoded)
        })
        .collect()
}

/// Decode string pairs into the attributes of a `node_type` node.
///
/// An attribute whose declared default is a string is taken verbatim; any other attribute is
/// parsed as JSON.
pub fn decode_attrs(
    schema: &Schema,
    node_type: &str,
    pairs: &[(String, String)],
) -> Result<Attrs, SerializeError> {
    let spec = schema
        .node_spec(node_type)
        .ok_or_else(|| SchemaError::UnknownNodeType(node_type.to_string()))?;
    let mut attrs = Attrs::new();
    for (name, raw) in pairs {
        let Some(attr) = spec.attrs.get(name) else {
            return Err(SerializeError::Malformed(format!(
                "'{node_type}' has no attribute '{name}'"
            )));
        };
        let value = match &attr.default {
            Some(Value::String(_)) => Value::String(raw.clone()),
            _ => serde_json::from_str(raw)?,
        };
        attrs.insert(name.clone(), value);
    }
    Ok(schema.compute_attrs(node_type, &attrs)?)
}
