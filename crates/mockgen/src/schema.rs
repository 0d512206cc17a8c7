//! Structural schema inference from example JSON values.
//!
//! Every object is registered under a name in a [`SchemaRegistry`] and
//! referenced with `$ref`. A name is registered once per pass: when a second,
//! differently shaped object arrives under a name that is already taken, it
//! reuses the first registration.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

const REF_PREFIX: &str = "#/components/schemas/";

/// JSON type name of a primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Null,
}

/// One node of an inferred schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Primitive(JsonType),
    Array(Box<SchemaNode>),
    /// Reference to a registered object schema, by name
    Ref(String),
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SchemaNode::Primitive(kind) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", kind)?;
                map.end()
            }
            SchemaNode::Array(items) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
                map.end()
            }
            SchemaNode::Ref(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$ref", &format!("{REF_PREFIX}{name}"))?;
                map.end()
            }
        }
    }
}

/// A registered object schema. Every property is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: BTreeMap<String, SchemaNode>,
    pub required: Vec<String>,
}

impl ObjectSchema {
    fn new(properties: BTreeMap<String, SchemaNode>) -> Self {
        let required = properties.keys().cloned().collect();
        Self {
            kind: "object",
            properties,
            required,
        }
    }
}

/// Named object schemas collected during one generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, ObjectSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ObjectSchema> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Infer the schema of `value`, registering objects under `name`.
    ///
    /// Arrays are inferred from their first element, or from an empty object
    /// when empty. Nested object properties are registered under their
    /// capitalized key.
    pub fn infer(&mut self, value: &Value, name: &str) -> SchemaNode {
        match value {
            Value::Array(items) => {
                let item = match items.first() {
                    Some(first) => self.infer(first, name),
                    None => self.infer(&Value::Object(Default::default()), name),
                };
                SchemaNode::Array(Box::new(item))
            }
            Value::Object(object) => {
                if !self.schemas.contains_key(name) {
                    let properties = object
                        .iter()
                        .map(|(key, child)| (key.clone(), self.infer(child, &capitalize(key))))
                        .collect();
                    self.schemas
                        .entry(name.to_string())
                        .or_insert_with(|| ObjectSchema::new(properties));
                }
                SchemaNode::Ref(name.to_string())
            }
            Value::String(_) => SchemaNode::Primitive(JsonType::String),
            Value::Number(_) => SchemaNode::Primitive(JsonType::Number),
            Value::Bool(_) => SchemaNode::Primitive(JsonType::Boolean),
            Value::Null => SchemaNode::Primitive(JsonType::Null),
        }
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primitives() {
        let mut registry = SchemaRegistry::new();
        assert_eq!(
            registry.infer(&json!("a"), "X"),
            SchemaNode::Primitive(JsonType::String)
        );
        assert_eq!(
            registry.infer(&json!(1.5), "X"),
            SchemaNode::Primitive(JsonType::Number)
        );
        assert_eq!(
            registry.infer(&json!(false), "X"),
            SchemaNode::Primitive(JsonType::Boolean)
        );
        assert_eq!(
            registry.infer(&json!(null), "X"),
            SchemaNode::Primitive(JsonType::Null)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_nested_objects_are_registered() {
        let mut registry = SchemaRegistry::new();
        let node = registry.infer(
            &json!({"token": "t", "user": {"id": 1, "name": "a"}}),
            "Login",
        );
        assert_eq!(node, SchemaNode::Ref("Login".to_string()));
        assert_eq!(registry.len(), 2);

        let login = registry.get("Login").unwrap();
        assert_eq!(login.required, vec!["token", "user"]);
        assert_eq!(login.properties["user"], SchemaNode::Ref("User".to_string()));
        assert_eq!(registry.get("User").unwrap().required, vec!["id", "name"]);
    }

    #[test]
    fn test_arrays_infer_from_first_element() {
        let mut registry = SchemaRegistry::new();
        let node = registry.infer(&json!([{"id": 1}, {"other": true}]), "Users");
        assert_eq!(
            node,
            SchemaNode::Array(Box::new(SchemaNode::Ref("Users".to_string())))
        );
        assert_eq!(registry.get("Users").unwrap().required, vec!["id"]);

        let empty = registry.infer(&json!([]), "Empty");
        assert_eq!(
            empty,
            SchemaNode::Array(Box::new(SchemaNode::Ref("Empty".to_string())))
        );
        assert!(registry.get("Empty").unwrap().properties.is_empty());
    }

    #[test]
    fn test_reused_name_keeps_first_registration() {
        // Documented limitation: a second shape under the same name silently
        // reuses the first schema instead of registering its own.
        let mut registry = SchemaRegistry::new();
        registry.infer(&json!({"id": 1, "name": "a"}), "Id");
        let node = registry.infer(&json!({"sku": "x", "price": 2}), "Id");

        assert_eq!(node, SchemaNode::Ref("Id".to_string()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Id").unwrap().required, vec!["id", "name"]);
    }

    #[test]
    fn test_serialization() {
        let mut registry = SchemaRegistry::new();
        let node = registry.infer(&json!([{"tags": ["a"]}]), "Post");
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "array", "items": {"$ref": "#/components/schemas/Post"}})
        );
        assert_eq!(
            serde_json::to_value(&registry).unwrap(),
            json!({
                "Post": {
                    "type": "object",
                    "properties": {"tags": {"type": "array", "items": {"type": "string"}}},
                    "required": ["tags"]
                }
            })
        );
    }
}
