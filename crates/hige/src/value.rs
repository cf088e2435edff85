//! Populating a [`Context`] from JSON data.
//!
//! - scalars become plain variables (`false` and `null` as the empty string)
//! - objects of scalars become `value` sections
//! - objects with nested structure become a single child scope
//! - arrays become one child scope per element

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};

use crate::context::{Binding, Context, ContextId};
use crate::error::{HigeError, Result};

/// Key that a scalar list element is bound to, read back with `{{.}}`.
pub const IMPLICIT_ITERATOR: &str = ".";

impl TryFrom<JsonValue> for Binding {
    type Error = HigeError;

    fn try_from(json: JsonValue) -> Result<Self> {
        if let Some(text) = scalar_text(&json) {
            return Ok(Binding::Text(text));
        }
        match json {
            JsonValue::Object(obj) => {
                flat_map(&obj)
                    .map(Binding::Map)
                    .ok_or_else(|| HigeError::UnsupportedBindingType {
                        message: "object with nested values cannot be a value section".to_string(),
                    })
            }
            other => Err(HigeError::UnsupportedBindingType {
                message: format!("cannot bind {} directly", type_name(&other)),
            }),
        }
    }
}

impl Context {
    /// Build a context whose root holds the members of a JSON object.
    pub fn from_json(data: JsonValue) -> Result<Self> {
        let mut context = Context::new();
        let root = context.root();
        context.extend_json(root, data)?;
        Ok(context)
    }

    /// Bind every member of a JSON object into scope `id`.
    pub fn extend_json(&mut self, id: ContextId, data: JsonValue) -> Result<()> {
        match data {
            JsonValue::Object(obj) => {
                self.bind_object(id, obj);
                Ok(())
            }
            other => Err(HigeError::UnsupportedBindingType {
                message: format!("Root data must be an object, got {}", type_name(&other)),
            }),
        }
    }

    fn bind_object(&mut self, id: ContextId, obj: Map<String, JsonValue>) {
        for (key, value) in obj {
            self.bind_json(id, key, value);
        }
    }

    fn bind_json(&mut self, id: ContextId, key: String, value: JsonValue) {
        match value {
            JsonValue::Object(obj) => match flat_map(&obj) {
                Some(map) => self.set_section(id, key, map),
                None => {
                    let child = self.add_child_context(id, key);
                    self.bind_object(child, obj);
                }
            },
            JsonValue::Array(items) => {
                self.reserve_children(id, key.as_str(), items.len());
                for item in items {
                    let child = self.add_child_context(id, key.as_str());
                    match item {
                        JsonValue::Object(obj) => self.bind_object(child, obj),
                        other => self.bind_json(child, IMPLICIT_ITERATOR.to_string(), other),
                    }
                }
            }
            scalar => {
                let text = scalar_text(&scalar).unwrap_or_default();
                self.set_variable(id, key, text);
            }
        }
    }
}

/// Canonical text of a scalar; `None` for arrays and objects.
fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null | JsonValue::Bool(false) => Some(String::new()),
        JsonValue::Bool(true) => Some("true".to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// The object as a string map, if every member is a scalar.
fn flat_map(obj: &Map<String, JsonValue>) -> Option<HashMap<String, String>> {
    obj.iter()
        .map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
        .collect()
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SectionKind;
    use serde_json::json;

    #[test]
    fn test_scalars_become_variables() {
        let ctx = Context::from_json(json!({
            "name": "Red Bull",
            "price": 275,
            "ratio": 1.5,
            "fresh": true,
            "stale": false,
            "nothing": null
        }))
        .unwrap();
        let root = ctx.root();

        assert_eq!(ctx.get(root, "name").unwrap(), "Red Bull");
        assert_eq!(ctx.get(root, "price").unwrap(), "275");
        assert_eq!(ctx.get(root, "ratio").unwrap(), "1.5");
        assert_eq!(ctx.get(root, "fresh").unwrap(), "true");
        assert_eq!(ctx.get(root, "stale").unwrap(), "");
        assert_eq!(ctx.get(root, "nothing").unwrap(), "");
    }

    #[test]
    fn test_flat_object_becomes_value_section() {
        let ctx = Context::from_json(json!({"drink": {"name": "tea", "cups": 2}})).unwrap();
        let root = ctx.root();

        assert_eq!(ctx.section_kind(root, "drink"), SectionKind::Value);
        let drink = ctx.fetch_value(root, "drink").unwrap();
        assert_eq!(drink["name"], "tea");
        assert_eq!(drink["cups"], "2");
    }

    #[test]
    fn test_nested_object_becomes_child_scope() {
        let ctx = Context::from_json(json!({"shop": {"name": "corner", "stock": ["a"]}})).unwrap();
        let root = ctx.root();

        let shop = ctx.fetch_list(root, "shop").unwrap();
        assert_eq!(shop.len(), 1);
        assert_eq!(ctx.get(shop[0], "name").unwrap(), "corner");
        assert_eq!(ctx.parent(shop[0]), Some(root));
        assert_eq!(ctx.fetch_list(shop[0], "stock").unwrap().len(), 1);
    }

    #[test]
    fn test_array_elements_become_children() {
        let ctx = Context::from_json(json!({
            "sub": [{"num": "100"}, {"num": "101"}],
            "tags": ["x", "y"],
            "empty": []
        }))
        .unwrap();
        let root = ctx.root();

        let sub = ctx.fetch_list(root, "sub").unwrap();
        assert_eq!(ctx.get(sub[0], "num").unwrap(), "100");
        assert_eq!(ctx.get(sub[1], "num").unwrap(), "101");

        let tags = ctx.fetch_list(root, "tags").unwrap();
        assert_eq!(ctx.get(tags[1], IMPLICIT_ITERATOR).unwrap(), "y");

        assert_eq!(ctx.section_kind(root, "empty"), SectionKind::List);
        assert!(ctx.fetch_list(root, "empty").unwrap().is_empty());
    }

    #[test]
    fn test_root_must_be_object() {
        let result = Context::from_json(json!([1, 2]));
        assert!(matches!(
            result,
            Err(HigeError::UnsupportedBindingType { .. })
        ));
    }

    #[test]
    fn test_set_with_json() {
        let mut ctx = Context::new();
        let root = ctx.root();
        ctx.set(root, "n", json!(3)).unwrap();
        ctx.set(root, "m", json!({"a": "b"})).unwrap();

        assert_eq!(ctx.get(root, "n").unwrap(), "3");
        assert_eq!(ctx.section_kind(root, "m"), SectionKind::Value);
        assert!(matches!(
            ctx.set(root, "list", json!([1])),
            Err(HigeError::UnsupportedBindingType { .. })
        ));
        assert!(matches!(
            ctx.set(root, "deep", json!({"a": {"b": "c"}})),
            Err(HigeError::UnsupportedBindingType { .. })
        ));
    }
}
