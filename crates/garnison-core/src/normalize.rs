//! Entity normalization at the content API boundary.
//!
//! Strapi answers with three shapes for the same record depending on the
//! endpoint and on whether the record is nested as a relation:
//!
//! - flat: `{ "id": 1, "nom": "..." }`
//! - attributes: `{ "id": 1, "attributes": { "nom": "..." } }`
//! - wrapped: `{ "data": { "id": 1, "attributes": { ... } } }`
//!
//! [`Entity`] hides the difference and offers lenient typed accessors.
//! Every model implements [`Normalize`] on top of it, so the rest of the
//! crate only ever sees one flat shape. Normalization never fails: a
//! missing field yields an empty default.

use serde_json::{Map, Value};

/// A raw record with its wrapping peeled off
#[derive(Debug, Clone, Copy, Default)]
pub struct Entity<'a> {
    pub id: Option<i64>,
    fields: Option<&'a Map<String, Value>>,
}

impl<'a> Entity<'a> {
    /// Peel `data` and `attributes` wrappers off a raw value.
    pub fn unwrap(raw: &'a Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::default();
        };

        // `{ data: {...} }` or `{ data: null }` relation wrapper
        if let Some(data) = obj.get("data") {
            if !obj.contains_key("id") && (data.is_object() || data.is_null()) {
                return Self::unwrap(data);
            }
        }

        let id = obj.get("id").and_then(value_as_i64);
        match obj.get("attributes").and_then(Value::as_object) {
            Some(attributes) => Self {
                id,
                fields: Some(attributes),
            },
            None => Self {
                id,
                fields: Some(obj),
            },
        }
    }

    /// True when nothing usable was found (null, missing, or `{ data: null }`)
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.fields.map(Map::is_empty).unwrap_or(true)
    }

    /// First present value among `keys`; nulls and blank strings fall
    /// through to the next alias
    pub fn get(&self, keys: &[&str]) -> Option<&'a Value> {
        let fields = self.fields?;
        keys.iter()
            .filter_map(|k| fields.get(*k))
            .find(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
    }

    /// Text field; numbers are rendered, anything else is empty
    pub fn text(&self, keys: &[&str]) -> String {
        match self.get(keys) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    pub fn integer(&self, keys: &[&str]) -> Option<i64> {
        self.get(keys).and_then(value_as_i64)
    }

    pub fn float(&self, keys: &[&str]) -> Option<f64> {
        match self.get(keys)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn boolean(&self, keys: &[&str]) -> bool {
        match self.get(keys) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(false),
            Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "1" | "oui" | "yes"),
            _ => false,
        }
    }

    /// Single related entity. A to-many relation yields its first item.
    pub fn nested(&self, keys: &[&str]) -> Option<Entity<'a>> {
        let value = self.get(keys)?;
        let first = match items(value).first() {
            Some(item) if is_list(value) => item,
            _ => value,
        };
        let entity = Entity::unwrap(first);
        (!entity.is_empty()).then_some(entity)
    }

    /// All related entities of a to-many relation
    pub fn nested_list(&self, keys: &[&str]) -> Vec<Entity<'a>> {
        let Some(value) = self.get(keys) else {
            return Vec::new();
        };
        if is_list(value) {
            items(value)
                .iter()
                .map(Entity::unwrap)
                .filter(|e| !e.is_empty())
                .collect()
        } else {
            let entity = Entity::unwrap(value);
            if entity.is_empty() {
                Vec::new()
            } else {
                vec![entity]
            }
        }
    }
}

/// A type that can be built from any of the raw record shapes.
pub trait Normalize: Sized {
    fn from_entity(entity: &Entity<'_>) -> Self;

    fn normalize(raw: &Value) -> Self {
        Self::from_entity(&Entity::unwrap(raw))
    }
}

/// Normalize a single record
pub fn normalize<T: Normalize>(raw: &Value) -> T {
    T::normalize(raw)
}

/// Normalize a collection given as a bare array or a `{ data: [...] }` envelope.
pub fn normalize_collection<T: Normalize>(raw: &Value) -> Vec<T> {
    items(raw).iter().map(T::normalize).collect()
}

/// Items of a list value, looking through a `data` envelope
pub fn items(raw: &Value) -> &[Value] {
    match raw {
        Value::Array(list) => list,
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(list)) => list,
            _ => &[],
        },
        _ => &[],
    }
}

fn is_list(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(obj) => matches!(obj.get("data"), Some(Value::Array(_))),
        _ => false,
    }
}

fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
