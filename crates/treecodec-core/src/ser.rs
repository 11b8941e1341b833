//! Value to tree conversion.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use tracing::trace;

use crate::error::{Error, Result};
use crate::registry::CustomRegistry;
use crate::value::Dynamic;

/// Walks a [`Dynamic`] value and produces its JSON tree.
///
/// Output key order follows record field declaration order and mapping
/// insertion order, so equal inputs give byte-identical output.
#[derive(Debug, Clone, Copy)]
pub struct Serializer<'r> {
    registry: Option<&'r CustomRegistry>,
    omit_nulls: bool,
}

impl Default for Serializer<'_> {
    fn default() -> Self {
        Serializer {
            registry: None,
            omit_nulls: true,
        }
    }
}

impl<'r> Serializer<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: &'r CustomRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Drop null-valued record fields and mapping entries (default `true`).
    pub fn omit_nulls(mut self, omit: bool) -> Self {
        self.omit_nulls = omit;
        self
    }

    pub fn serialize(&self, value: &Dynamic) -> Result<Value> {
        if let Some(registry) = self.registry {
            let name = value.runtime_type_name();
            if let Some(result) = registry.to_tree(&name, value) {
                trace!(type_name = %name, "Serializing through custom format");
                return result;
            }
        }

        match value {
            Dynamic::Null => Ok(Value::Null),
            Dynamic::Bool(b) => Ok(Value::Bool(*b)),
            Dynamic::Int(i) => Ok(Value::from(*i)),
            Dynamic::UInt(u) => Ok(Value::from(*u)),
            Dynamic::Float(f) => Ok(Number::from_f64(*f).map_or(Value::Null, Value::Number)),
            Dynamic::Text(s) => Ok(Value::String(s.clone())),
            Dynamic::Record(record) => {
                let mut out = Map::new();
                for (name, field) in record.fields() {
                    if self.omit_nulls && field.is_null() {
                        continue;
                    }
                    out.insert(name.to_string(), self.serialize(field)?);
                }
                Ok(Value::Object(out))
            }
            Dynamic::Map(entries) => {
                let mut out = Map::new();
                let mut origins: HashMap<String, Value> = HashMap::with_capacity(entries.len());
                for (key, item) in entries {
                    if self.omit_nulls && item.is_null() {
                        continue;
                    }
                    let key_tree = self.serialize(key)?;
                    let text = key_text(&key_tree);
                    if let Some(first) = origins.get(&text) {
                        return Err(Error::KeyCollision {
                            key: text,
                            first: first.clone(),
                            second: key_tree,
                        });
                    }
                    out.insert(text.clone(), self.serialize(item)?);
                    origins.insert(text, key_tree);
                }
                Ok(Value::Object(out))
            }
            Dynamic::Sequence(items) | Dynamic::Set(items) | Dynamic::Tuple(items) => items
                .iter()
                .map(|item| self.serialize(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Dynamic::Enum(member) => Ok(Value::String(member.name().to_string())),
            Dynamic::Opaque(o) => Err(Error::NoCustomFormat {
                type_name: o.type_name().to_string(),
            }),
        }
    }
}

/// Object keys are text: text trees are used as is, anything else as its
/// JSON rendering.
fn key_text(tree: &Value) -> String {
    match tree {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serialize `value` into a tree.
pub fn serialize(
    value: &Dynamic,
    registry: Option<&CustomRegistry>,
    omit_nulls: bool,
) -> Result<Value> {
    let mut serializer = Serializer::new().omit_nulls(omit_nulls);
    if let Some(registry) = registry {
        serializer = serializer.with_registry(registry);
    }
    serializer.serialize(value)
}
