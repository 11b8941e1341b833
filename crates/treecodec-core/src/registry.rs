//! Custom format registry.
//!
//! Maps a type name to a pair of user hooks that convert values of that type
//! to and from trees. The serializer looks hooks up by a value's runtime type
//! name, the deserializer by the target descriptor:
//!
//! - records, generic or not, by their bare name (`Page`, never `Page[int]`),
//!   so one registration covers both directions for every instantiation;
//! - opaque types and enumerations by their declared name;
//! - anything else by its canonical name (`Sequence[int]`). Built-in
//!   containers have runtime names of their own (`list`, `dict`), so a hook
//!   registered under a canonical container name only fires on deserialize.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{BoxError, Error, Result};
use crate::value::{Dynamic, Opaque};

pub type SerializeFn =
    Arc<dyn Fn(&Dynamic) -> std::result::Result<Value, BoxError> + Send + Sync>;
pub type DeserializeFn =
    Arc<dyn Fn(&Value) -> std::result::Result<Dynamic, BoxError> + Send + Sync>;

/// The hooks registered for one type name. Either side may be missing.
#[derive(Clone, Default)]
pub struct CustomFormat {
    serialize: Option<SerializeFn>,
    deserialize: Option<DeserializeFn>,
}

impl CustomFormat {
    pub fn can_serialize(&self) -> bool {
        self.serialize.is_some()
    }

    pub fn can_deserialize(&self) -> bool {
        self.deserialize.is_some()
    }
}

/// Read-only during a call; cheap to clone.
#[derive(Clone, Default)]
pub struct CustomRegistry {
    formats: HashMap<String, CustomFormat>,
}

impl CustomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register both hooks for `type_name`, replacing any earlier ones.
    pub fn register<S, D>(&mut self, type_name: impl Into<String>, serialize: S, deserialize: D)
    where
        S: Fn(&Dynamic) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
        D: Fn(&Value) -> std::result::Result<Dynamic, BoxError> + Send + Sync + 'static,
    {
        self.formats.insert(
            type_name.into(),
            CustomFormat {
                serialize: Some(Arc::new(serialize)),
                deserialize: Some(Arc::new(deserialize)),
            },
        );
    }

    pub fn register_serializer<S>(&mut self, type_name: impl Into<String>, serialize: S)
    where
        S: Fn(&Dynamic) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.formats.entry(type_name.into()).or_default().serialize = Some(Arc::new(serialize));
    }

    pub fn register_deserializer<D>(&mut self, type_name: impl Into<String>, deserialize: D)
    where
        D: Fn(&Value) -> std::result::Result<Dynamic, BoxError> + Send + Sync + 'static,
    {
        self.formats.entry(type_name.into()).or_default().deserialize =
            Some(Arc::new(deserialize));
    }

    /// Register hooks for an opaque Rust type carried in [`Opaque`] values.
    ///
    /// The serializer hook fails when handed a value that is not a `T`.
    pub fn register_opaque<T, S, D>(&mut self, type_name: impl Into<String>, to: S, from: D)
    where
        T: Any + Send + Sync + PartialEq + fmt::Debug,
        S: Fn(&T) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
        D: Fn(&Value) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        let name = type_name.clone();
        let carried = type_name.clone();
        self.register(
            type_name,
            move |value: &Dynamic| match value {
                Dynamic::Opaque(o) => match o.downcast_ref::<T>() {
                    Some(inner) => to(inner),
                    None => Err(format!("opaque value is not a '{name}'").into()),
                },
                other => Err(format!(
                    "expected an opaque '{name}', got a {} value",
                    other.runtime_type_name()
                )
                .into()),
            },
            move |tree: &Value| {
                from(tree).map(|v| Dynamic::Opaque(Opaque::new(carried.clone(), v)))
            },
        );
    }

    pub fn get(&self, type_name: &str) -> Option<&CustomFormat> {
        self.formats.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.formats.contains_key(type_name)
    }

    pub fn has_serializer(&self, type_name: &str) -> bool {
        self.get(type_name).is_some_and(CustomFormat::can_serialize)
    }

    pub fn has_deserializer(&self, type_name: &str) -> bool {
        self.get(type_name).is_some_and(CustomFormat::can_deserialize)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Run the serializer hook for `type_name`, if one is registered.
    pub fn to_tree(&self, type_name: &str, value: &Dynamic) -> Option<Result<Value>> {
        let hook = self.get(type_name)?.serialize.as_ref()?;
        Some(hook(value).map_err(|e| hook_error(type_name, e)))
    }

    /// Run the deserializer hook for `type_name`, if one is registered.
    pub fn from_tree(&self, type_name: &str, tree: &Value) -> Option<Result<Dynamic>> {
        let hook = self.get(type_name)?.deserialize.as_ref()?;
        Some(hook(tree).map_err(|e| hook_error(type_name, e)))
    }
}

// Hooks that call back into the engine keep the engine's own error kinds.
fn hook_error(type_name: &str, e: BoxError) -> Error {
    match e.downcast::<Error>() {
        Ok(inner) => *inner,
        Err(source) => Error::Custom {
            type_name: type_name.to_string(),
            source,
        },
    }
}

impl fmt::Debug for CustomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.type_names().collect();
        names.sort_unstable();
        f.debug_struct("CustomRegistry")
            .field("type_names", &names)
            .finish()
    }
}

impl fmt::Debug for CustomFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomFormat")
            .field("serialize", &self.can_serialize())
            .field("deserialize", &self.can_deserialize())
            .finish()
    }
}
