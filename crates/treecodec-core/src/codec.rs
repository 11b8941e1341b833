//! A configured engine: options plus custom format registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cursor::DEFAULT_MAX_DEPTH;
use crate::de::Deserializer;
use crate::describe::Describe;
use crate::descriptor::TypeDescriptor;
use crate::error::Result;
use crate::registry::CustomRegistry;
use crate::schema::dict_type_representation;
use crate::ser::Serializer;
use crate::value::Dynamic;

/// Codec settings, as read from the `[codec]` table of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Drop null-valued record fields and mapping entries when serializing.
    pub omit_nulls: bool,
    /// Deserializer nesting limit.
    pub max_depth: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            omit_nulls: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Codec {
    options: CodecOptions,
    registry: CustomRegistry,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: CodecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: CustomRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn registry(&self) -> &CustomRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CustomRegistry {
        &mut self.registry
    }

    pub fn serialize(&self, value: &Dynamic) -> Result<Value> {
        Serializer::new()
            .with_registry(&self.registry)
            .omit_nulls(self.options.omit_nulls)
            .serialize(value)
    }

    pub fn deserialize(&self, ty: &TypeDescriptor, tree: &Value) -> Result<Dynamic> {
        Deserializer::new()
            .with_registry(&self.registry)
            .with_max_depth(self.options.max_depth)
            .deserialize(ty, tree)
    }

    pub fn to_tree<T: Describe>(&self, value: &T) -> Result<Value> {
        self.serialize(&value.to_dynamic())
    }

    pub fn from_tree<T: Describe>(&self, tree: &Value) -> Result<T> {
        T::from_dynamic(self.deserialize(&T::descriptor(), tree)?)
    }

    pub fn schema_of<T: Describe>(&self) -> Result<Value> {
        dict_type_representation(&T::descriptor())
    }
}
