pub mod codec;
pub mod cursor;
pub mod de;
pub mod describe;
pub mod descriptor;
pub mod error;
pub mod generics;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod ser;
pub mod value;

pub use codec::{Codec, CodecOptions};
pub use de::{Deserializer, deserialize};
pub use describe::Describe;
pub use descriptor::{EnumType, RecordField, RecordKind, RecordType, ScalarKind, TypeDescriptor};
pub use error::{BoxError, Error, Result};
pub use registry::{CustomFormat, CustomRegistry};
pub use schema::dict_type_representation;
pub use ser::{Serializer, serialize};
pub use value::{Dynamic, DynamicRecord, EnumMember, Opaque};

/// Serialize a typed value with default options and no custom formats.
pub fn to_tree<T: Describe>(value: &T) -> Result<serde_json::Value> {
    serialize(&value.to_dynamic(), None, true)
}

/// Deserialize a typed value with default options and no custom formats.
pub fn from_tree<T: Describe>(tree: &serde_json::Value) -> Result<T> {
    T::from_dynamic(deserialize(&T::descriptor(), tree, None)?)
}
