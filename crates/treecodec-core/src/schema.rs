//! Shape discovery: a read-only structural description of a descriptor.

use serde_json::{Map, Value};

use crate::cursor::Cursor;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::resolver::{self, Container};

/// Describe the shape of `ty`.
///
/// Records become objects of field shapes, mappings a single-entry object
/// `{key_shape: value_shape}`, sequences and sets a one-element array, tuples
/// an array of element shapes. Anything else prints as its canonical name.
pub fn dict_type_representation(ty: &TypeDescriptor) -> Result<Value> {
    shape(ty, &mut Cursor::new()).map_err(|source| Error::Discovery {
        type_name: ty.type_name(),
        source: Box::new(source),
    })
}

fn shape(ty: &TypeDescriptor, cursor: &mut Cursor) -> Result<Value> {
    if let Some(fields) = resolver::record_fields(ty) {
        let mut out = Map::new();
        for field in fields {
            cursor.enter(field.name.as_str())?;
            let field_shape = shape(&field.ty, cursor);
            cursor.exit();
            out.insert(field.name, field_shape?);
        }
        return Ok(Value::Object(out));
    }

    match resolver::container(ty) {
        Some(Container::Mapping(key, value)) => {
            cursor.enter("[key]")?;
            let key_shape = shape(key, cursor);
            let value_shape = key_shape.and_then(|k| shape(value, cursor).map(|v| (k, v)));
            cursor.exit();
            let (key_shape, value_shape) = value_shape?;
            let key_text = match key_shape {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Ok(Value::Object(Map::from_iter([(key_text, value_shape)])))
        }
        Some(Container::Sequence(element) | Container::Set(element)) => {
            cursor.enter("[0]")?;
            let element_shape = shape(element, cursor);
            cursor.exit();
            Ok(Value::Array(vec![element_shape?]))
        }
        Some(Container::Tuple(elements)) => {
            let mut out = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                cursor.enter(format!("[{i}]"))?;
                let element_shape = shape(element, cursor);
                cursor.exit();
                out.push(element_shape?);
            }
            Ok(Value::Array(out))
        }
        None => Ok(Value::String(ty.type_name())),
    }
}
