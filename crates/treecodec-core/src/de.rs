//! Tree to value conversion against a target descriptor.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::cursor::{Cursor, DEFAULT_MAX_DEPTH};
use crate::descriptor::{EnumType, RecordType, ScalarKind, TypeDescriptor};
use crate::error::{Error, Result};
use crate::registry::CustomRegistry;
use crate::resolver;
use crate::value::{Dynamic, DynamicRecord, EnumMember};

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// Recursive deserializer. Holds the registry for one call and tracks the
/// current path and depth.
#[derive(Debug)]
pub struct Deserializer<'r> {
    registry: Option<&'r CustomRegistry>,
    cursor: Cursor,
}

impl Default for Deserializer<'_> {
    fn default() -> Self {
        Deserializer {
            registry: None,
            cursor: Cursor::with_limit(DEFAULT_MAX_DEPTH),
        }
    }
}

impl<'r> Deserializer<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(mut self, registry: &'r CustomRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bound on nesting depth, counted in record fields and container
    /// elements below the top-level node.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.cursor = Cursor::with_limit(max_depth);
        self
    }

    pub fn deserialize(&mut self, ty: &TypeDescriptor, tree: &Value) -> Result<Dynamic> {
        self.node(ty, tree)
    }

    /// Run `f` one level deeper; the level is left again whatever `f` returns.
    fn descend<T>(
        &mut self,
        segment: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.cursor.enter(segment)?;
        let out = f(self);
        self.cursor.exit();
        out
    }

    fn node(&mut self, ty: &TypeDescriptor, tree: &Value) -> Result<Dynamic> {
        if let Some(registry) = self.registry {
            let name = registry_key(ty);
            if let Some(result) = registry.from_tree(&name, tree) {
                trace!(
                    type_name = %name,
                    path = %self.cursor.path(),
                    "Deserializing through custom format"
                );
                return result;
            }
        }

        match ty {
            TypeDescriptor::Scalar(ScalarKind::Any) => self.passthrough(tree),
            TypeDescriptor::Scalar(kind) => {
                coerce_scalar(*kind, tree).ok_or_else(|| Error::field_fail("", ty, tree))
            }
            TypeDescriptor::Placeholder(name) => {
                debug!(
                    placeholder = %name,
                    path = %self.cursor.path(),
                    "Unbound placeholder, passing tree through"
                );
                self.passthrough(tree)
            }
            TypeDescriptor::Opaque(name) => {
                debug!(
                    type_name = %name,
                    path = %self.cursor.path(),
                    "No custom format for opaque type, passing tree through"
                );
                self.passthrough(tree)
            }
            TypeDescriptor::Absent => match tree {
                Value::Null => Ok(Dynamic::Null),
                _ => Err(Error::field_fail("", ty, tree)),
            },
            TypeDescriptor::Optional(inner) => match tree {
                Value::Null => Ok(Dynamic::Null),
                _ => self.node(inner, tree),
            },
            TypeDescriptor::Record(def, _) => self.record(ty, def, tree),
            TypeDescriptor::Enumeration(def) => enumeration(ty, def, tree),
            TypeDescriptor::UnionOf(alternatives) => self.union(ty, alternatives, tree),
            TypeDescriptor::MappingOf(key, value) => self.mapping(ty, key, value, tree),
            TypeDescriptor::SequenceOf(element) => {
                self.elements(ty, element, tree).map(Dynamic::Sequence)
            }
            TypeDescriptor::SetOf(element) => {
                let items = self.elements(ty, element, tree)?;
                let mut unique: Vec<Dynamic> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Ok(Dynamic::Set(unique))
            }
            TypeDescriptor::TupleOf(elements) => self.tuple(ty, elements, tree),
        }
    }

    fn record(
        &mut self,
        ty: &TypeDescriptor,
        def: &Arc<RecordType>,
        tree: &Value,
    ) -> Result<Dynamic> {
        let Value::Object(entries) = tree else {
            return Err(Error::field_fail("", ty, tree));
        };

        let mut record = DynamicRecord::new(def.name());
        for field in resolver::record_fields(ty).unwrap_or_default() {
            let value = match entries.get(&field.name) {
                Some(raw) => self
                    .descend(field.name.as_str(), |de| de.node(&field.ty, raw))
                    .map_err(|e| e.in_field(&field.name, &field.ty, raw))?,
                None => match field.default {
                    Some(default) => default,
                    None if field.ty.is_optional() || field.ty == TypeDescriptor::Absent => {
                        Dynamic::Null
                    }
                    None => {
                        return Err(Error::MissingRequired {
                            field_name: field.name,
                            expected_type: field.ty.type_name(),
                            containing_type: ty.type_name(),
                        });
                    }
                },
            };
            record.insert(field.name, value);
        }
        Ok(Dynamic::Record(record))
    }

    /// First alternative in declared order wins.
    fn union(
        &mut self,
        ty: &TypeDescriptor,
        alternatives: &[TypeDescriptor],
        tree: &Value,
    ) -> Result<Dynamic> {
        for alternative in alternatives {
            match self.node(alternative, tree) {
                Ok(value) => return Ok(value),
                Err(e @ Error::DepthLimitExceeded { .. }) => return Err(e),
                Err(e) => {
                    trace!(alternative = %alternative, error = %e, "Union alternative rejected");
                }
            }
        }
        Err(Error::field_fail("", ty, tree))
    }

    fn mapping(
        &mut self,
        ty: &TypeDescriptor,
        key_ty: &TypeDescriptor,
        value_ty: &TypeDescriptor,
        tree: &Value,
    ) -> Result<Dynamic> {
        let Value::Object(entries) = tree else {
            return Err(Error::field_fail("", ty, tree));
        };
        let mut out = Vec::with_capacity(entries.len());
        for (raw_key, raw_value) in entries {
            let segment = format!("[{}]", Value::String(raw_key.clone()));
            let entry = self.descend(segment, |de| {
                let key = de.node(key_ty, &key_tree(key_ty, raw_key))?;
                let value = de.node(value_ty, raw_value)?;
                Ok((key, value))
            })?;
            out.push(entry);
        }
        Ok(Dynamic::Map(out))
    }

    fn elements(
        &mut self,
        ty: &TypeDescriptor,
        element: &TypeDescriptor,
        tree: &Value,
    ) -> Result<Vec<Dynamic>> {
        // An object here would otherwise be iterated by its keys.
        let Value::Array(items) = tree else {
            return Err(Error::field_fail("", ty, tree));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.descend(format!("[{i}]"), |de| de.node(element, item)))
            .collect()
    }

    fn tuple(
        &mut self,
        ty: &TypeDescriptor,
        elements: &[TypeDescriptor],
        tree: &Value,
    ) -> Result<Dynamic> {
        match tree {
            Value::Array(items) if items.len() == elements.len() => elements
                .iter()
                .zip(items)
                .enumerate()
                .map(|(i, (element, item))| {
                    self.descend(format!("[{i}]"), |de| de.node(element, item))
                })
                .collect::<Result<Vec<_>>>()
                .map(Dynamic::Tuple),
            _ => Err(Error::field_fail("", ty, tree)),
        }
    }

    /// Untyped conversion that still counts depth.
    fn passthrough(&mut self, tree: &Value) -> Result<Dynamic> {
        match tree {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.descend(format!("[{i}]"), |de| de.passthrough(item)))
                .collect::<Result<Vec<_>>>()
                .map(Dynamic::Sequence),
            Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| {
                    self.descend(k.as_str(), |de| {
                        Ok((Dynamic::Text(k.clone()), de.passthrough(v)?))
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Dynamic::Map),
            scalar => Ok(Dynamic::from_tree(scalar)),
        }
    }
}

/// Records are looked up by their bare name, matching the runtime name the
/// serializer uses; every other descriptor by its canonical name.
fn registry_key(ty: &TypeDescriptor) -> Cow<'_, str> {
    match ty {
        TypeDescriptor::Record(def, _) => Cow::Borrowed(def.name()),
        other => Cow::Owned(other.type_name()),
    }
}

fn enumeration(ty: &TypeDescriptor, def: &Arc<EnumType>, tree: &Value) -> Result<Dynamic> {
    tree.as_str()
        .and_then(|name| EnumMember::new(def.clone(), name))
        .map(Dynamic::Enum)
        .ok_or_else(|| Error::field_fail("", ty, tree))
}

/// Check a JSON primitive against a scalar kind, applying exact-only numeric
/// coercion: an integral float satisfies an integer, an integer satisfies a
/// float when it converts without loss. Booleans are never numbers.
pub fn coerce_scalar(kind: ScalarKind, tree: &Value) -> Option<Dynamic> {
    match (kind, tree) {
        (ScalarKind::Any, _) => Some(Dynamic::from_tree(tree)),
        (ScalarKind::Boolean, Value::Bool(b)) => Some(Dynamic::Bool(*b)),
        (ScalarKind::Text, Value::String(s)) => Some(Dynamic::Text(s.clone())),
        (ScalarKind::Integer, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Some(Dynamic::Int(i));
            }
            if !n.is_f64() {
                // u64 beyond the i64 range
                return None;
            }
            let f = n.as_f64()?;
            (f.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&f))
                .then(|| Dynamic::Int(f as i64))
        }
        (ScalarKind::Float, Value::Number(n)) => {
            if n.is_f64() {
                return n.as_f64().map(Dynamic::Float);
            }
            if let Some(i) = n.as_i64() {
                let f = i as f64;
                return (f < TWO_POW_63 && f as i64 == i).then_some(Dynamic::Float(f));
            }
            let u = n.as_u64()?;
            let f = u as f64;
            (f < TWO_POW_64 && f as u64 == u).then_some(Dynamic::Float(f))
        }
        _ => None,
    }
}

/// Tree form of an object key for the declared key type.
///
/// Text-like key types take the key verbatim. Other key types were written as
/// JSON text by the serializer and are parsed back; keys that are not valid
/// JSON stay text.
fn key_tree(key_ty: &TypeDescriptor, raw: &str) -> Value {
    match key_ty.without_optional() {
        TypeDescriptor::Scalar(ScalarKind::Text | ScalarKind::Any)
        | TypeDescriptor::Enumeration(_)
        | TypeDescriptor::Placeholder(_)
        | TypeDescriptor::Opaque(_) => Value::String(raw.to_string()),
        _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

/// Deserialize `tree` against `ty` with the default depth limit.
pub fn deserialize(
    ty: &TypeDescriptor,
    tree: &Value,
    registry: Option<&CustomRegistry>,
) -> Result<Dynamic> {
    let mut de = Deserializer::new();
    if let Some(registry) = registry {
        de = de.with_registry(registry);
    }
    de.deserialize(ty, tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(ScalarKind::Integer, json!(10), Some(Dynamic::Int(10)))]
    #[case(ScalarKind::Integer, json!(10.0), Some(Dynamic::Int(10)))]
    #[case(ScalarKind::Integer, json!(10.5), None)]
    #[case(ScalarKind::Integer, json!(true), None)]
    #[case(ScalarKind::Integer, json!(u64::MAX), None)]
    #[case(ScalarKind::Float, json!(3), Some(Dynamic::Float(3.0)))]
    #[case(ScalarKind::Float, json!(2.5), Some(Dynamic::Float(2.5)))]
    #[case(ScalarKind::Float, json!(9_007_199_254_740_993i64), None)]
    #[case(ScalarKind::Float, json!("3"), None)]
    #[case(ScalarKind::Boolean, json!(false), Some(Dynamic::Bool(false)))]
    #[case(ScalarKind::Boolean, json!(0), None)]
    #[case(ScalarKind::Text, json!("x"), Some(Dynamic::from("x")))]
    #[case(ScalarKind::Text, json!(null), None)]
    #[case(ScalarKind::Any, json!(u64::MAX), Some(Dynamic::UInt(u64::MAX)))]
    fn test_coerce_scalar(
        #[case] kind: ScalarKind,
        #[case] tree: Value,
        #[case] expected: Option<Dynamic>,
    ) {
        assert_eq!(coerce_scalar(kind, &tree), expected);
    }

    #[test]
    fn test_key_tree_parses_non_text_keys() {
        assert_eq!(key_tree(&TypeDescriptor::integer(), "12"), json!(12));
        assert_eq!(key_tree(&TypeDescriptor::text(), "12"), json!("12"));
        assert_eq!(
            key_tree(&TypeDescriptor::tuple(vec![TypeDescriptor::integer(); 2]), "[1,2]"),
            json!([1, 2])
        );
        assert_eq!(key_tree(&TypeDescriptor::integer(), "abc"), json!("abc"));
    }

    #[test]
    fn test_sequence_rejects_object_tree() {
        let ty = TypeDescriptor::sequence(TypeDescriptor::text());
        let err = deserialize(&ty, &json!({"a": 1}), None).unwrap_err();
        assert!(matches!(err, Error::FieldDeserializeFail { .. }));
    }

    #[test]
    fn test_set_deduplicates_keeping_first() {
        let ty = TypeDescriptor::set(TypeDescriptor::integer());
        let value = deserialize(&ty, &json!([3, 1, 3, 2, 1]), None).unwrap();
        match value {
            Dynamic::Set(items) => assert_eq!(
                items,
                vec![Dynamic::Int(3), Dynamic::Int(1), Dynamic::Int(2)]
            ),
            other => panic!("Expected a set, got {other:?}"),
        }
    }

    #[test]
    fn test_tuple_requires_exact_length() {
        let ty = TypeDescriptor::tuple(vec![TypeDescriptor::integer(), TypeDescriptor::text()]);
        assert_eq!(
            deserialize(&ty, &json!([1, "a"]), None).unwrap(),
            Dynamic::Tuple(vec![Dynamic::Int(1), Dynamic::from("a")])
        );
        assert!(deserialize(&ty, &json!([1]), None).is_err());
        assert!(deserialize(&ty, &json!([1, "a", 2]), None).is_err());
    }

    #[test]
    fn test_absent_accepts_only_null() {
        assert_eq!(
            deserialize(&TypeDescriptor::Absent, &Value::Null, None).unwrap(),
            Dynamic::Null
        );
        assert!(deserialize(&TypeDescriptor::Absent, &json!(0), None).is_err());
    }

    #[test]
    fn test_unbound_placeholder_passes_through() {
        let tree = json!({"anything": [1, "two"]});
        let value = deserialize(&TypeDescriptor::placeholder("T"), &tree, None).unwrap();
        assert_eq!(value, Dynamic::from_tree(&tree));
    }

    #[rstest]
    #[case(TypeDescriptor::any())]
    #[case(TypeDescriptor::placeholder("T"))]
    #[case(TypeDescriptor::opaque("Blob"))]
    fn test_passthrough_keeps_large_integers_exact(#[case] ty: TypeDescriptor) {
        let tree = json!({"id": u64::MAX, "big": [9_223_372_036_854_775_808u64]});
        let value = deserialize(&ty, &tree, None).unwrap();
        let out = crate::ser::serialize(&value, None, true).unwrap();
        assert_eq!(out, tree);
        assert_eq!(out.to_string(), tree.to_string());
    }

    #[test]
    fn test_depth_limit_on_passthrough() {
        let mut tree = json!(1);
        for _ in 0..10 {
            tree = json!([tree]);
        }
        let mut de = Deserializer::new().with_max_depth(5);
        let err = de.deserialize(&TypeDescriptor::any(), &tree).unwrap_err();
        assert!(matches!(err, Error::DepthLimitExceeded { limit: 5, .. }));
    }
}
