//! Dynamic values: the in-memory object graph walked by the serializer and
//! produced by the deserializer.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::describe::Describe;
use crate::descriptor::EnumType;
use crate::error::{Error, Result};

/// A value of any shape a [`crate::TypeDescriptor`] can describe.
#[derive(Debug, Clone)]
pub enum Dynamic {
    Null,
    Bool(bool),
    Int(i64),
    /// Integer above `i64::MAX`, kept exact.
    UInt(u64),
    Float(f64),
    Text(String),
    Record(DynamicRecord),
    Enum(EnumMember),
    Sequence(Vec<Dynamic>),
    /// Unordered; equality ignores element order.
    Set(Vec<Dynamic>),
    /// Ordered key/value pairs; equality ignores entry order.
    Map(Vec<(Dynamic, Dynamic)>),
    Tuple(Vec<Dynamic>),
    Opaque(Opaque),
}

impl Dynamic {
    /// Untyped conversion of a tree: objects become maps with text keys.
    ///
    /// Numbers keep their exact form: integers above the `i64` range become
    /// [`Dynamic::UInt`], only true floats become [`Dynamic::Float`].
    pub fn from_tree(tree: &Value) -> Dynamic {
        match tree {
            Value::Null => Dynamic::Null,
            Value::Bool(b) => Dynamic::Bool(*b),
            Value::Number(n) => number_to_dynamic(n),
            Value::String(s) => Dynamic::Text(s.clone()),
            Value::Array(items) => {
                Dynamic::Sequence(items.iter().map(Dynamic::from_tree).collect())
            }
            Value::Object(entries) => Dynamic::Map(
                entries
                    .iter()
                    .map(|(k, v)| (Dynamic::Text(k.clone()), Dynamic::from_tree(v)))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    /// Name of the value's exact runtime type, used for custom format lookup.
    pub fn runtime_type_name(&self) -> Cow<'_, str> {
        match self {
            Dynamic::Null => Cow::Borrowed("NoneType"),
            Dynamic::Bool(_) => Cow::Borrowed("bool"),
            Dynamic::Int(_) | Dynamic::UInt(_) => Cow::Borrowed("int"),
            Dynamic::Float(_) => Cow::Borrowed("float"),
            Dynamic::Text(_) => Cow::Borrowed("str"),
            Dynamic::Record(r) => Cow::Borrowed(r.type_name()),
            Dynamic::Enum(m) => Cow::Borrowed(m.enum_type().name()),
            Dynamic::Sequence(_) => Cow::Borrowed("list"),
            Dynamic::Set(_) => Cow::Borrowed("set"),
            Dynamic::Map(_) => Cow::Borrowed("dict"),
            Dynamic::Tuple(_) => Cow::Borrowed("tuple"),
            Dynamic::Opaque(o) => Cow::Borrowed(o.type_name()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Dynamic::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float view; integers convert.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Dynamic::Float(f) => Some(*f),
            Dynamic::Int(i) => Some(*i as f64),
            Dynamic::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&DynamicRecord> {
        match self {
            Dynamic::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumMember> {
        match self {
            Dynamic::Enum(m) => Some(m),
            _ => None,
        }
    }

    /// Take the record out of this value, or fail naming `expected`.
    pub fn into_record(self, expected: &str) -> Result<DynamicRecord> {
        match self {
            Dynamic::Record(r) => Ok(r),
            other => Err(other.conversion_error(expected)),
        }
    }

    /// Take the enumeration member out of this value, or fail naming `expected`.
    pub fn into_enum_member(self, expected: &str) -> Result<EnumMember> {
        match self {
            Dynamic::Enum(m) => Ok(m),
            other => Err(other.conversion_error(expected)),
        }
    }

    pub(crate) fn conversion_error(&self, expected: &str) -> Error {
        Error::Conversion {
            expected: expected.to_string(),
            found: format!("{} value", self.runtime_type_name()),
        }
    }
}

fn number_to_dynamic(n: &serde_json::Number) -> Dynamic {
    if let Some(i) = n.as_i64() {
        return Dynamic::Int(i);
    }
    match n.as_u64() {
        Some(u) => Dynamic::UInt(u),
        None => Dynamic::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Multiset equality for element lists whose order does not matter.
fn unordered_eq<T, F>(a: &[T], b: &[T], eq: F) -> bool
where
    F: Fn(&T, &T) -> bool,
{
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|x| {
        match b
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && eq(x, y))
        {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dynamic::Null, Dynamic::Null) => true,
            (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
            (Dynamic::Int(a), Dynamic::Int(b)) => a == b,
            (Dynamic::UInt(a), Dynamic::UInt(b)) => a == b,
            (Dynamic::Float(a), Dynamic::Float(b)) => a == b,
            (Dynamic::Text(a), Dynamic::Text(b)) => a == b,
            (Dynamic::Record(a), Dynamic::Record(b)) => a == b,
            (Dynamic::Enum(a), Dynamic::Enum(b)) => a == b,
            (Dynamic::Sequence(a), Dynamic::Sequence(b)) => a == b,
            (Dynamic::Tuple(a), Dynamic::Tuple(b)) => a == b,
            (Dynamic::Set(a), Dynamic::Set(b)) => unordered_eq(a, b, |x, y| x == y),
            (Dynamic::Map(a), Dynamic::Map(b)) => unordered_eq(a, b, |x, y| x == y),
            (Dynamic::Opaque(a), Dynamic::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Dynamic {
    fn from(b: bool) -> Self {
        Dynamic::Bool(b)
    }
}

impl From<i32> for Dynamic {
    fn from(i: i32) -> Self {
        Dynamic::Int(i64::from(i))
    }
}

impl From<i64> for Dynamic {
    fn from(i: i64) -> Self {
        Dynamic::Int(i)
    }
}

impl From<f64> for Dynamic {
    fn from(f: f64) -> Self {
        Dynamic::Float(f)
    }
}

impl From<&str> for Dynamic {
    fn from(s: &str) -> Self {
        Dynamic::Text(s.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(s: String) -> Self {
        Dynamic::Text(s)
    }
}

impl From<DynamicRecord> for Dynamic {
    fn from(r: DynamicRecord) -> Self {
        Dynamic::Record(r)
    }
}

impl From<Opaque> for Dynamic {
    fn from(o: Opaque) -> Self {
        Dynamic::Opaque(o)
    }
}

/// An instance of a record type: its type name and ordered field values.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    type_name: String,
    fields: IndexMap<String, Dynamic>,
}

impl DynamicRecord {
    pub fn new(type_name: impl Into<String>) -> Self {
        DynamicRecord {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Dynamic>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Dynamic>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.fields.get(name)
    }

    /// Remove a field, keeping the order of the others.
    pub fn take(&mut self, name: &str) -> Option<Dynamic> {
        self.fields.shift_remove(name)
    }

    /// Remove a field and convert it; a missing field converts from null.
    pub fn take_as<T: Describe>(&mut self, name: &str) -> Result<T> {
        T::from_dynamic(self.take(name).unwrap_or(Dynamic::Null))
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Dynamic)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A member of an enumeration, identified by name.
#[derive(Debug, Clone)]
pub struct EnumMember {
    ty: Arc<EnumType>,
    name: String,
}

impl EnumMember {
    /// Look up `name` in `ty`.
    pub fn new(ty: Arc<EnumType>, name: &str) -> Option<Self> {
        ty.contains(name).then(|| EnumMember {
            ty,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    /// The member's underlying value.
    pub fn value(&self) -> Option<&Dynamic> {
        self.ty.value_of(&self.name)
    }
}

impl PartialEq for EnumMember {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name() == other.ty.name() && self.name == other.name
    }
}

type OpaqueEq = fn(&dyn Any, &dyn Any) -> bool;
type OpaqueFmt = fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result;

/// A value the engine cannot decompose, carried alongside its type name.
///
/// Only a custom format registered under [`Opaque::type_name`] can turn it
/// into a tree.
#[derive(Clone)]
pub struct Opaque {
    type_name: String,
    value: Arc<dyn Any + Send + Sync>,
    eq: OpaqueEq,
    fmt: OpaqueFmt,
}

fn opaque_eq<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn opaque_fmt<T: Any + fmt::Debug>(v: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match v.downcast_ref::<T>() {
        Some(v) => v.fmt(f),
        None => f.write_str("<opaque>"),
    }
}

impl Opaque {
    pub fn new<T>(type_name: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync + PartialEq + fmt::Debug,
    {
        Opaque {
            type_name: type_name.into(),
            value: Arc::new(value),
            eq: opaque_eq::<T>,
            fmt: opaque_fmt::<T>,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && (self.eq)(&*self.value, &*other.value)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>(", self.type_name)?;
        (self.fmt)(&*self.value, f)?;
        f.write_str(")")
    }
}
