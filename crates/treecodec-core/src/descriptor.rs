//! Type descriptors.
//!
//! A [`TypeDescriptor`] is the engine's tagged description of a target shape.
//! Descriptors are plain immutable data: record and enumeration definitions
//! are shared behind an [`Arc`] so that instantiating a generic record with
//! different arguments does not copy its field list.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use treecodec_core::{RecordType, TypeDescriptor};
//!
//! let name = RecordType::new("Name")
//!     .field("first", TypeDescriptor::text())
//!     .field("middle", TypeDescriptor::optional(TypeDescriptor::text()));
//! let t = TypeDescriptor::record(Arc::new(name));
//! assert_eq!(t.type_name(), "Name");
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Dynamic;

/// The JSON-primitive scalar kinds plus the unconstrained `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Integer,
    Float,
    Boolean,
    Text,
    Any,
}

impl ScalarKind {
    /// Canonical printable name of this scalar kind.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Integer => "int",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "bool",
            ScalarKind::Text => "str",
            ScalarKind::Any => "Any",
        }
    }
}

/// How a record type is declared.
///
/// Both kinds expose the same `(name, type, default)` field view; the kind is
/// kept only so callers can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Immutable field tuple with named accessors.
    NamedTuple,
    /// Declared-field struct.
    #[default]
    Struct,
}

/// A field in a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    name: String,
    ty: TypeDescriptor,
    default: Option<Dynamic>,
}

impl RecordField {
    /// Create a field with no default.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        RecordField {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Attach a default value. A null default is the same as no default.
    pub fn with_default(mut self, default: Dynamic) -> Self {
        self.default = (!default.is_null()).then_some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, which may still reference the record's placeholders.
    pub fn ty(&self) -> &TypeDescriptor {
        &self.ty
    }

    pub fn default(&self) -> Option<&Dynamic> {
        self.default.as_ref()
    }
}

/// Definition of a record type: name, placeholders and ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    name: String,
    kind: RecordKind,
    params: Vec<String>,
    fields: Vec<RecordField>,
}

impl RecordType {
    /// Start a struct-kind record definition.
    pub fn new(name: impl Into<String>) -> Self {
        RecordType {
            name: name.into(),
            kind: RecordKind::Struct,
            params: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Start a named-tuple-kind record definition.
    pub fn named_tuple(name: impl Into<String>) -> Self {
        RecordType {
            kind: RecordKind::NamedTuple,
            ..RecordType::new(name)
        }
    }

    /// Declare the next generic placeholder.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Append a field with no default.
    pub fn field(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.with_field(RecordField::new(name, ty))
    }

    /// Append a field with an optional default.
    pub fn field_with_default(
        self,
        name: impl Into<String>,
        ty: TypeDescriptor,
        default: Option<Dynamic>,
    ) -> Self {
        let field = RecordField::new(name, ty);
        match default {
            Some(d) => self.with_field(field.with_default(d)),
            None => self.with_field(field),
        }
    }

    /// Append a field; a field with the same name is replaced in place.
    pub fn with_field(mut self, field: RecordField) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Declared placeholders, in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    pub fn field_named(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Definition of an enumeration: ordered member names and their values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    name: String,
    members: IndexMap<String, Dynamic>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        EnumType {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    /// Build an enumeration whose member values count up from 1.
    pub fn from_names<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        members
            .into_iter()
            .zip(1i64..)
            .fold(EnumType::new(name), |e, (m, v)| e.member(m, Dynamic::Int(v)))
    }

    /// Add a member. Member values may be any dynamic value, including opaque
    /// ones that have no tree form.
    pub fn member(mut self, name: impl Into<String>, value: Dynamic) -> Self {
        self.members.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Dynamic)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn value_of(&self, member: &str) -> Option<&Dynamic> {
        self.members.get(member)
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains_key(member)
    }
}

/// A description of a target shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// JSON scalar or unconstrained value.
    Scalar(ScalarKind),

    /// Record type together with its (possibly empty) type arguments.
    Record(Arc<RecordType>, Vec<TypeDescriptor>),

    /// Enumeration whose members are identified by name.
    Enumeration(Arc<EnumType>),

    /// Either the null marker or a value of the inner type.
    Optional(Box<TypeDescriptor>),

    /// Ordered alternatives, probed first to last. Never contains `Absent`.
    UnionOf(Vec<TypeDescriptor>),

    /// Homogeneous ordered collection.
    SequenceOf(Box<TypeDescriptor>),

    /// Homogeneous unordered collection.
    SetOf(Box<TypeDescriptor>),

    /// Homogeneous key/value collection.
    MappingOf(Box<TypeDescriptor>, Box<TypeDescriptor>),

    /// Fixed-length heterogeneous sequence.
    TupleOf(Vec<TypeDescriptor>),

    /// Unresolved generic parameter.
    Placeholder(String),

    /// The null marker type.
    Absent,

    /// Named type only convertible through a custom format.
    Opaque(String),
}

impl TypeDescriptor {
    pub fn integer() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Integer)
    }

    pub fn float() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Float)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Boolean)
    }

    pub fn text() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Text)
    }

    pub fn any() -> Self {
        TypeDescriptor::Scalar(ScalarKind::Any)
    }

    /// Non-generic use of a record type.
    pub fn record(def: Arc<RecordType>) -> Self {
        TypeDescriptor::Record(def, Vec::new())
    }

    /// A record type instantiated with concrete type arguments.
    pub fn generic(def: Arc<RecordType>, args: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Record(def, args)
    }

    pub fn enumeration(def: Arc<EnumType>) -> Self {
        TypeDescriptor::Enumeration(def)
    }

    /// `Optional[inner]`; optional of optional, and optional of the null
    /// marker, collapse.
    pub fn optional(inner: TypeDescriptor) -> Self {
        match inner {
            TypeDescriptor::Optional(_) | TypeDescriptor::Absent => inner,
            other => TypeDescriptor::Optional(Box::new(other)),
        }
    }

    /// Normalizing union constructor, see [`crate::resolver::union_of`].
    pub fn union<I>(alternatives: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        crate::resolver::union_of(alternatives)
    }

    pub fn sequence(element: TypeDescriptor) -> Self {
        TypeDescriptor::SequenceOf(Box::new(element))
    }

    pub fn set(element: TypeDescriptor) -> Self {
        TypeDescriptor::SetOf(Box::new(element))
    }

    pub fn mapping(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::MappingOf(Box::new(key), Box::new(value))
    }

    pub fn tuple(elements: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::TupleOf(elements)
    }

    pub fn placeholder(name: impl Into<String>) -> Self {
        TypeDescriptor::Placeholder(name.into())
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        TypeDescriptor::Opaque(name.into())
    }

    /// Canonical printable name, e.g. `Mapping[str, Optional[int]]`.
    pub fn type_name(&self) -> String {
        self.to_string()
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeDescriptor::Optional(_))
    }

    /// The type itself, or its inner type when optional.
    pub fn without_optional(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Optional(inner) => inner,
            other => other,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Scalar(kind) => f.write_str(kind.name()),
            TypeDescriptor::Record(def, args) if args.is_empty() => f.write_str(def.name()),
            TypeDescriptor::Record(def, args) => {
                write!(f, "{}[", def.name())?;
                write_list(f, args)?;
                f.write_str("]")
            }
            TypeDescriptor::Enumeration(def) => f.write_str(def.name()),
            TypeDescriptor::Optional(inner) => write!(f, "Optional[{inner}]"),
            TypeDescriptor::UnionOf(alts) => {
                f.write_str("Union[")?;
                write_list(f, alts)?;
                f.write_str("]")
            }
            TypeDescriptor::SequenceOf(e) => write!(f, "Sequence[{e}]"),
            TypeDescriptor::SetOf(e) => write!(f, "Set[{e}]"),
            TypeDescriptor::MappingOf(k, v) => write!(f, "Mapping[{k}, {v}]"),
            TypeDescriptor::TupleOf(elements) if elements.is_empty() => f.write_str("Tuple[()]"),
            TypeDescriptor::TupleOf(elements) => {
                f.write_str("Tuple[")?;
                write_list(f, elements)?;
                f.write_str("]")
            }
            TypeDescriptor::Placeholder(name) => write!(f, "~{name}"),
            TypeDescriptor::Absent => f.write_str("NoneType"),
            TypeDescriptor::Opaque(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_generic() -> Arc<RecordType> {
        Arc::new(
            RecordType::new("SimpleGeneric")
                .param("T")
                .field("value", TypeDescriptor::placeholder("T")),
        )
    }

    #[test]
    fn test_scalar_names() {
        assert_eq!(TypeDescriptor::integer().type_name(), "int");
        assert_eq!(TypeDescriptor::float().type_name(), "float");
        assert_eq!(TypeDescriptor::boolean().type_name(), "bool");
        assert_eq!(TypeDescriptor::text().type_name(), "str");
        assert_eq!(TypeDescriptor::any().type_name(), "Any");
    }

    #[test]
    fn test_container_names() {
        let t = TypeDescriptor::mapping(
            TypeDescriptor::text(),
            TypeDescriptor::sequence(TypeDescriptor::optional(TypeDescriptor::integer())),
        );
        assert_eq!(t.type_name(), "Mapping[str, Sequence[Optional[int]]]");
        assert_eq!(
            TypeDescriptor::tuple(vec![TypeDescriptor::integer(), TypeDescriptor::text()])
                .type_name(),
            "Tuple[int, str]"
        );
        assert_eq!(TypeDescriptor::tuple(vec![]).type_name(), "Tuple[()]");
    }

    #[test]
    fn test_generic_record_name() {
        let def = simple_generic();
        assert_eq!(TypeDescriptor::record(def.clone()).type_name(), "SimpleGeneric");
        assert_eq!(
            TypeDescriptor::generic(def, vec![TypeDescriptor::integer()]).type_name(),
            "SimpleGeneric[int]"
        );
    }

    #[test]
    fn test_optional_collapses() {
        let t = TypeDescriptor::optional(TypeDescriptor::optional(TypeDescriptor::text()));
        assert_eq!(t, TypeDescriptor::optional(TypeDescriptor::text()));
        assert_eq!(
            TypeDescriptor::optional(TypeDescriptor::Absent),
            TypeDescriptor::Absent
        );
    }

    #[test]
    fn test_null_default_collapses_to_none() {
        let field = RecordField::new("middle", TypeDescriptor::text()).with_default(Dynamic::Null);
        assert!(field.default().is_none());
        let field = RecordField::new("n", TypeDescriptor::integer()).with_default(Dynamic::Int(3));
        assert_eq!(field.default(), Some(&Dynamic::Int(3)));
    }

    #[test]
    fn test_duplicate_field_replaced_in_place() {
        let def = RecordType::new("R")
            .field("a", TypeDescriptor::integer())
            .field("b", TypeDescriptor::integer())
            .field("a", TypeDescriptor::text());
        let names: Vec<_> = def.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(def.fields()[0].ty(), &TypeDescriptor::text());
    }

    #[test]
    fn test_enum_from_names_counts_from_one() {
        let e = EnumType::from_names("E1", ["a", "b", "c"]);
        assert_eq!(e.value_of("a"), Some(&Dynamic::Int(1)));
        assert_eq!(e.value_of("c"), Some(&Dynamic::Int(3)));
        assert!(!e.contains("d"));
    }
}
