//! Reflective questions about descriptors.
//!
//! The resolver never fails on a descriptor it cannot classify: an unbound
//! placeholder or an opaque type is simply "not a record, not a container",
//! and the deserializer decides what to do with it.

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::generics;
use crate::value::Dynamic;

/// The `(name, type, default)` view of one record field, with the record's
/// own placeholders already substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: TypeDescriptor,
    pub default: Option<Dynamic>,
}

/// Structural children of a container descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Container<'a> {
    Sequence(&'a TypeDescriptor),
    Set(&'a TypeDescriptor),
    Mapping(&'a TypeDescriptor, &'a TypeDescriptor),
    Tuple(&'a [TypeDescriptor]),
}

pub fn is_record(ty: &TypeDescriptor) -> bool {
    matches!(ty, TypeDescriptor::Record(..))
}

pub fn is_enumeration(ty: &TypeDescriptor) -> bool {
    matches!(ty, TypeDescriptor::Enumeration(_))
}

/// Ordered field view of a record descriptor, or `None` for other shapes.
///
/// Field types are concrete wherever the record's type arguments bind its
/// placeholders; unbound placeholders are left in place.
pub fn record_fields(ty: &TypeDescriptor) -> Option<Vec<FieldSpec>> {
    let TypeDescriptor::Record(def, _) = ty else {
        return None;
    };
    let bindings = generics::bindings(ty);
    Some(
        def.fields()
            .iter()
            .map(|f| FieldSpec {
                name: f.name().to_string(),
                ty: generics::substitute(f.ty(), &bindings),
                default: f.default().cloned(),
            })
            .collect(),
    )
}

/// `(member_name, member_value)` pairs of an enumeration descriptor.
pub fn enum_members(ty: &TypeDescriptor) -> Option<Vec<(&str, &Dynamic)>> {
    match ty {
        TypeDescriptor::Enumeration(def) => Some(def.members().collect()),
        _ => None,
    }
}

pub fn container(ty: &TypeDescriptor) -> Option<Container<'_>> {
    match ty {
        TypeDescriptor::SequenceOf(e) => Some(Container::Sequence(e)),
        TypeDescriptor::SetOf(e) => Some(Container::Set(e)),
        TypeDescriptor::MappingOf(k, v) => Some(Container::Mapping(k, v)),
        TypeDescriptor::TupleOf(elements) => Some(Container::Tuple(elements)),
        _ => None,
    }
}

pub fn optional_inner(ty: &TypeDescriptor) -> Option<&TypeDescriptor> {
    match ty {
        TypeDescriptor::Optional(inner) => Some(inner),
        _ => None,
    }
}

pub fn union_alternatives(ty: &TypeDescriptor) -> Option<&[TypeDescriptor]> {
    match ty {
        TypeDescriptor::UnionOf(alts) => Some(alts),
        _ => None,
    }
}

/// Build a normalized union from candidate alternatives.
///
/// Nested unions and optionals are flattened and duplicates dropped, keeping
/// the first occurrence so declaration order survives. The null marker never
/// stays inside the union: when present, the result is `Optional` of the
/// remaining single type or of the remaining union. A single remaining
/// alternative is returned as is.
pub fn union_of<I>(alternatives: I) -> Result<TypeDescriptor>
where
    I: IntoIterator<Item = TypeDescriptor>,
{
    let mut flat = Vec::new();
    let mut absent = false;
    for alt in alternatives {
        flatten_into(alt, &mut flat, &mut absent);
    }

    let core = match flat.len() {
        0 if absent => return Ok(TypeDescriptor::Absent),
        0 => return Err(Error::EmptyUnion),
        1 => flat.remove(0),
        _ => TypeDescriptor::UnionOf(flat),
    };

    Ok(if absent {
        TypeDescriptor::Optional(Box::new(core))
    } else {
        core
    })
}

fn flatten_into(alt: TypeDescriptor, flat: &mut Vec<TypeDescriptor>, absent: &mut bool) {
    match alt {
        TypeDescriptor::Absent => *absent = true,
        TypeDescriptor::Optional(inner) => {
            *absent = true;
            flatten_into(*inner, flat, absent);
        }
        TypeDescriptor::UnionOf(inner) => {
            for a in inner {
                flatten_into(a, flat, absent);
            }
        }
        other => {
            if !flat.contains(&other) {
                flat.push(other);
            }
        }
    }
}
