//! Generic parameter alignment and placeholder substitution.
//!
//! A parameterized descriptor pairs declared placeholders with arguments in
//! declaration order. Records declare their own placeholders; the built-in
//! containers use synthetic ones so that every parameterized shape can be
//! aligned the same way.

use indexmap::IndexMap;

use crate::descriptor::TypeDescriptor;

/// Synthetic placeholder of sequence and set instantiations.
pub const ELEMENT_PARAM: &str = "T";
/// Synthetic key placeholder of mapping instantiations.
pub const KEY_PARAM: &str = "KT";
/// Synthetic value placeholder of mapping instantiations.
pub const VALUE_PARAM: &str = "VT";

/// Placeholder name to concrete descriptor.
pub type Bindings = IndexMap<String, TypeDescriptor>;

/// Nested alignment view: each binding carries the bindings of its own
/// argument.
pub type NestedBindings = IndexMap<String, Binding>;

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub concrete: TypeDescriptor,
    pub nested: NestedBindings,
}

/// Declared placeholders of a parameterized descriptor.
pub fn declared_params(ty: &TypeDescriptor) -> Vec<&str> {
    match ty {
        TypeDescriptor::Record(def, _) => def.params().iter().map(String::as_str).collect(),
        TypeDescriptor::SequenceOf(_) | TypeDescriptor::SetOf(_) => vec![ELEMENT_PARAM],
        TypeDescriptor::MappingOf(..) => vec![KEY_PARAM, VALUE_PARAM],
        _ => Vec::new(),
    }
}

fn arguments(ty: &TypeDescriptor) -> Vec<&TypeDescriptor> {
    match ty {
        TypeDescriptor::Record(_, args) => args.iter().collect(),
        TypeDescriptor::SequenceOf(e) | TypeDescriptor::SetOf(e) => vec![&**e],
        TypeDescriptor::MappingOf(k, v) => vec![&**k, &**v],
        _ => Vec::new(),
    }
}

/// One level of alignment: `(placeholder, argument)` pairs.
///
/// Placeholders without a matching argument are left out.
pub fn align(ty: &TypeDescriptor) -> Vec<(&str, &TypeDescriptor)> {
    declared_params(ty).into_iter().zip(arguments(ty)).collect()
}

/// Flat alignment: the outer pairs first, followed by the pairs of every
/// parameterized argument, recursively.
pub fn align_flat(ty: &TypeDescriptor) -> Vec<(String, TypeDescriptor)> {
    let outer = align(ty);
    let mut flat: Vec<(String, TypeDescriptor)> = outer
        .iter()
        .map(|(p, a)| (p.to_string(), (*a).clone()))
        .collect();
    for (_, arg) in outer {
        flat.extend(align_flat(arg));
    }
    flat
}

/// Nested alignment keyed by placeholder.
pub fn align_nested(ty: &TypeDescriptor) -> NestedBindings {
    align(ty)
        .into_iter()
        .map(|(p, a)| {
            (
                p.to_string(),
                Binding {
                    concrete: a.clone(),
                    nested: align_nested(a),
                },
            )
        })
        .collect()
}

/// The bindings a record's own fields are resolved against.
pub fn bindings(ty: &TypeDescriptor) -> Bindings {
    align(ty)
        .into_iter()
        .map(|(p, a)| (p.to_string(), a.clone()))
        .collect()
}

/// Replace every bound placeholder in `ty`.
///
/// Record definitions are not entered: their fields are in the record's own
/// scope and are bound when the record itself is resolved. Only the record's
/// arguments are substituted. Unions are rebuilt as is, without
/// renormalization.
pub fn substitute(ty: &TypeDescriptor, bindings: &Bindings) -> TypeDescriptor {
    if bindings.is_empty() {
        return ty.clone();
    }
    let all = |items: &[TypeDescriptor]| -> Vec<TypeDescriptor> {
        items.iter().map(|t| substitute(t, bindings)).collect()
    };
    match ty {
        TypeDescriptor::Placeholder(name) => {
            bindings.get(name).cloned().unwrap_or_else(|| ty.clone())
        }
        TypeDescriptor::Record(def, args) => TypeDescriptor::Record(def.clone(), all(args)),
        TypeDescriptor::Optional(inner) => TypeDescriptor::optional(substitute(inner, bindings)),
        TypeDescriptor::UnionOf(alts) => TypeDescriptor::UnionOf(all(alts)),
        TypeDescriptor::SequenceOf(e) => TypeDescriptor::sequence(substitute(e, bindings)),
        TypeDescriptor::SetOf(e) => TypeDescriptor::set(substitute(e, bindings)),
        TypeDescriptor::MappingOf(k, v) => {
            TypeDescriptor::mapping(substitute(k, bindings), substitute(v, bindings))
        }
        TypeDescriptor::TupleOf(elements) => TypeDescriptor::TupleOf(all(elements)),
        TypeDescriptor::Scalar(_)
        | TypeDescriptor::Enumeration(_)
        | TypeDescriptor::Absent
        | TypeDescriptor::Opaque(_) => ty.clone(),
    }
}

/// Free placeholder names in `ty`, in first-seen order.
pub fn placeholders(ty: &TypeDescriptor) -> Vec<String> {
    let mut out = Vec::new();
    collect_placeholders(ty, &mut out);
    out
}

fn collect_placeholders(ty: &TypeDescriptor, out: &mut Vec<String>) {
    match ty {
        TypeDescriptor::Placeholder(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        TypeDescriptor::Record(_, items)
        | TypeDescriptor::UnionOf(items)
        | TypeDescriptor::TupleOf(items) => {
            items.iter().for_each(|t| collect_placeholders(t, out));
        }
        TypeDescriptor::Optional(e) | TypeDescriptor::SequenceOf(e) | TypeDescriptor::SetOf(e) => {
            collect_placeholders(e, out)
        }
        TypeDescriptor::MappingOf(k, v) => {
            collect_placeholders(k, out);
            collect_placeholders(v, out);
        }
        TypeDescriptor::Scalar(_)
        | TypeDescriptor::Enumeration(_)
        | TypeDescriptor::Absent
        | TypeDescriptor::Opaque(_) => {}
    }
}

pub fn is_concrete(ty: &TypeDescriptor) -> bool {
    placeholders(ty).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RecordType;
    use std::sync::Arc;

    fn simple_generic() -> Arc<RecordType> {
        Arc::new(
            RecordType::new("SimpleGeneric")
                .param("T")
                .field("value", TypeDescriptor::placeholder("T")),
        )
    }

    fn nested_generic() -> Arc<RecordType> {
        Arc::new(
            RecordType::new("NestedGeneric")
                .param("A")
                .param("B")
                .field("first", TypeDescriptor::placeholder("A"))
                .field(
                    "rest",
                    TypeDescriptor::mapping(
                        TypeDescriptor::text(),
                        TypeDescriptor::placeholder("B"),
                    ),
                ),
        )
    }

    #[test]
    fn test_align_record() {
        let t = TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::integer()]);
        assert_eq!(align(&t), vec![("T", &TypeDescriptor::integer())]);
    }

    #[test]
    fn test_align_containers_use_synthetic_params() {
        let m = TypeDescriptor::mapping(TypeDescriptor::text(), TypeDescriptor::float());
        let params: Vec<_> = align(&m).into_iter().map(|(p, _)| p).collect();
        assert_eq!(params, vec![KEY_PARAM, VALUE_PARAM]);
        let s = TypeDescriptor::set(TypeDescriptor::text());
        assert_eq!(align(&s), vec![(ELEMENT_PARAM, &TypeDescriptor::text())]);
    }

    #[test]
    fn test_align_flat_outer_first() {
        let inner = TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::integer()]);
        let t = TypeDescriptor::generic(
            nested_generic(),
            vec![inner.clone(), TypeDescriptor::sequence(TypeDescriptor::text())],
        );
        let flat = align_flat(&t);
        let names: Vec<_> = flat.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "T", "T"]);
        assert_eq!(flat[0].1, inner);
        assert_eq!(flat[2].1, TypeDescriptor::integer());
        assert_eq!(flat[3].1, TypeDescriptor::text());
    }

    #[test]
    fn test_align_nested_carries_argument_bindings() {
        let inner = TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::boolean()]);
        let t = TypeDescriptor::generic(nested_generic(), vec![inner, TypeDescriptor::integer()]);
        let nested = align_nested(&t);
        assert_eq!(nested["A"].nested["T"].concrete, TypeDescriptor::boolean());
        assert!(nested["B"].nested.is_empty());
    }

    #[test]
    fn test_substitute_reaches_nested_arguments() {
        let mut b = Bindings::new();
        b.insert("T".into(), TypeDescriptor::integer());
        let ty = TypeDescriptor::mapping(
            TypeDescriptor::text(),
            TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::placeholder("T")]),
        );
        let out = substitute(&ty, &b);
        assert_eq!(out.type_name(), "Mapping[str, SimpleGeneric[int]]");
        assert!(is_concrete(&out));
    }

    #[test]
    fn test_substitute_leaves_unbound() {
        let mut b = Bindings::new();
        b.insert("A".into(), TypeDescriptor::integer());
        let ty = TypeDescriptor::tuple(vec![
            TypeDescriptor::placeholder("A"),
            TypeDescriptor::placeholder("B"),
        ]);
        let out = substitute(&ty, &b);
        assert_eq!(out.type_name(), "Tuple[int, ~B]");
        assert_eq!(placeholders(&out), vec!["B".to_string()]);
    }

    #[test]
    fn test_unparameterized_record_has_no_bindings() {
        assert!(bindings(&TypeDescriptor::record(simple_generic())).is_empty());
        // fields of an uninstantiated generic record are still open
        assert!(is_concrete(&TypeDescriptor::record(simple_generic())));
    }
}
