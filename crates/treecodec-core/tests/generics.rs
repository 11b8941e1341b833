use std::sync::Arc;

use serde_json::json;
use treecodec_core::generics::{align_flat, align_nested};
use treecodec_core::{
    Dynamic, DynamicRecord, Error, RecordType, TypeDescriptor, deserialize, serialize,
};

fn simple_generic() -> Arc<RecordType> {
    Arc::new(
        RecordType::new("SimpleGeneric")
            .param("T")
            .field("value", TypeDescriptor::placeholder("T"))
            .field("history", TypeDescriptor::sequence(TypeDescriptor::placeholder("T"))),
    )
}

fn nested_generic() -> Arc<RecordType> {
    Arc::new(
        RecordType::new("NestedGeneric")
            .param("A")
            .param("B")
            .field(
                "inner",
                TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::placeholder("A")]),
            )
            .field(
                "lookup",
                TypeDescriptor::mapping(TypeDescriptor::text(), TypeDescriptor::placeholder("B")),
            )
            .field_with_default(
                "note",
                TypeDescriptor::optional(TypeDescriptor::placeholder("B")),
                None,
            ),
    )
}

#[test]
fn test_simple_generic_round_trip() {
    let ty = TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::integer()]);
    let tree = json!({"value": 3, "history": [1, 2]});
    let value = deserialize(&ty, &tree, None).unwrap();
    assert_eq!(
        value,
        Dynamic::Record(
            DynamicRecord::new("SimpleGeneric")
                .with("value", 3i64)
                .with("history", Dynamic::Sequence(vec![Dynamic::Int(1), Dynamic::Int(2)]))
        )
    );
    assert_eq!(serialize(&value, None, true).unwrap(), tree);
}

#[test]
fn test_simple_generic_checks_bound_type() {
    let ty = TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::text()]);
    let err = deserialize(&ty, &json!({"value": 3, "history": []}), None).unwrap_err();
    match err {
        Error::FieldDeserializeFail {
            field_name,
            expected_type,
            ..
        } => {
            assert_eq!(field_name, "value");
            assert_eq!(expected_type, "str");
        }
        other => panic!("Expected FieldDeserializeFail, got {other:?}"),
    }
}

#[test]
fn test_nested_generic_binds_through_levels() {
    let ty = TypeDescriptor::generic(
        nested_generic(),
        vec![TypeDescriptor::float(), TypeDescriptor::boolean()],
    );
    let tree = json!({
        "inner": {"value": 1.5, "history": [2]},
        "lookup": {"x": true, "y": false},
        "note": true
    });
    let value = deserialize(&ty, &tree, None).unwrap();
    let record = value.as_record().unwrap();
    let inner = record.get("inner").and_then(Dynamic::as_record).unwrap();
    assert_eq!(inner.get("value"), Some(&Dynamic::Float(1.5)));
    // integer 2 accepted for the float-bound placeholder
    assert_eq!(
        inner.get("history"),
        Some(&Dynamic::Sequence(vec![Dynamic::Float(2.0)]))
    );
    assert_eq!(record.get("note"), Some(&Dynamic::Bool(true)));

    let back = serialize(&value, None, true).unwrap();
    assert_eq!(deserialize(&ty, &back, None).unwrap(), value);
}

#[test]
fn test_nested_generic_rejects_wrong_inner_type() {
    let ty = TypeDescriptor::generic(
        nested_generic(),
        vec![TypeDescriptor::integer(), TypeDescriptor::boolean()],
    );
    let tree = json!({"inner": {"value": "nope", "history": []}, "lookup": {}});
    let err = deserialize(&ty, &tree, None).unwrap_err();
    assert_eq!(err.field_name(), Some("value"));
}

#[test]
fn test_uninstantiated_generic_passes_fields_through() {
    let ty = TypeDescriptor::record(simple_generic());
    let tree = json!({"value": {"free": "form"}, "history": ["a", 1]});
    let value = deserialize(&ty, &tree, None).unwrap();
    let record = value.as_record().unwrap();
    assert_eq!(
        record.get("value"),
        Some(&Dynamic::from_tree(&json!({"free": "form"})))
    );
}

#[test]
fn test_alignment_views() {
    let ty = TypeDescriptor::generic(
        nested_generic(),
        vec![
            TypeDescriptor::generic(simple_generic(), vec![TypeDescriptor::text()]),
            TypeDescriptor::mapping(TypeDescriptor::text(), TypeDescriptor::integer()),
        ],
    );
    let flat: Vec<_> = align_flat(&ty)
        .into_iter()
        .map(|(p, t)| format!("{p}={t}"))
        .collect();
    assert_eq!(
        flat,
        vec![
            "A=SimpleGeneric[str]",
            "B=Mapping[str, int]",
            "T=str",
            "KT=str",
            "VT=int"
        ]
    );

    let nested = align_nested(&ty);
    assert_eq!(nested["A"].nested["T"].concrete, TypeDescriptor::text());
    assert_eq!(nested["B"].nested["VT"].concrete, TypeDescriptor::integer());
}
