use serde_json::json;
use treecodec_common::library::{Definition, TypeLibrary, read_library_file};
use treecodec_common::{TreecodecConfig, TypeExpr};
use treecodec_core::{Dynamic, Error, dict_type_representation, deserialize, serialize};

const PEOPLE: &str = r#"
[records.Name]
fields = [
    { name = "first", type = "str" },
    { name = "last", type = "str" },
    { name = "nickname", type = "Optional[str]" },
]

[records.Employee]
fields = [
    { name = "name", type = "Name" },
    { name = "level", type = "Level", default = "Junior" },
    { name = "skills", type = "Mapping[str, int]", default = {} },
]
"#;

const LEVELS: &str = r#"{
    "enums": { "Level": { "members": ["Junior", "Senior"] } },
    "records": {
        "Page": {
            "params": ["T"],
            "fields": [
                { "name": "items", "type": "Sequence[~T]" },
                { "name": "next", "type": "Optional[int]" }
            ]
        }
    }
}"#;

fn write_library(dir: &std::path::Path) -> anyhow::Result<()> {
    std::fs::write(dir.join("people.toml"), PEOPLE)?;
    std::fs::write(dir.join("levels.json"), LEVELS)?;
    std::fs::write(dir.join("README.md"), "not a library file")?;
    Ok(())
}

#[test]
fn test_load_directory_of_mixed_formats() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_library(dir.path())?;

    let library = TypeLibrary::load(&[dir.path()])?;
    assert_eq!(library.len(), 4);
    assert!(matches!(library.get("Level"), Some(Definition::Enumeration(_))));
    assert!(library.get("README").is_none());

    Ok(())
}

#[test]
fn test_defaults_fill_missing_fields() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_library(dir.path())?;
    let library = TypeLibrary::load(&[dir.path()])?;

    let ty = library.resolve_str("Employee")?;
    let value = deserialize(&ty, &json!({"name": {"first": "Ada", "last": "Byron"}}), None)?;
    assert_eq!(
        serialize(&value, None, true)?,
        json!({
            "name": {"first": "Ada", "last": "Byron"},
            "level": "Junior",
            "skills": {}
        })
    );

    Ok(())
}

#[test]
fn test_generic_record_from_library() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_library(dir.path())?;
    let library = TypeLibrary::load(&[dir.path()])?;

    let ty = library.resolve(&"Page[Name]".parse::<TypeExpr>()?)?;
    assert_eq!(
        dict_type_representation(&ty)?,
        json!({
            "items": [{"first": "str", "last": "str", "nickname": "Optional[str]"}],
            "next": "Optional[int]"
        })
    );

    let err = deserialize(&ty, &json!({"items": [{"first": "Ada"}]}), None).unwrap_err();
    match err {
        Error::MissingRequired {
            field_name,
            containing_type,
            ..
        } => {
            assert_eq!(field_name, "last");
            assert_eq!(containing_type, "Name");
        }
        other => panic!("Expected MissingRequired, got {other:?}"),
    }

    Ok(())
}

#[test]
fn test_uninstantiated_generic_passes_items_through() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    write_library(dir.path())?;
    let library = TypeLibrary::load(&[dir.path()])?;

    let ty = library.resolve_str("Page")?;
    let value = deserialize(&ty, &json!({"items": [1, "two"]}), None)?;
    let record = value.as_record().unwrap();
    assert_eq!(
        record.get("items"),
        Some(&Dynamic::Sequence(vec![Dynamic::Int(1), Dynamic::from("two")]))
    );
    assert_eq!(record.get("next"), Some(&Dynamic::Null));

    Ok(())
}

#[test]
fn test_unknown_reference_reports_file_context() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[records.R]\nfields = [{ name = \"x\", type = \"Missing\" }]")?;

    let file = read_library_file(&path)?;
    let err = TypeLibrary::from_file(file).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("In field 'x' of record 'R'"));
    assert!(message.contains("Unknown type 'Missing'"));

    Ok(())
}

#[test]
fn test_malformed_library_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"records": {"R": {"fields": [{"name": "x", "type": "Sequence["}]}}}"#,
    )?;

    let err = read_library_file(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid JSON type library"));

    Ok(())
}

#[test]
fn test_config_library_paths_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let types = dir.path().join("types");
    std::fs::create_dir(&types)?;
    write_library(&types)?;
    std::fs::write(
        dir.path().join("treecodec.toml"),
        "[library]\npaths = [\"types\"]\n",
    )?;

    let config = TreecodecConfig::discover(dir.path())?;
    let library = TypeLibrary::load(&config.library.paths)?;
    assert!(library.resolve_str("Sequence[Employee]").is_ok());

    Ok(())
}
