//! Runs the built `treecodec` binary against a temporary project.

use std::path::Path;
use std::process::{Command, Output};

use rstest::rstest;
use serde_json::{Value, json};

const LIBRARY: &str = r#"
[records.Name]
fields = [
    { name = "first", type = "str" },
    { name = "last", type = "str" },
    { name = "nickname", type = "Optional[str]" },
]

[records.Team]
fields = [
    { name = "lead", type = "Name" },
    { name = "members", type = "Sequence[Name]", default = [] },
    { name = "size", type = "int" },
]
"#;

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("types")).unwrap();
    std::fs::write(dir.path().join("types").join("team.toml"), LIBRARY).unwrap();
    std::fs::write(
        dir.path().join("treecodec.toml"),
        "[library]\npaths = [\"types\"]\n",
    )
    .unwrap();
    dir
}

fn treecodec(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_treecodec"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_schema_prints_shape() {
    let dir = project();
    let output = treecodec(dir.path(), &["schema", "Team"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({
            "lead": {"first": "str", "last": "str", "nickname": "Optional[str]"},
            "members": [{"first": "str", "last": "str", "nickname": "Optional[str]"}],
            "size": "int"
        })
    );
}

#[rstest]
#[case(json!({"lead": {"first": "A", "last": "B"}, "size": 1}), 0)]
#[case(json!({"lead": {"first": "A", "last": "B"}, "size": 1.0}), 0)]
#[case(json!({"lead": {"first": "A", "last": "B"}, "size": 1.5}), 1)]
#[case(json!({"lead": {"first": "A"}, "size": 1}), 1)]
#[case(json!([1, 2]), 1)]
fn test_check_exit_codes(#[case] document: Value, #[case] expected: i32) {
    let dir = project();
    let input = dir.path().join("doc.json");
    std::fs::write(&input, document.to_string()).unwrap();

    let output = treecodec(dir.path(), &["check", "Team", "doc.json"]);
    assert_eq!(output.status.code(), Some(expected));
}

#[test]
fn test_check_reports_missing_field() {
    let dir = project();
    std::fs::write(dir.path().join("doc.json"), r#"{"lead": {"first": "A"}, "size": 1}"#).unwrap();

    let output = treecodec(dir.path(), &["check", "Team", "doc.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'last'"), "{stderr}");
}

#[test]
fn test_normalize_fills_defaults_and_drops_unknown_keys() {
    let dir = project();
    std::fs::write(
        dir.path().join("doc.json"),
        r#"{"size": 2.0, "lead": {"last": "B", "first": "A", "nickname": null}, "extra": true}"#,
    )
    .unwrap();

    let output = treecodec(dir.path(), &["normalize", "Team", "doc.json"]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({"lead": {"first": "A", "last": "B"}, "members": [], "size": 2})
    );

    let output = treecodec(dir.path(), &["normalize", "Team", "doc.json", "--keep-nulls"]);
    assert_eq!(
        stdout_json(&output)["lead"],
        json!({"first": "A", "last": "B", "nickname": null})
    );
}

#[test]
fn test_extra_library_flag() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("extra.toml"), LIBRARY).unwrap();

    let output = treecodec(dir.path(), &["-L", "extra.toml", "schema", "Mapping[str, int]"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), json!({"str": "int"}));

    let output = treecodec(dir.path(), &["-L", "extra.toml", "schema", "Name"]);
    assert!(output.status.success());
}

#[test]
fn test_unknown_type_is_usage_error() {
    let dir = project();
    let output = treecodec(dir.path(), &["schema", "Nope"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown type 'Nope'"));
}
