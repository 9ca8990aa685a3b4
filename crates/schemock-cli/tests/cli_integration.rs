use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Get the workspace root (two levels up from CARGO_MANIFEST_DIR of schemock-cli)
fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent() // crates/
        .unwrap()
        .parent() // workspace root
        .unwrap()
        .to_path_buf()
}

fn schemock_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_schemock"));
    cmd.current_dir(workspace_root());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    schemock_bin().args(args).output().expect("failed to run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_help() {
    let output = run(&["--help"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate test mocks"));
    assert!(stdout.contains("inspect"));
}

#[test]
fn cli_version() {
    let output = run(&["--version"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("0.3.0"));
}

#[test]
fn cli_schema_directory() {
    let output = run(&["schema", "fixtures/models"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let doc: serde_json::Value = serde_json::from_str(&stdout).expect("invalid JSON output");

    assert_eq!(doc["schemaVersion"], "1.0");
    let models = doc["models"].as_array().expect("models should be array");
    let names: Vec<&str> = models
        .iter()
        .map(|m| m["className"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Comment", "PeopleTag", "Person", "Post", "Tag"]);

    let join = &models[1];
    assert_eq!(join["tableName"], "people_tags");
    assert_eq!(join["isJoinTable"], true);
    assert_eq!(join["joinTableMembers"], serde_json::json!(["Person", "Tag"]));

    let person = &models[2];
    assert!(person["modules"]["Searchable"].is_object());
    assert!(person["modules"].get("Reportable").is_none());
    assert_eq!(person["tableName"], "people");
}

#[test]
fn cli_schema_single_file() {
    let output = run(&["schema", "fixtures/models/post.rb"]);
    assert_success(&output);
    let doc: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    let models = doc["models"].as_array().unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["className"], "Post");
    let author = models[0]["relationships"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "author")
        .unwrap();
    assert_eq!(author["type"], "belongs_to");
    assert_eq!(author["foreignKey"], "author_id");
}

#[test]
fn cli_schema_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("schema.json");
    let output = run(&["schema", "fixtures/models", "-o", out.to_str().unwrap()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Written to"));
    let content = std::fs::read_to_string(&out).unwrap();
    assert!(content.contains("\"className\": \"Person\""));
}

#[test]
fn cli_generate_stdout() {
    let output = run(&["generate", "fixtures/models"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("class PersonMock"));
    assert!(stdout.contains("class PostMock"));
    assert!(stdout.contains("  def self.search(query, page: nil, **opts)"));
    assert!(stdout.contains("  def full_name(separator=nil)"));
    assert!(!stdout.contains("audit_trail"));
}

#[test]
fn cli_generate_suffix() {
    let output = run(&["generate", "fixtures/models/post.rb", "--suffix", "Double"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("class PostDouble"));
    assert!(!stdout.contains("PostMock"));
}

#[test]
fn cli_generate_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&[
        "generate",
        "fixtures/models",
        "--output-dir",
        dir.path().to_str().unwrap(),
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generated 5 mocks"));

    let person = std::fs::read_to_string(dir.path().join("person_mock.rb")).unwrap();
    assert!(person.contains("class PersonMock"));
    assert!(dir.path().join("people_tag_mock.rb").exists());
}

#[test]
fn cli_generate_custom_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("names.tmpl");
    std::fs::write(&template, "{{ mock_name }}:{{ attribute_names | join }}").unwrap();
    let output = run(&[
        "generate",
        "fixtures/models/tag.rb",
        "--template",
        template.to_str().unwrap(),
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "TagMock:id, label");
}

#[test]
fn cli_generate_bad_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("bad.tmpl");
    std::fs::write(&template, "{{ no_such_query }}").unwrap();
    let output = run(&[
        "generate",
        "fixtures/models/tag.rb",
        "--template",
        template.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("undefined query `no_such_query`"));
}

#[test]
fn cli_inspect_json() {
    let output = run(&[
        "inspect",
        "person",
        "--dir",
        "fixtures/models",
        "--format",
        "json",
    ]);
    assert_success(&output);
    let report: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();

    assert_eq!(report["className"], "Person");
    assert_eq!(report["superclass"], "ApplicationRecord");
    assert_eq!(report["classMethods"][0]["name"], "search");
    assert_eq!(report["instanceMethods"][0]["name"], "full_name");
    assert_eq!(report["relationships"]["has_many"].as_array().unwrap().len(), 2);

    let caps = report["capabilities"].as_array().unwrap();
    assert_eq!(caps[0]["name"], "Searchable");
    assert_eq!(caps[0]["attached"], true);
    assert_eq!(caps[1]["name"], "Reportable");
    assert_eq!(caps[1]["attached"], false);
}

#[test]
fn cli_inspect_human() {
    let output = run(&["inspect", "person", "--dir", "fixtures/models"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Person < ApplicationRecord"));
    assert!(stdout.contains("    self.search(query, page: nil, **opts)"));
    assert!(stdout.contains("    belongs_to :account -> Account"));
    assert!(stdout.contains("include Searchable: attached"));
    assert!(stdout.contains("extend Reportable: skipped"));
}

#[test]
fn cli_capability_failure_only_logged() {
    let output = run(&["--log-level", "debug", "schema", "fixtures/models/person.rb"]);
    assert_success(&output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("capability not attached"), "stderr: {stderr}");
}

#[test]
fn cli_unresolved_superclass_fails() {
    let output = run(&["schema", "fixtures/broken"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("uninitialized constant Inventory::Item"));
}

#[test]
fn cli_nonexistent_path() {
    let output = run(&["schema", "nonexistent/path"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Path does not exist"));
}
