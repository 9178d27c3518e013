use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_girweave")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// The three platform directories.
fn all_platforms() -> assert_cmd::Command {
    let mut c = cmd();
    c.args(["--linux", &fixture_path("linux")])
        .args(["--windows", &fixture_path("windows")])
        .args(["--macos", &fixture_path("macos")]);
    c
}

fn stdout_of(c: &mut assert_cmd::Command) -> String {
    let assert = c.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

// -- argument handling --

#[test]
fn no_inputs_is_an_error() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("no input documents"));
}

#[test]
fn unknown_format_is_an_error() {
    all_platforms()
        .args(["-f", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format: xml. Use json or tree"));
}

#[test]
fn invalid_priority_is_an_error() {
    all_platforms()
        .args(["--priority", "linux,linux,macos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid merge priority"));
}

#[test]
fn missing_metadata_directory_is_an_error() {
    all_platforms()
        .args(["--metadata", "/nonexistent/metadata"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("metadata directory not found"));
}

#[test]
fn unmatched_glob_warns() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.json", dir.path().display());
    cmd()
        .args(["--linux", &pattern])
        .args(["--windows", &fixture_path("windows")])
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: no files matched"));
}

// -- tree output --

#[test]
fn tree_shows_merged_platforms() {
    let out = stdout_of(all_platforms().args(["-f", "tree"]));

    assert!(out.contains("# Demo-1.0\n"));
    assert!(out.contains("# GLib-2.0 (missing on macos)\n"));
    assert!(out.contains(
        "      method name=\"get_fd\" c:identifier=\"demo_widget_get_fd\" [linux]\n"
    ));
    // Windows declares an extra parameter, so it loses under the default
    // priority.
    assert!(out.contains(
        "    function name=\"open_file\" c:identifier=\"demo_open_file\" [linux,macos]\n"
    ));
    assert!(!out.contains("name=\"flags\""));
    assert!(out.contains("          type name=\"GLib.Error\" c:type=\"GError**\" [linux,macos] -> GLib.Error\n"));
    assert!(out.contains("| It can be shown.\n"));
}

#[test]
fn priority_changes_the_winning_shape() {
    let out = stdout_of(
        all_platforms().args(["-f", "tree", "--priority", "windows,linux,macos"]),
    );
    assert!(out.contains(
        "    function name=\"open_file\" c:identifier=\"demo_open_file\" [windows]\n"
    ));
    assert!(out.contains("name=\"flags\""));
}

#[test]
fn unresolved_references_are_reported() {
    all_platforms()
        .args(["-f", "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "function name=\"use_missing\" c:identifier=\"demo_use_missing\" unresolved=\"Nope\"",
        ))
        .stdout(predicate::str::contains("type name=\"Nope\" c:type=\"DemoNope*\" unresolved=\"1\" [linux,windows,macos] -> ?"))
        .stderr(predicate::str::contains(
            "warning: Demo-1.0.json: cannot resolve type Nope at Demo.use_missing.return-value.type",
        ))
        .stderr(predicate::str::contains("warning: GLib is missing on macos"));
}

#[test]
fn varargs_flagging() {
    let out = stdout_of(all_platforms().args(["-f", "tree"]));
    assert!(out.contains(
        "function name=\"logv\" c:identifier=\"demo_logv\" unsupported=\"linux,windows,macos\""
    ));
    assert!(!out.contains("c:identifier=\"demo_log\" unsupported"));

    let out = stdout_of(all_platforms().args(["-f", "tree", "--unsupported-varargs", "windows"]));
    assert!(out.contains("c:identifier=\"demo_log\" unsupported=\"windows\""));
}

#[test]
fn builtin_patches_apply() {
    let out = stdout_of(all_platforms().args(["-f", "tree"]));
    // Strv becomes a zero-terminated array and GType is synthesized.
    assert!(out.contains("    alias name=\"Strv\" c:type=\"GStrv\" [linux,windows]\n"));
    assert!(out.contains("      array zero-terminated=\"1\" [linux,windows]\n"));
    assert!(out.contains("    alias name=\"Type\" c:type=\"GType\" [linux,windows]\n"));
    assert!(out.contains("type name=\"gpointer\" c:type=\"gpointer\" [linux,windows]"));
}

// -- metadata --

#[test]
fn metadata_rules_are_applied() {
    let assert = all_platforms()
        .args(["-f", "tree", "--metadata", &fixture_path("metadata")])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "warning: Demo-1.0.metadata: 5: pattern `nothing_matches` does not match anything",
        ));
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(out.contains(
        "method name=\"show\" c:identifier=\"demo_widget_show\" deprecated=\"1\" version=\"1.2\""
    ));
    assert!(out.contains("parameter name=\"path\" nullable=\"1\""));
    assert!(out.contains("unresolved=\"Nope\" skip=\"1\""));
    assert!(out.contains("c:identifier=\"demo_widget_get_fd_linux\""));
    assert!(out.contains("shadowed-by=\"log\""));
}

// -- json output --

#[test]
fn json_output_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.json");
    all_platforms()
        .args(["--generate", "Demo"])
        .args(["--doc-url", "Demo=https://example.org/demo"])
        .args(["-o", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let repos = value["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 2);

    let demo = &repos[0];
    assert_eq!(demo["name"], "Demo");
    assert_eq!(demo["generate"], true);
    assert_eq!(demo["doc_url"], "https://example.org/demo");
    assert!(demo.get("missing").is_none());

    let glib = &repos[1];
    assert_eq!(glib["name"], "GLib");
    assert_eq!(glib["generate"], false);
    assert_eq!(glib["missing"], serde_json::json!(["macos"]));

    let widget = &demo["root"]["children"][1]["children"][0];
    assert_eq!(widget["attrs"]["name"], "Widget");
    assert_eq!(widget["platforms"], serde_json::json!(["linux", "windows", "macos"]));
}

#[test]
fn output_directory_gets_default_name() {
    let dir = TempDir::new().unwrap();
    all_platforms()
        .args(["-f", "tree", "-o", dir.path().to_str().unwrap()])
        .assert()
        .success();
    let out = std::fs::read_to_string(dir.path().join("model.txt")).unwrap();
    assert!(out.starts_with("# Demo-1.0\n"));
}

#[test]
fn single_platform_run() {
    let out = stdout_of(cmd().args(["--linux", &fixture_path("linux"), "-f", "tree"]));
    assert!(out.contains("# Demo-1.0\n"));
    assert!(out.contains("# GLib-2.0\n"));
    assert!(out.contains("    function name=\"open_file\" c:identifier=\"demo_open_file\" [linux]\n"));
}
