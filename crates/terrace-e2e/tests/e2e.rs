#![allow(clippy::expect_used, clippy::panic)]

use std::path::Path;

use tempfile::TempDir;
use terrace_e2e::harness::{RunResult, run_raw, run_terrace, write_file};

const WEB_STACK: &str = r#"{
  "variable": { "region": { "default": "us-east-1" } },
  "provider": { "aws": { "region": "${var.region}" } },
  "resource": {
    "aws_vpc": { "main": { "cidr_block": "10.0.0.0/16" } },
    "aws_subnet": { "a": { "vpc_id": "${aws_vpc.main.id}" } },
    "aws_instance": {
      "web": {
        "subnet_id": "${aws_subnet.a.id}",
        "tags": { "Region": "${var.region}" }
      }
    }
  },
  "output": { "ip": { "value": "${aws_instance.web.private_ip}" } }
}"#;

const CYCLE: &str = r#"{
  "resource": {
    "null_resource": {
      "a": { "depends_on": ["null_resource.b"] },
      "b": { "depends_on": ["null_resource.c"] },
      "c": { "depends_on": ["null_resource.a"] }
    }
  }
}"#;

fn fixture(content: &str) -> TempDir {
    let temp = TempDir::new().expect("tempdir");
    write_file(&temp.path().join("main.json"), content).expect("write fixture");
    temp
}

fn run(command: &str, root: &Path, flags: &[&str]) -> RunResult {
    let output = run_terrace(command, root, flags).expect("run terrace");
    println!("{}", output.transcript());
    output
}

fn line(output: &RunResult, suffix: &str) -> usize {
    output
        .line_ending_with(suffix)
        .unwrap_or_else(|| panic!("no line ending with {suffix}\n{}", output.stdout))
}

#[test]
fn validate_clean_configuration_returns_0() {
    let temp = fixture(WEB_STACK);

    let output = run("validate", temp.path(), &[]);

    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("Validation: valid"));
}

#[test]
fn validate_cycle_returns_1_with_the_cycle_path() {
    let temp = fixture(CYCLE);

    let output = run("validate", temp.path(), &[]);

    assert_eq!(output.exit_code, 1);
    assert!(output.stdout.contains(
        "error: dependency cycle detected: resource.null_resource.a -> resource.null_resource.b -> resource.null_resource.c -> resource.null_resource.a"
    ));
}

#[test]
fn validate_strict_warns_about_unresolved_references() {
    let temp = fixture(r#"{ "output": { "ip": { "value": "${aws_instance.web.ip}" } } }"#);

    let output = run("validate", temp.path(), &["--strict"]);

    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains(
        "warn: output.ip references aws_instance.web.ip which does not resolve to any node"
    ));
}

#[test]
fn order_lists_dependencies_first() {
    let temp = fixture(WEB_STACK);

    let output = run("order", temp.path(), &[]);

    assert_eq!(output.exit_code, 0);
    assert!(line(&output, "resource.aws_vpc.main") < line(&output, "resource.aws_subnet.a"));
    assert!(line(&output, "resource.aws_subnet.a") < line(&output, "resource.aws_instance.web"));
    assert!(line(&output, "var.region") < line(&output, "resource.aws_instance.web"));
    assert!(line(&output, "resource.aws_instance.web") < line(&output, "output.ip"));
    assert!(output.stdout.contains("Order: 6 nodes, 7 edges"));
}

#[test]
fn order_json_is_machine_readable() {
    let temp = fixture(WEB_STACK);

    let output = run("order", temp.path(), &["--format", "json"]);

    assert_eq!(output.exit_code, 0);
    let report: serde_json::Value = serde_json::from_str(&output.stdout).expect("json report");
    assert_eq!(report["order"].as_array().map(Vec::len), Some(6));
    assert_eq!(report["stats"]["nodes"], 6);
    assert_eq!(report["documents"].as_array().map(Vec::len), Some(1));
}

#[test]
fn order_of_a_cycle_fails() {
    let temp = fixture(CYCLE);

    let output = run("order", temp.path(), &[]);

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("error: dependency cycle detected"));
}

#[test]
fn module_flag_prefixes_ids() {
    let temp = fixture(WEB_STACK);

    let output = run("order", temp.path(), &["--module", "app"]);

    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains("(module app)"));
    assert!(output.line_ending_with("app.var.region").is_some());
    assert!(output.line_ending_with("  var.region").is_none());
}

#[test]
fn folders_are_scanned_recursively_skipping_hidden_entries() {
    let temp = TempDir::new().expect("tempdir");
    write_file(
        &temp.path().join("network/vpc.json"),
        r#"{ "resource": { "aws_vpc": { "main": {} } } }"#,
    )
    .expect("write vpc");
    write_file(
        &temp.path().join("outputs.json"),
        r#"{ "output": { "vpc": { "value": "${aws_vpc.main.id}" } } }"#,
    )
    .expect("write outputs");
    write_file(&temp.path().join(".cache/broken.json"), "{ not json").expect("write hidden");

    let output = run("order", temp.path(), &[]);

    assert_eq!(output.exit_code, 0);
    assert!(line(&output, "resource.aws_vpc.main") < line(&output, "output.vpc"));
}

#[test]
fn malformed_document_fails_with_parse_error() {
    let temp = fixture("{ not json");

    let output = run("validate", temp.path(), &[]);

    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("failed to parse config"));
}

#[test]
fn graph_reduce_drops_shortcut_edges() {
    let temp = fixture(WEB_STACK);

    let full = run("graph", temp.path(), &[]);
    let reduced = run("graph", temp.path(), &["--reduce"]);

    let shortcut = r#""resource.aws_instance.web" -> "provider.aws.default";"#;
    assert!(full.stdout.starts_with("digraph resource_graph {"));
    assert!(full.stdout.contains(shortcut));
    assert!(!reduced.stdout.contains(shortcut));
    assert!(reduced
        .stdout
        .contains(r#""resource.aws_subnet.a" -> "resource.aws_vpc.main";"#));
}

#[test]
fn graph_target_keeps_only_dependencies() {
    let temp = fixture(WEB_STACK);

    let output = run("graph", temp.path(), &["--target", "resource.aws_subnet.a"]);

    assert_eq!(output.exit_code, 0);
    assert!(output.stdout.contains(r#""resource.aws_vpc.main" [label="resource:main"];"#));
    assert!(!output.stdout.contains("output.ip"));
    assert!(!output.stdout.contains("resource.aws_instance.web"));
}

#[test]
fn parallel_walk_with_failure_skips_dependents() {
    let temp = fixture(WEB_STACK);

    let output = run(
        "walk",
        temp.path(),
        &["--parallel", "--max-parallel", "2", "--fail", "resource.aws_subnet.a"],
    );

    assert_eq!(output.exit_code, 1);
    assert!(output.stdout.contains("+ visited   resource.aws_vpc.main"));
    assert!(output.stdout.contains("! failed    resource.aws_subnet.a"));
    assert!(output.stdout.contains("= skipped   resource.aws_instance.web"));
    assert!(output.stdout.contains("= skipped   output.ip"));
    assert!(output.stdout.contains("Walk: 3 visited, 1 failed, 2 skipped"));
}

#[test]
fn reverse_walk_visits_dependents_first() {
    let temp = fixture(WEB_STACK);

    let output = run("walk", temp.path(), &["--reverse"]);

    assert_eq!(output.exit_code, 0);
    assert!(line(&output, "output.ip") < line(&output, "resource.aws_instance.web"));
    assert!(line(&output, "resource.aws_subnet.a") < line(&output, "resource.aws_vpc.main"));
    assert!(line(&output, "resource.aws_vpc.main") < line(&output, "provider.aws.default"));
}

#[test]
fn missing_arguments_are_usage_errors() {
    let output = run_raw(&["order"]).expect("run terrace");
    println!("{}", output.transcript());

    assert_eq!(output.exit_code, 2);
    assert!(output.stderr.contains("Usage"));
}
