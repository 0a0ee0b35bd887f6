use std::process::{Command, Stdio};

fn run_with(args: &[&str], file_name: &str, src: &str) -> (bool, String, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(file_name);
    std::fs::write(&path, src).unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_weave"))
        .args(args)
        .arg(&path)
        .env_remove("WEAVE_LOG")
        .stderr(Stdio::piped())
        .output()
        .expect("run");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

fn run_prog(src: &str) -> (bool, String, String) {
    run_with(&[], "prog.weave", src)
}

#[test]
fn publishes_draw_tree_as_json() {
    let program = r#"
; a single circle whose radius follows a state binding
($ size 4)
($ radius [size] (mul size 2))
[{:shape :circle :r radius :at (Vector 0 0)}]
"#;
    let (ok, out, err) = run_prog(program);
    assert!(ok, "program failed: {}", err);
    let tree: serde_json::Value = serde_json::from_str(&out).expect("json draw tree");
    assert_eq!(
        tree,
        serde_json::json!([{"shape": "circle", "r": 8.0, "at": {"x": 0.0, "y": 0.0}}])
    );
}

#[test]
fn println_output_precedes_the_draw_tree() {
    let (ok, out, err) = run_with(&["--format", "text"], "prog.weave", "(println \"sum\" (add 1 2)) [1 2]");
    assert!(ok, "program failed: {}", err);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["sum 3", "[1 2]"], "unexpected output: {:?}", lines);
}

#[test]
fn evaluation_failure_exits_non_zero() {
    let (ok, _out, err) = run_prog("(Vector 1)");
    assert!(!ok, "expected failure");
    assert!(err.contains("arity mismatch"), "missing arity message: {}", err);

    let (ok, _out, err) = run_prog("(add ghost 1)");
    assert!(!ok);
    assert!(err.contains("undefined name ghost"), "missing undefined-name message: {}", err);
}

#[test]
fn parse_failure_exits_non_zero() {
    let (ok, _out, err) = run_prog("(add 1 2");
    assert!(!ok);
    assert!(err.contains("unclosed"), "missing parse message: {}", err);
}

#[test]
fn runs_a_json_syntax_tree() {
    let tree = r#"{"kind":"Program","values":[
        {"kind":"StateAssignment","name":"a","params":[{"kind":"Number","value":2}]},
        {"kind":"CallExpression","name":"mul","values":[{"kind":"Variable","value":"a"},{"kind":"Number","value":21}]}
    ]}"#;
    let (ok, out, err) = run_with(&["--ast", "--format", "text"], "prog.json", tree);
    assert!(ok, "program failed: {}", err);
    assert_eq!(out.trim(), "42");
}

#[test]
fn wrong_argument_count_prints_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_weave"))
        .stderr(Stdio::piped())
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));

    let output = Command::new(env!("CARGO_BIN_EXE_weave"))
        .args(["one.weave", "two.weave"])
        .stderr(Stdio::piped())
        .output()
        .expect("run");
    assert!(!output.status.success());
}

#[test]
fn missing_file_is_reported() {
    let output = Command::new(env!("CARGO_BIN_EXE_weave"))
        .arg("/definitely/not/here.weave")
        .stderr(Stdio::piped())
        .output()
        .expect("run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("reading"));
}
