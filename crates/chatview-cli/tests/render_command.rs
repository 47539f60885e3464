//! Integration tests for `chatview render`.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn write_doc(dir: &TempDir, doc: &serde_json::Value) -> String {
    let path = dir.path().join("doc.json");
    fs::write(&path, serde_json::to_string(doc).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_render_text_document() {
    let dir = TempDir::new().unwrap();
    let file = write_doc(&dir, &json!({"text": "# Summary\n\nhello **world**"}));

    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", dir.path())
        .args(["render", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary"))
        .stdout(predicate::str::contains("hello world"));
}

#[test]
fn test_render_blocks_from_stdin() {
    let dir = TempDir::new().unwrap();
    let doc = json!({"blocks": [
        {"block_type": "text", "text": "Spending by month:"},
        {"block_type": "react", "title": "Spending", "code": r#"
            export default function Spending() {
                const data = [{ m: 'Jan', v: 4 }, { m: 'Feb', v: 8 }];
                return (
                    <div>
                        <p>Two months</p>
                        <BarChart data={data} xKey="m" yKey="v" />
                    </div>
                );
            }
        "#}
    ]});

    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", dir.path())
        .arg("render")
        .write_stdin(serde_json::to_string(&doc).unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("Spending by month:"))
        .stdout(predicate::str::contains("Two months"))
        .stdout(predicate::str::contains("Feb"));
}

#[test]
fn test_render_reports_block_errors_inline() {
    let dir = TempDir::new().unwrap();
    let file = write_doc(
        &dir,
        &json!({"blocks": [
            {"block_type": "react", "code": "export default function X() { return <div>; }"},
            {"block_type": "text", "text": "still here"}
        ]}),
    );

    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", dir.path())
        .args(["render", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("block 1 transpile error"))
        .stdout(predicate::str::contains("still here"));
}

#[test]
fn test_render_rejects_unknown_shape() {
    let dir = TempDir::new().unwrap();
    let file = write_doc(&dir, &json!({"blocks": [{"block_type": "video"}]}));

    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", dir.path())
        .args(["render", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid content"))
        .stderr(predicate::str::contains("$.blocks[0].block_type"));
}

#[test]
fn test_render_missing_file() {
    let dir = TempDir::new().unwrap();

    cargo_bin_cmd!("chatview")
        .env("CHATVIEW_HOME", dir.path())
        .args(["render", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));
}
