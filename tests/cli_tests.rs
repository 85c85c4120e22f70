use indoc::indoc;
use linepatch::{CodeChunk, Edit, Patch};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn linepatch(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_linepatch"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_diff_prints_patch_json() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("before.txt"), "a\nb\nc\n").unwrap();
    fs::write(dir.path().join("after.txt"), "a\nx\nc\n").unwrap();

    let output = linepatch(dir.path(), &["diff", "before.txt", "after.txt", "--name", "f.txt"]);
    assert!(output.status.success());
    let patch: Patch = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(patch.edits, vec![Edit::replacement("f.txt", 1, "b", "x")]);
}

#[test]
fn test_validate_and_preview_use_original_file_name() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "a\nb\n").unwrap();

    let good = Patch::new(vec![Edit::replacement("notes.txt", 0, "a", "A")]);
    fs::write(dir.path().join("good.json"), serde_json::to_string(&good).unwrap()).unwrap();
    let bad = Patch::new(vec![Edit::deletion("notes.txt", 9, "ghost")]);
    fs::write(dir.path().join("bad.json"), serde_json::to_string(&bad).unwrap()).unwrap();

    assert!(linepatch(dir.path(), &["validate", "notes.txt", "good.json"])
        .status
        .success());
    let rejected = linepatch(dir.path(), &["validate", "notes.txt", "bad.json"]);
    assert_eq!(rejected.status.code(), Some(1));

    let preview = linepatch(dir.path(), &["preview", "notes.txt", "good.json"]);
    assert!(preview.status.success());
    assert_eq!(String::from_utf8_lossy(&preview.stdout), "A\nb\n");
    assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "a\nb\n");
}

#[test]
fn test_chunks_then_relocate_rewrites_file() {
    let dir = tempdir().unwrap();
    let source = indoc! {"
        import json

        def dump(obj):
            return json.dumps(obj)
    "};
    fs::write(dir.path().join("d.py"), source).unwrap();

    let output = linepatch(dir.path(), &["chunks", "d.py", "-k", "dump", "--context-lines", "2"]);
    assert!(output.status.success());
    let chunks: Vec<CodeChunk> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(chunks.len(), 1);
    fs::write(dir.path().join("chunks.json"), &output.stdout).unwrap();
    fs::write(
        dir.path().join("fix.py"),
        "def dump(obj):\n    return json.dumps(obj, indent=2)\n",
    )
    .unwrap();

    let dry = linepatch(
        dir.path(),
        &["relocate", "d.py", "chunks.json", "fix.py", "--context-lines", "2", "-n"],
    );
    assert!(dry.status.success());
    let diff = String::from_utf8_lossy(&dry.stdout);
    assert!(diff.contains("+    return json.dumps(obj, indent=2)"));
    assert_eq!(fs::read_to_string(dir.path().join("d.py")).unwrap(), source);

    let applied = linepatch(
        dir.path(),
        &["relocate", "d.py", "chunks.json", "fix.py", "--context-lines", "2"],
    );
    assert!(applied.status.success());
    let rewritten = fs::read_to_string(dir.path().join("d.py")).unwrap();
    assert!(rewritten.contains("    return json.dumps(obj, indent=2)\n"));
}

#[test]
fn test_negative_line_number_is_reported_by_edit() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "a\nb\n").unwrap();
    fs::write(
        dir.path().join("neg.json"),
        r#"{"edits":[{"file_name":"notes.txt","line_number":-1,"line_content":"","new_line_content":"x"}]}"#,
    )
    .unwrap();

    let output = linepatch(dir.path(), &["validate", "notes.txt", "neg.json"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Edit 1"));
    assert!(stderr.contains("negative line number (-1)"));
}
