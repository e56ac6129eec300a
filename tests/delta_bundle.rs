//! End-to-end tests for the DELTA and CHAT bundle modes.

mod common;

use common::{entry_names, read_entry, TestRepo};
use predicates::prelude::*;

fn seed_base(repo: &TestRepo) {
    repo.write("keep.go", "package keep\n\nfunc Same() {}\n");
    repo.write("mod.go", "package mod\n\nfunc Old() {}\n");
    repo.write("moved.go", "package moved\n\nfunc Stable() {}\n");
}

/// Run a FULL build so the snapshot (and blobs) exist for a later delta.
fn baseline(repo: &TestRepo) {
    repo.cmd()
        .arg("--zip")
        .arg(repo.out.join("base.zip"))
        .arg("--store-blobs")
        .assert()
        .success();
}

#[test]
fn delta_detects_add_change_remove_and_exact_rename() {
    let repo = TestRepo::new();
    seed_base(&repo);
    repo.write("gone.go", "package gone\n");
    baseline(&repo);

    // Mutate: change mod.go, add fresh.go, remove gone.go, rename moved.go.
    repo.write("mod.go", "package mod\n\nfunc Old() {}\n\nfunc New() {}\n");
    repo.write("fresh.go", "package fresh\n");
    repo.remove("gone.go");
    let moved_body = "package moved\n\nfunc Stable() {}\n";
    repo.remove("moved.go");
    repo.write("relocated.go", moved_body);

    let out = repo.out.join("delta.zip");
    repo.cmd()
        .arg("--delta")
        .arg(&out)
        .arg("--store-blobs")
        .assert()
        .success()
        .stdout(predicate::str::contains("added=1"))
        .stdout(predicate::str::contains("removed=1"))
        .stdout(predicate::str::contains("changed=1"))
        .stdout(predicate::str::contains("renamed=1"));

    let index: serde_json::Value =
        serde_json::from_str(&read_entry(&out, "delta.index.json")).unwrap();
    assert_eq!(index["added"][0]["path"], "fresh.go");
    assert_eq!(index["removed"][0]["path"], "gone.go");
    assert_eq!(index["renamed"][0]["from"], "moved.go");
    assert_eq!(index["renamed"][0]["to"], "relocated.go");
    let changed = &index["changed"][0];
    assert_eq!(changed["path"], "mod.go");
    assert_eq!(changed["diff"], "diffs/mod.go.patch");
    assert_eq!(changed["oversize"], false);
    assert_ne!(changed["hashBefore"], changed["hashAfter"]);
}

#[test]
fn delta_layout_and_real_diff_from_blobs() {
    let repo = TestRepo::new();
    seed_base(&repo);
    baseline(&repo);

    repo.write("mod.go", "package mod\n\nfunc Old() {}\n\nfunc New() {}\n");
    repo.write("fresh.go", "package fresh\n");

    let out = repo.out.join("delta.zip");
    repo.cmd().arg("--delta").arg(&out).assert().success();

    assert_eq!(
        entry_names(&out),
        vec![
            "delta.index.json",
            "diffs/mod.go.patch",
            "added/fresh.go",
            "delta.patch",
            "SUMMARY.md",
            "README.md",
        ]
    );

    // The blob store held the old body, so the patch is a real diff.
    let patch = read_entry(&out, "diffs/mod.go.patch");
    assert!(patch.contains("--- a/mod.go"));
    assert!(patch.contains("+++ b/mod.go"));
    assert!(patch.contains("+func New() {}"));
    assert!(!patch.contains("diff omitted"));

    // Aggregated patch carries both the added file and the change.
    let aggregated = read_entry(&out, "delta.patch");
    assert!(aggregated.contains("+++ fresh.go"));
    assert!(aggregated.contains("+++ b/mod.go"));
    assert!(aggregated.ends_with('\n'));

    let summary = read_entry(&out, "SUMMARY.md");
    assert!(summary.contains("- Added: 1"));
    assert!(summary.contains("- Changed: 1"));
    assert!(summary.contains("- fresh.go"));

    assert_eq!(read_entry(&out, "added/fresh.go"), "package fresh\n");
}

#[test]
fn delta_without_prior_snapshot_reports_everything_added() {
    let repo = TestRepo::new();
    seed_base(&repo);

    let out = repo.out.join("delta.zip");
    repo.cmd()
        .arg("--delta")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("added=3"));

    let index: serde_json::Value =
        serde_json::from_str(&read_entry(&out, "delta.index.json")).unwrap();
    assert_eq!(index["added"].as_array().unwrap().len(), 3);
    assert_eq!(index["removed"].as_array().unwrap().len(), 0);
    assert_eq!(index["changed"].as_array().unwrap().len(), 0);
}

#[test]
fn delta_is_empty_when_nothing_changed() {
    let repo = TestRepo::new();
    seed_base(&repo);
    baseline(&repo);

    let out = repo.out.join("delta.zip");
    repo.cmd()
        .arg("--delta")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "added=0, removed=0, changed=0, renamed=0",
        ));

    let index: serde_json::Value =
        serde_json::from_str(&read_entry(&out, "delta.index.json")).unwrap();
    for key in ["added", "removed", "renamed", "changed"] {
        assert_eq!(index[key].as_array().unwrap().len(), 0, "{key} not empty");
    }
}

#[test]
fn oversize_diff_uses_placeholder_and_flag() {
    let repo = TestRepo::new();
    repo.write("big.go", &"var a = 1;\n".repeat(50));
    repo.cmd()
        .arg("--zip")
        .arg(repo.out.join("base.zip"))
        .arg("--store-blobs")
        .assert()
        .success();

    repo.write("big.go", &"var b = 2;\n".repeat(50));
    let out = repo.out.join("delta.zip");
    repo.cmd()
        .arg("--delta")
        .arg(&out)
        .arg("--max-diff-bytes")
        .arg("64")
        .assert()
        .success()
        .stdout(predicate::str::contains("oversize=1"));

    let index: serde_json::Value =
        serde_json::from_str(&read_entry(&out, "delta.index.json")).unwrap();
    assert_eq!(index["changed"][0]["oversize"], true);

    let patch = read_entry(&out, "diffs/big.go.patch");
    assert_eq!(
        patch,
        "--- a/big.go\n+++ b/big.go\n@@\n# diff omitted (oversize)\n"
    );
}

#[test]
fn similarity_rename_detected_with_old_root() {
    let repo = TestRepo::new();
    repo.write("lib/util.ts", "export function sum(a, b) {\n  return a + b;\n}\n");
    baseline(&repo);

    // Preserve the old tree for the similarity provider, then move and
    // lightly reformat the file so hashes differ.
    let old_root = repo.out.join("old-tree");
    std::fs::create_dir_all(old_root.join("lib")).unwrap();
    std::fs::copy(
        repo.src.join("lib/util.ts"),
        old_root.join("lib/util.ts"),
    )
    .unwrap();
    repo.remove("lib/util.ts");
    repo.write(
        "core/util.ts",
        "export  function sum(a,  b) {\n    return a + b;\n}\n",
    );

    let out = repo.out.join("delta.zip");
    repo.cmd()
        .arg("--delta")
        .arg(&out)
        .arg("--rename-similarity")
        .arg("--rename-sim-oldroot")
        .arg(&old_root)
        .assert()
        .success()
        .stdout(predicate::str::contains("renamed=1"));

    let index: serde_json::Value =
        serde_json::from_str(&read_entry(&out, "delta.index.json")).unwrap();
    assert_eq!(index["renamed"][0]["from"], "lib/util.ts");
    assert_eq!(index["renamed"][0]["to"], "core/util.ts");
    assert_eq!(index["added"].as_array().unwrap().len(), 0);
    assert_eq!(index["removed"].as_array().unwrap().len(), 0);
}

#[test]
fn chat_bundle_renders_messages_and_toc() {
    let repo = TestRepo::new();
    repo.write("hub.ts", "import { a } from './spoke';\nexport const run = () => a;\n");
    repo.write("spoke.ts", "export const a = 1;\n");
    repo.write("solo.go", "package solo\n\nfunc Main() {}\n");

    let out = repo.out.join("chat.zip");
    repo.cmd()
        .arg("--chat")
        .arg(&out)
        .arg("--chat-max-classes")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote chat bundle"));

    let names = entry_names(&out);
    assert!(names.contains(&"chat/0001.md".to_string()));
    assert!(names.contains(&"chat/0002.md".to_string()));
    assert!(names.contains(&"TOC.md".to_string()));
    assert!(names.contains(&"README.md".to_string()));

    // hub.ts has graph degree 1 and ranks first.
    let first = read_entry(&out, "chat/0001.md");
    assert!(first.starts_with("# hub.ts\n"));
    assert!(first.contains("```ts\n"));
    assert!(first.contains("export const run"));

    let readme = read_entry(&out, "README.md");
    assert!(readme.contains("- Files indexed: 3"));
}

#[test]
fn runtime_errors_exit_with_1() {
    let repo = TestRepo::new();
    repo.write("a.go", "package a\n");
    // Output path collides with an existing directory.
    repo.cmd()
        .arg("--zip")
        .arg(&repo.out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ERROR:"));
}
