use replicheck_report::{render, MarkdownDirSink, MemorySink, ReportSink};
use replicheck_types::{
    CollectionCounts, DiffEntry, EntityDiff, EntityKind, ExistenceResult, ReconciliationReport,
    SkipNote,
};
use serde_json::json;
use std::collections::BTreeSet;

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn sample_report() -> ReconciliationReport {
    let mut report = ReconciliationReport::new("db1", "db2");
    report.existence.insert(
        EntityKind::Collection,
        ExistenceResult {
            unique_to_a: names(&["orders"]),
            unique_to_b: names(&["products"]),
            common: names(&["users"]),
        },
    );
    report.entity_diffs.push(EntityDiff {
        kind: EntityKind::Collection,
        collection: None,
        key: "users".into(),
        entries: vec![],
    });
    report.collection_counts.insert(
        "users".into(),
        CollectionCounts {
            count_a: 100,
            count_b: 98,
        },
    );
    report.index_existence.insert(
        "users".into(),
        ExistenceResult {
            unique_to_a: names(&["email_idx"]),
            unique_to_b: BTreeSet::new(),
            common: names(&["primary"]),
        },
    );
    report.recent_document_diffs.push(EntityDiff {
        kind: EntityKind::Document,
        collection: Some("users".into()),
        key: "42".into(),
        entries: vec![DiffEntry::value_changed(
            "email",
            json!("a@example.com"),
            json!("b@example.com"),
        )],
    });
    report.skips.push(SkipNote {
        context: "count:archive".into(),
        source: "db2".into(),
        cause: "transient fetch error: timeout".into(),
    });
    report.finalize();
    report
}

// ── Rendering content ────────────────────────────────────────────

#[test]
fn existence_mismatch_lands_in_kind_section_and_readme() {
    let mut sink = MemorySink::new();
    render(&sample_report(), &mut sink).unwrap();

    let collections = sink.section_text("collections");
    assert!(collections.contains("# Collections"));
    assert!(collections.contains("db1: 2, db2: 2"));
    assert!(collections.contains("Unique to db1:"));
    assert!(collections.contains("  - orders"));
    assert!(collections.contains("Unique to db2:"));
    assert!(collections.contains("  - products"));

    let readme = sink.section_text("readme");
    assert!(readme.contains("Mismatch found in collections."));
}

#[test]
fn count_mismatch_is_rendered_with_both_values() {
    let mut sink = MemorySink::new();
    render(&sample_report(), &mut sink).unwrap();

    let collections = sink.section_text("collections");
    assert!(collections.contains("Mismatch in collection 'users': 100 vs 98"));
}

#[test]
fn document_diffs_carry_old_and_new_values() {
    let mut sink = MemorySink::new();
    render(&sample_report(), &mut sink).unwrap();

    let documents = sink.section_text("documents");
    assert!(documents.contains("Differences in document 'users/42':"));
    assert!(documents.contains("`email`: value changed"));
    assert!(documents.contains("\"a@example.com\""));
    assert!(documents.contains("\"b@example.com\""));
}

#[test]
fn identical_entities_are_noted() {
    let mut sink = MemorySink::new();
    render(&sample_report(), &mut sink).unwrap();

    let collections = sink.section_text("collections");
    assert!(collections.contains("No differences in collection 'users'."));
}

#[test]
fn skips_and_summary_land_in_readme() {
    let mut sink = MemorySink::new();
    render(&sample_report(), &mut sink).unwrap();

    let readme = sink.section_text("readme");
    assert!(readme.contains("Skipped comparisons"));
    assert!(readme.contains("count:archive (db2): transient fetch error: timeout"));

    let summary = sink.summary.expect("summary written");
    assert!(summary.contains("count mismatches: 1"));
    assert!(summary.contains("skipped comparisons: 1"));
    assert!(summary.contains("documents with differences: 1"));
    assert!(!summary.contains("RUN INCOMPLETE"));
}

#[test]
fn incomplete_run_is_flagged_in_summary() {
    let mut report = sample_report();
    report.incomplete = true;
    let mut sink = MemorySink::new();
    render(&report, &mut sink).unwrap();
    assert!(sink.summary.unwrap().contains("RUN INCOMPLETE"));
}

// ── Markdown directory sink ──────────────────────────────────────

#[test]
fn markdown_sink_writes_section_files_and_readme() {
    let tmp = tempfile::tempdir().unwrap();
    let mut sink = MarkdownDirSink::create(tmp.path(), "testdb").unwrap();
    render(&sample_report(), &mut sink).unwrap();

    let dir = sink.dir().to_path_buf();
    assert!(dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("testdb_"));
    assert!(dir.join("collections.md").exists());
    assert!(dir.join("indexes.md").exists());
    assert!(dir.join("documents.md").exists());
    assert!(dir.join("README.md").exists());

    let readme = std::fs::read_to_string(dir.join("README.md")).unwrap();
    assert!(readme.contains("## Summary"));
}

#[test]
fn markdown_sink_appends_per_section() {
    let tmp = tempfile::tempdir().unwrap();
    let mut sink = MarkdownDirSink::create(tmp.path(), "testdb").unwrap();
    sink.write_section("views", "first\n").unwrap();
    sink.write_section("views", "second\n").unwrap();

    let text = std::fs::read_to_string(sink.dir().join("views.md")).unwrap();
    assert_eq!(text, "first\nsecond\n");
}
