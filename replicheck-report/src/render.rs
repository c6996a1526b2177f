//! Renders a finalized report into markdown section blocks.
//!
//! Section layout mirrors the tool's historical output: one file per
//! entity kind, `collections.md` for document counts, `indexes.md` for
//! index drift, `documents.md`/`random_documents.md` for sampled document
//! comparisons, and a `README.md` summary.

use crate::sink::{ReportResult, ReportSink};
use replicheck_types::{
    DiffEntry, DiffKind, EntityDiff, ExistenceResult, ReconciliationReport,
};
use serde_json::Value;

// Markdown block constructors; every block is self-delimiting.

fn h1(text: &str) -> String {
    format!("\n# {text}\n")
}

fn h2(text: &str) -> String {
    format!("\n## {text}\n")
}

fn h3(text: &str) -> String {
    format!("\n### {text}\n")
}

fn bullet(text: &str) -> String {
    format!("  - {text}\n")
}

fn list(text: &str) -> String {
    format!("- {text}\n")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn value_text(value: Option<&Value>) -> String {
    value.map_or_else(|| "(absent)".to_string(), Value::to_string)
}

fn entry_line(entry: &DiffEntry) -> String {
    match entry.kind {
        DiffKind::ValueChanged | DiffKind::TypeChanged => format!(
            "`{}`: {} ({} vs {})",
            entry.path,
            entry.kind,
            value_text(entry.left.as_ref()),
            value_text(entry.right.as_ref())
        ),
        DiffKind::Added => format!(
            "`{}`: {} ({})",
            entry.path,
            entry.kind,
            value_text(entry.right.as_ref())
        ),
        DiffKind::Removed => format!(
            "`{}`: {} ({})",
            entry.path,
            entry.kind,
            value_text(entry.left.as_ref())
        ),
    }
}

/// Writes one existence comparison into a section (and its count line into
/// the readme).
fn write_existence(
    sink: &mut dyn ReportSink,
    section: &str,
    heading: &str,
    report: &ReconciliationReport,
    existence: &ExistenceResult,
) -> ReportResult<()> {
    let count_a = existence.unique_to_a.len() + existence.matched();
    let count_b = existence.unique_to_b.len() + existence.matched();
    let counts = format!("{}: {count_a}, {}: {count_b}", report.label_a, report.label_b);

    sink.write_section(section, &h2(&format!("{heading} count")))?;
    sink.write_section(section, &bullet(&counts))?;
    sink.write_section("readme", &h2(&format!("{heading} count")))?;
    sink.write_section("readme", &bullet(&counts))?;

    if existence.has_mismatch() {
        let note = format!("Mismatch found in {}.", heading.to_lowercase());
        sink.write_section(section, &list(&note))?;
        sink.write_section("readme", &list(&note))?;
        if !existence.unique_to_a.is_empty() {
            sink.write_section(
                section,
                &h3(&format!("Unique to {}:", report.label_a)),
            )?;
            for name in &existence.unique_to_a {
                sink.write_section(section, &bullet(name))?;
            }
        }
        if !existence.unique_to_b.is_empty() {
            sink.write_section(
                section,
                &h3(&format!("Unique to {}:", report.label_b)),
            )?;
            for name in &existence.unique_to_b {
                sink.write_section(section, &bullet(name))?;
            }
        }
    }
    Ok(())
}

fn write_diffs(
    sink: &mut dyn ReportSink,
    section: &str,
    noun: &str,
    diffs: &[EntityDiff],
) -> ReportResult<()> {
    for entity_diff in diffs {
        let label = match &entity_diff.collection {
            Some(collection) => format!("{collection}/{}", entity_diff.key),
            None => entity_diff.key.clone(),
        };
        if entity_diff.entries.is_empty() {
            sink.write_section(section, &list(&format!("No differences in {noun} '{label}'.")))?;
        } else {
            sink.write_section(section, &h3(&format!("Differences in {noun} '{label}':")))?;
            for entry in &entity_diff.entries {
                sink.write_section(section, &bullet(&entry_line(entry)))?;
            }
        }
    }
    Ok(())
}

/// Renders the whole report, in canonical section order, into a sink.
pub fn render(report: &ReconciliationReport, sink: &mut dyn ReportSink) -> ReportResult<()> {
    sink.write_section(
        "readme",
        &h1(&format!(
            "Reconciliation: {} vs {}",
            report.label_a, report.label_b
        )),
    )?;

    // Schema kinds: existence plus detail diffs, one section per kind.
    for (kind, existence) in &report.existence {
        let section = kind.section();
        let heading = capitalize(section);
        sink.write_section(section, &h1(&heading))?;
        write_existence(sink, section, &heading, report, existence)?;

        let diffs: Vec<EntityDiff> = report
            .entity_diffs
            .iter()
            .filter(|d| d.kind == *kind)
            .cloned()
            .collect();
        write_diffs(sink, section, section.trim_end_matches('s'), &diffs)?;
    }

    // Per-collection document counts.
    if !report.collection_counts.is_empty() {
        sink.write_section("collections", &h2("Collection document counts"))?;
        for (collection, counts) in &report.collection_counts {
            sink.write_section(
                "collections",
                &bullet(&format!(
                    "{collection}: {}: {}, {}: {}",
                    report.label_a, counts.count_a, report.label_b, counts.count_b
                )),
            )?;
            if counts.mismatch() {
                let note = format!(
                    "Mismatch in collection '{collection}': {} vs {}",
                    counts.count_a, counts.count_b
                );
                sink.write_section("collections", &h3(&note))?;
                sink.write_section("readme", &list(&note))?;
            }
        }
    }

    // Per-collection indexes.
    if !report.index_existence.is_empty() {
        sink.write_section("indexes", &h2("Collection indexes"))?;
        for (collection, existence) in &report.index_existence {
            sink.write_section(
                "indexes",
                &h3(&format!("Indexes for collection '{collection}':")),
            )?;
            let counts = format!(
                "{}: {}, {}: {}",
                report.label_a,
                existence.unique_to_a.len() + existence.matched(),
                report.label_b,
                existence.unique_to_b.len() + existence.matched()
            );
            sink.write_section("indexes", &bullet(&counts))?;
            for name in &existence.unique_to_a {
                sink.write_section(
                    "indexes",
                    &bullet(&format!("unique to {}: {name}", report.label_a)),
                )?;
            }
            for name in &existence.unique_to_b {
                sink.write_section(
                    "indexes",
                    &bullet(&format!("unique to {}: {name}", report.label_b)),
                )?;
            }
        }
        write_diffs(sink, "indexes", "index", &report.index_diffs)?;
    }

    // Sampled documents.
    if !report.document_existence.is_empty() {
        sink.write_section("documents", &h2("Sampled document keys"))?;
        for (collection, existence) in &report.document_existence {
            sink.write_section(
                "documents",
                &h3(&format!("Collection '{collection}':")),
            )?;
            for name in &existence.unique_to_a {
                sink.write_section(
                    "documents",
                    &bullet(&format!("unique to {}: {name}", report.label_a)),
                )?;
            }
            for name in &existence.unique_to_b {
                sink.write_section(
                    "documents",
                    &bullet(&format!("unique to {}: {name}", report.label_b)),
                )?;
            }
            if !existence.has_mismatch() {
                sink.write_section(
                    "documents",
                    &list(&format!("Sampled keys match ({} common).", existence.matched())),
                )?;
            }
        }
    }
    write_diffs(sink, "documents", "document", &report.recent_document_diffs)?;
    if !report.random_document_diffs.is_empty() {
        sink.write_section("random_documents", &h2("Random document sample"))?;
        write_diffs(
            sink,
            "random_documents",
            "document",
            &report.random_document_diffs,
        )?;
    }

    // Skips.
    if !report.skips.is_empty() {
        sink.write_section("readme", &h2("Skipped comparisons"))?;
        for skip in &report.skips {
            sink.write_section(
                "readme",
                &list(&format!("{} ({}): {}", skip.context, skip.source, skip.cause)),
            )?;
        }
    }

    // Summary.
    let summary = report.summary();
    let mut block = h2("Summary");
    block.push_str(&list(&format!(
        "existence mismatches: {}",
        summary.existence_mismatches
    )));
    block.push_str(&list(&format!(
        "count mismatches: {}",
        summary.count_mismatches
    )));
    block.push_str(&list(&format!(
        "entities with differences: {}",
        summary.entities_with_differences
    )));
    block.push_str(&list(&format!(
        "documents with differences: {}",
        summary.documents_with_differences
    )));
    block.push_str(&list(&format!("skipped comparisons: {}", summary.skips)));
    if summary.incomplete {
        block.push_str(&list("RUN INCOMPLETE: cancelled before all phases finished"));
    }
    if let Some(finished) = report.finished_at {
        block.push_str(&list(&format!(
            "run: {} to {}",
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            finished.format("%Y-%m-%d %H:%M:%S")
        )));
    }
    sink.finish(&block)
}
