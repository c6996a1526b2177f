//! Report sinks.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors that can occur while persisting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Consumes rendered report blocks. Writes are append-only per section;
/// `finish` receives the one summary block at the end of the run.
pub trait ReportSink {
    fn write_section(&mut self, section: &str, block: &str) -> ReportResult<()>;

    fn finish(&mut self, summary: &str) -> ReportResult<()>;
}

/// Markdown directory sink: one `{section}.md` per section, the summary in
/// `README.md`, all under `{base}/{label}_{timestamp}/`.
pub struct MarkdownDirSink {
    dir: PathBuf,
}

impl MarkdownDirSink {
    /// Creates the output directory, named after the first source's
    /// database and the wall-clock start time.
    pub fn create(base: &Path, label: &str) -> ReportResult<Self> {
        let stamp = Utc::now().format("%Y-%m-%d_%H%M%S");
        let dir = base.join(format!("{label}_{stamp}"));
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "writing report");
        Ok(Self { dir })
    }

    /// The directory this sink writes into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append(&self, file_name: &str, content: &str) -> ReportResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file_name))?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl ReportSink for MarkdownDirSink {
    fn write_section(&mut self, section: &str, block: &str) -> ReportResult<()> {
        let file_name = if section == "readme" {
            "README.md".to_string()
        } else {
            format!("{section}.md")
        };
        self.append(&file_name, block)
    }

    fn finish(&mut self, summary: &str) -> ReportResult<()> {
        self.append("README.md", summary)
    }
}

/// In-memory sink for tests: records every write in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub writes: Vec<(String, String)>,
    pub summary: Option<String>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All blocks written to one section, concatenated.
    #[must_use]
    pub fn section_text(&self, section: &str) -> String {
        self.writes
            .iter()
            .filter(|(s, _)| s == section)
            .map(|(_, block)| block.as_str())
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn write_section(&mut self, section: &str, block: &str) -> ReportResult<()> {
        self.writes.push((section.to_string(), block.to_string()));
        Ok(())
    }

    fn finish(&mut self, summary: &str) -> ReportResult<()> {
        self.summary = Some(summary.to_string());
        Ok(())
    }
}
