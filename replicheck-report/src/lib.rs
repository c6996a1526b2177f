//! Report sink and rendering for replicheck.
//!
//! The engine hands over a finalized `ReconciliationReport`; this crate
//! turns it into ordered markdown blocks and persists them through a
//! [`ReportSink`]. The default sink writes one `.md` file per report
//! section plus a `README.md` summary into a timestamped directory.

mod render;
mod sink;

pub use render::render;
pub use sink::{MarkdownDirSink, MemorySink, ReportError, ReportResult, ReportSink};
