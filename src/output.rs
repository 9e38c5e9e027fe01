use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use compact_str::CompactString;

use crate::layout::{BlockTree, Rect};
use crate::tree::arena::EntityTree;

/// One emitted rectangle: `<id>,<x>,<y>,<width>,<height>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RectRecord {
    pub id: CompactString,
    pub rect: Rect,
}

impl fmt::Display for RectRecord {
    // Rust float formatting always uses '.', whatever the locale
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:.10},{:.10},{:.10},{:.10}",
            self.id, self.rect.x, self.rect.y, self.rect.width, self.rect.height
        )
    }
}

/// Case-insensitive ordering of ids, compared char by char after lowercasing.
///
/// Ids equal ignoring case (`Src` and `src`) fall back to byte order, so the
/// record order never depends on the order entities were loaded in.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Collect one record per entity block using the geometry in `rects`, sorted by id.
pub fn collect_records(blocks: &BlockTree, rects: &[Rect], entities: &EntityTree) -> Vec<RectRecord> {
    let mut records: Vec<RectRecord> = blocks
        .entity_blocks()
        .map(|(block, entity)| RectRecord {
            id: entities.get(entity).id.clone(),
            rect: rects[block.index()],
        })
        .collect();
    records.sort_by(|a, b| compare_ids(&a.id, &b.id));
    records
}

/// Render records as newline-terminated lines.
pub fn render_records(records: &[RectRecord]) -> String {
    let mut out = String::with_capacity(records.len() * 64);
    for record in records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out
}

/// What to do when a sink fails to take a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkPolicy {
    /// Log the failure, remember the revision and keep going
    #[default]
    Continue,
    /// Stop the run and return the error
    Abort,
}

/// Consumer of each revision's sorted records.
pub trait RecordSink {
    fn emit(&mut self, revision: usize, records: &[RectRecord]) -> Result<()>;
}

/// Writes `<dir>/t<revision>.rect`, creating `dir` on demand.
pub struct RectFileSink {
    dir: PathBuf,
}

impl RectFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, revision: usize) -> PathBuf {
        self.dir.join(format!("t{}.rect", revision))
    }
}

impl RecordSink for RectFileSink {
    fn emit(&mut self, revision: usize, records: &[RectRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))?;
        let path = self.path_for(revision);
        std::fs::write(&path, render_records(records))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }
}

/// Keeps every revision in memory (tests, diagnostics).
#[derive(Debug, Default)]
pub struct MemorySink {
    pub revisions: Vec<(usize, Vec<RectRecord>)>,
}

impl RecordSink for MemorySink {
    fn emit(&mut self, revision: usize, records: &[RectRecord]) -> Result<()> {
        self.revisions.push((revision, records.to_vec()));
        Ok(())
    }
}
