use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Result};
use compact_str::CompactString;
use jwalk::WalkDir;
use rayon::prelude::*;

use super::types::{RawEntry, ScanResult};

/// Walk one snapshot directory and record every regular file's size as its
/// weight for `revision`. Ids are paths relative to `root`, joined with `/`.
///
/// Unreadable entries are logged and skipped (non-fatal).
pub fn scan_walkdir(root: &Path, revision: usize) -> Result<Vec<RawEntry>> {
    if !root.is_dir() {
        bail!("Snapshot root {} is not a directory", root.display());
    }

    let start = Instant::now();
    let mut entries = Vec::new();
    let mut skipped = 0u64;

    for item in WalkDir::new(root).skip_hidden(false).follow_links(false) {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Walk error under {}: {}", root.display(), e);
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };

        let Some(id) = relative_id(root, &path) else {
            continue;
        };
        entries.push(RawEntry {
            id,
            revision,
            weight: size as f64,
        });
    }

    tracing::info!(
        "Scanned {} (revision {}): {} files, {} skipped in {:.2}s",
        root.display(),
        revision,
        entries.len(),
        skipped,
        start.elapsed().as_secs_f64()
    );

    Ok(entries)
}

/// Scan several snapshot directories, one per revision, in parallel.
/// The same relative path in two snapshots is the same entity.
pub fn scan_snapshots(roots: &[PathBuf]) -> Result<ScanResult> {
    if roots.is_empty() {
        bail!("No snapshot directories given");
    }

    let per_revision: Vec<Vec<RawEntry>> = roots
        .par_iter()
        .enumerate()
        .map(|(revision, root)| scan_walkdir(root, revision))
        .collect::<Result<_>>()?;

    let root_name = roots[0]
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "snapshots".to_string());

    Ok(ScanResult {
        root_name,
        revisions: roots.len(),
        entries: per_revision.into_iter().flatten().collect(),
    })
}

/// `root/a/b.txt` → `a/b.txt`, independent of the platform separator.
fn relative_id(root: &Path, path: &Path) -> Option<CompactString> {
    let relative = path.strip_prefix(root).ok()?;
    let mut id = CompactString::new("");
    for component in relative.components() {
        if !id.is_empty() {
            id.push('/');
        }
        id.push_str(&component.as_os_str().to_string_lossy());
    }
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
