use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use compact_str::CompactString;
use rayon::prelude::*;

use super::types::{RawEntry, ScanResult};
use crate::tree;

/// File extensions recognized as revision files.
const REVISION_EXTENSIONS: &[&str] = &["csv", "txt"];

/// Load a dataset directory: one `id,weight` file per revision.
///
/// Files are ordered by the first number in their name (`t0.csv`, `t1.csv`, ...
/// `t10.csv`), falling back to the name itself. Files are parsed in parallel.
pub fn load_dataset(dir: &Path) -> Result<ScanResult> {
    let files = revision_files(dir)?;
    if files.is_empty() {
        bail!(
            "No revision files (*.csv, *.txt) found in {}",
            dir.display()
        );
    }

    tracing::info!(
        "Loading {} revision files from {}",
        files.len(),
        dir.display()
    );

    let per_revision: Vec<Vec<RawEntry>> = files
        .par_iter()
        .enumerate()
        .map(|(revision, path)| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_revision(&text, &path.display().to_string(), revision)
        })
        .collect::<Result<_>>()?;

    for (revision, entries) in per_revision.iter().enumerate() {
        tracing::debug!(
            "Revision {} ({}): {} entries",
            revision,
            files[revision].display(),
            entries.len()
        );
    }

    let root_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.to_string_lossy().to_string());

    Ok(ScanResult {
        root_name,
        revisions: files.len(),
        entries: per_revision.into_iter().flatten().collect(),
    })
}

/// List revision files in `dir`, sorted into revision order.
fn revision_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read dataset directory {}", dir.display()))?
    {
        let path = entry?.path();
        let recognized = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| REVISION_EXTENSIONS.iter().any(|r| r.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if path.is_file() && recognized {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        (revision_number(&name), name)
    });
    Ok(files)
}

/// First run of ASCII digits in a file name. Names without digits sort last.
fn revision_number(name: &str) -> u64 {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(u64::MAX)
}

/// Parse one revision file. `source` is only used in error messages.
///
/// Lines are `id,weight`; the weight is everything after the last comma so ids
/// may contain commas. Blank lines, `#` comments and an `id,weight` header are
/// skipped.
pub fn parse_revision(text: &str, source: &str, revision: usize) -> Result<Vec<RawEntry>> {
    let mut entries = Vec::new();
    let mut seen: HashSet<CompactString> = HashSet::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.eq_ignore_ascii_case("id,weight") {
            continue;
        }

        let Some((id, weight)) = line.rsplit_once(',') else {
            bail!("{}:{}: expected 'id,weight', got '{}'", source, line_no + 1, line);
        };
        let id = id.trim();
        let weight: f64 = weight.trim().parse().with_context(|| {
            format!("{}:{}: invalid weight '{}'", source, line_no + 1, weight.trim())
        })?;

        if !weight.is_finite() || weight < 0.0 {
            bail!(
                "{}:{}: weight must be finite and non-negative, got {}",
                source,
                line_no + 1,
                weight
            );
        }
        // `a//b` and `/a/b` name the same entity as `a/b`
        let normalized = tree::normalize_id(id);
        if normalized.is_empty() {
            bail!("{}:{}: empty id", source, line_no + 1);
        }
        if !seen.insert(normalized.clone()) {
            bail!("{}:{}: duplicate id '{}'", source, line_no + 1, normalized);
        }

        entries.push(RawEntry {
            id: normalized,
            revision,
            weight,
        });
    }

    Ok(entries)
}
