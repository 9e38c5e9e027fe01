pub mod dataset;
pub mod types;
pub mod walk;

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::tree::{self, arena::EntityTree};

/// Where the revision history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// A single directory of `id,weight` revision files
    #[default]
    Dataset,
    /// One directory tree per revision; file sizes are the weights
    Snapshots,
}

/// Scan the inputs and build the weighted entity hierarchy.
pub fn load(inputs: &[PathBuf], kind: InputKind) -> Result<EntityTree> {
    let scan = match kind {
        InputKind::Dataset => {
            let [dir] = inputs else {
                bail!("Dataset input takes exactly one directory, got {}", inputs.len());
            };
            dataset::load_dataset(dir)?
        }
        InputKind::Snapshots => walk::scan_snapshots(inputs)?,
    };

    tree::build_tree(&scan.root_name, &scan.entries, scan.revisions)
}
