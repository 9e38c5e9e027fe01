use compact_str::CompactString;

/// One weighted observation collected while scanning, before tree construction.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// `/`-separated identifier (e.g. "src/main.rs")
    pub id: CompactString,
    /// Revision index the weight belongs to
    pub revision: usize,
    /// Non-negative, finite weight (file size, line count, ...)
    pub weight: f64,
}

/// Entries gathered from every revision of an input, ready for `tree::build_tree`.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Name given to the synthetic root entity
    pub root_name: String,
    pub entries: Vec<RawEntry>,
    pub revisions: usize,
}
