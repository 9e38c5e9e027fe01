pub mod aggregate;
pub mod arena;

use std::collections::HashMap;

use anyhow::{bail, Result};
use compact_str::CompactString;

use self::arena::{EntityId, EntityNode, EntityTree};
use crate::scanner::types::RawEntry;

/// Split a `/`-separated identifier into its non-empty components.
fn components(id: &str) -> impl Iterator<Item = &str> {
    id.split('/').filter(|c| !c.is_empty())
}

/// Canonical form of an identifier: `/a//b/` → `a/b`. Empty if only separators.
pub fn normalize_id(id: &str) -> CompactString {
    let mut normalized = CompactString::new("");
    for component in components(id) {
        if !normalized.is_empty() {
            normalized.push('/');
        }
        normalized.push_str(component);
    }
    normalized
}

/// Build an EntityTree from a flat list of RawEntry (from a dataset or a snapshot scan).
///
/// Identifiers are `/`-separated paths; missing intermediate nodes are created
/// with zero weight, then every parent is aggregated from its children.
///
/// Fails if a revision's total weight overflows `f64`: normalization would
/// divide by infinity and collapse every rectangle.
pub fn build_tree(root_name: &str, entries: &[RawEntry], revisions: usize) -> Result<EntityTree> {
    tracing::info!(
        "Building tree from {} entries across {} revisions",
        entries.len(),
        revisions
    );

    let mut tree = EntityTree::new(root_name, revisions);

    // Map from normalized id → EntityId for parent lookups
    let mut id_map: HashMap<CompactString, EntityId> = HashMap::new();

    for entry in entries {
        if entry.revision >= revisions {
            tracing::warn!(
                "Entry '{}' references revision {} but only {} exist, skipping",
                entry.id,
                entry.revision,
                revisions
            );
            continue;
        }

        let Some(id) = ensure_node(&mut tree, &mut id_map, &entry.id) else {
            tracing::warn!("Skipping entry with empty id in revision {}", entry.revision);
            continue;
        };
        tree.get_mut(id).weights[entry.revision] += entry.weight;
    }

    aggregate::aggregate_weights(&mut tree);

    for revision in 0..revisions {
        let total = tree.weight(tree.root, revision);
        if !total.is_finite() {
            bail!(
                "Total weight of revision {} overflows ({}); rescale the input weights",
                revision,
                total
            );
        }
    }

    let root_child_count = tree.children(tree.root).count();
    tracing::info!(
        "Tree built: {} total nodes, {} direct children of root",
        tree.len(),
        root_child_count
    );

    tracing::debug!("First 10 direct children of root:");
    for (i, child_id) in tree.children(tree.root).take(10).enumerate() {
        let child = tree.get(child_id);
        tracing::debug!("  [{}] '{}' (weight@0={:.2})", i, child.id, tree.weight(child_id, 0));
    }

    Ok(tree)
}

/// Ensure a node exists for the given id, creating intermediate nodes as needed.
/// Iterates over components instead of recursing to avoid stack overflow on deep paths.
fn ensure_node(
    tree: &mut EntityTree,
    id_map: &mut HashMap<CompactString, EntityId>,
    id: &str,
) -> Option<EntityId> {
    let mut current = tree.root;
    let mut prefix = CompactString::new("");
    let revisions = tree.number_of_revisions();

    for component in components(id) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(component);

        current = match id_map.get(&prefix) {
            Some(&existing) => existing,
            None => {
                let node = EntityNode::new(component, &prefix, revisions);
                let created = tree.add_child(current, node);
                id_map.insert(prefix.clone(), created);
                created
            }
        };
    }

    // An id made only of separators resolves back to the root
    if current == tree.root {
        None
    } else {
        Some(current)
    }
}
