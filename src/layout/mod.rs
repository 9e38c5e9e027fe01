pub mod block;
pub mod rect;
pub mod solve;
pub mod squarify;

pub use block::{Block, BlockId, BlockTree, BlockTreeBuilder, WeightTable};
pub use rect::Rect;

use crate::tree::arena::{EntityId, EntityTree};

/// Configuration for treemap construction.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Pack each entity's children inside its own block instead of laying out
    /// only the root's direct children.
    pub nested: bool,
    /// Maximum entity depth that still gets a nested layout (safety + performance)
    pub max_depth: u16,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            nested: false,
            max_depth: 64,
        }
    }
}

/// Build the frozen partition tree for `entities` inside `base`, from
/// revision-0 weights. This is the only place the topology is decided.
pub fn build_block_tree(entities: &EntityTree, base: Rect, config: &LayoutConfig) -> BlockTree {
    let mut builder = BlockTreeBuilder::new();
    let children: Vec<EntityId> = entities.children(entities.root).collect();
    let root = squarify::pack(entities, &children, base, &mut builder);

    tracing::info!(
        "Packed {} children of root '{}' (weight@0={:.2}) into {:.0}x{:.0}",
        children.len(),
        entities.get(entities.root).id,
        entities.weight(entities.root, 0),
        base.width,
        base.height
    );

    if config.nested {
        // Blocks are appended as we go, so this walks every level breadth-first.
        let mut cursor = 0;
        while cursor < builder.len() {
            let id = BlockId(cursor as u32);
            cursor += 1;

            let Some(entity) = builder.block(id).entity else {
                continue;
            };
            if entities.get(entity).depth >= config.max_depth {
                continue;
            }
            let nested: Vec<EntityId> = entities
                .children(entity)
                .filter(|&child| entities.weight(child, 0) > 0.0)
                .collect();
            if nested.is_empty() {
                continue;
            }

            let nested_root = squarify::pack(entities, &nested, builder.rect(id), &mut builder);
            builder.set_central(id, nested_root);
        }
    }

    let tree = builder.finish(root);
    tracing::info!(
        "Block tree built: {} blocks, {} entity blocks",
        tree.len(),
        tree.entity_blocks().count()
    );
    tree
}
