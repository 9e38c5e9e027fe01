use super::rect::Rect;
use crate::tree::arena::{EntityId, EntityTree};

/// Index into the block arena. Uses u32 like `EntityId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of the spatial partition tree.
///
/// ```text
///  ---------
///  | C |   |
///  |---| R |
///  | B |   |
///  ---------
/// ```
///
/// `central` is nested inside this block's footprint; `right` and `bottom`
/// continue the row/column partition beside or below it. A block carrying an
/// entity is a cell of a row; a block without one is a container for the
/// not-yet-placed remainder of its parent's rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub entity: Option<EntityId>,
    pub central: Option<BlockId>,
    pub right: Option<BlockId>,
    pub bottom: Option<BlockId>,
}

/// Frozen partition tree: links are fixed at construction, only rectangles
/// change between revisions. `rects[i]` is the rectangle of `blocks[i]`.
#[derive(Debug, Clone)]
pub struct BlockTree {
    blocks: Vec<Block>,
    rects: Vec<Rect>,
    root: BlockId,
}

impl BlockTree {
    pub fn root(&self) -> BlockId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// The topology, in arena order. Children always follow their parent.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn rect(&self, id: BlockId) -> Rect {
        self.rects[id.index()]
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Split borrow for the solver: read-only topology, writable geometry.
    pub(crate) fn parts_mut(&mut self) -> (&[Block], &mut [Rect]) {
        (&self.blocks, &mut self.rects)
    }

    pub fn set_root_rect(&mut self, rect: Rect) {
        let root = self.root.index();
        self.rects[root] = rect;
    }

    /// Blocks that lay out an entity, in arena order.
    pub fn entity_blocks(&self) -> impl Iterator<Item = (BlockId, EntityId)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.entity.map(|e| (BlockId(i as u32), e)))
    }

    /// An entity block without a nested layout.
    pub fn is_leaf(&self, id: BlockId) -> bool {
        let block = self.block(id);
        block.entity.is_some() && block.central.is_none()
    }

    /// Weight of what this block lays out directly: its entity, or for a
    /// container the whole chain hanging off `central`.
    pub fn central_weight(&self, id: BlockId, entities: &EntityTree, revision: usize) -> f64 {
        let block = self.block(id);
        match (block.entity, block.central) {
            (Some(entity), _) => entities.weight(entity, revision),
            (None, Some(central)) => self.full_weight(central, entities, revision),
            (None, None) => 0.0,
        }
    }

    /// Aggregate weight of the subtree rooted at `id` (central + right + bottom).
    /// Nested layouts under an entity block are not counted twice.
    pub fn full_weight(&self, id: BlockId, entities: &EntityTree, revision: usize) -> f64 {
        let mut total = 0.0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let block = self.block(current);
            match (block.entity, block.central) {
                (Some(entity), _) => total += entities.weight(entity, revision),
                (None, Some(central)) => stack.push(central),
                (None, None) => {}
            }
            stack.extend(block.right);
            stack.extend(block.bottom);
        }
        total
    }

    /// Entity block with the most stretched non-empty rectangle.
    pub fn worst_aspect_ratio_block(&self) -> Option<BlockId> {
        self.entity_blocks()
            .map(|(id, _)| (id, self.rect(id)))
            .filter(|(_, r)| r.area() > 0.0)
            .max_by(|a, b| a.1.aspect_ratio().total_cmp(&b.1.aspect_ratio()))
            .map(|(id, _)| id)
    }
}

/// Mutable construction phase of a `BlockTree`. Links can only be set here;
/// `finish` freezes the topology.
#[derive(Debug, Default)]
pub struct BlockTreeBuilder {
    blocks: Vec<Block>,
    rects: Vec<Rect>,
}

impl BlockTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks added so far.
    pub(crate) fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Append an unlinked block with its initial rectangle.
    pub fn add(&mut self, entity: Option<EntityId>, rect: Rect) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            entity,
            central: None,
            right: None,
            bottom: None,
        });
        self.rects.push(rect);
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn rect(&self, id: BlockId) -> Rect {
        self.rects[id.index()]
    }

    pub fn set_central(&mut self, parent: BlockId, child: BlockId) {
        Self::check_link(parent, child, self.blocks[parent.index()].central);
        self.blocks[parent.index()].central = Some(child);
    }

    pub fn set_right(&mut self, parent: BlockId, child: BlockId) {
        Self::check_link(parent, child, self.blocks[parent.index()].right);
        self.blocks[parent.index()].right = Some(child);
    }

    pub fn set_bottom(&mut self, parent: BlockId, child: BlockId) {
        Self::check_link(parent, child, self.blocks[parent.index()].bottom);
        self.blocks[parent.index()].bottom = Some(child);
    }

    // Weight aggregation sweeps the arena backwards, so children must come after parents.
    fn check_link(parent: BlockId, child: BlockId, existing: Option<BlockId>) {
        debug_assert!(child > parent, "block {:?} linked to earlier block {:?}", parent, child);
        debug_assert!(existing.is_none(), "block {:?} relinked", parent);
    }

    pub fn finish(self, root: BlockId) -> BlockTree {
        BlockTree {
            blocks: self.blocks,
            rects: self.rects,
            root,
        }
    }
}

/// Per-revision memo of `central_weight` / `full_weight` for every block.
/// One backward sweep over the arena, O(n) per revision.
#[derive(Debug, Clone)]
pub struct WeightTable {
    central: Vec<f64>,
    full: Vec<f64>,
}

impl WeightTable {
    pub fn compute(tree: &BlockTree, entities: &EntityTree, revision: usize) -> Self {
        let n = tree.len();
        let mut central = vec![0.0; n];
        let mut full = vec![0.0; n];

        for i in (0..n).rev() {
            let block = &tree.blocks[i];
            let c = match (block.entity, block.central) {
                (Some(entity), _) => entities.weight(entity, revision),
                (None, Some(child)) => full[child.index()],
                (None, None) => 0.0,
            };
            central[i] = c;
            full[i] = c
                + block.right.map_or(0.0, |r| full[r.index()])
                + block.bottom.map_or(0.0, |b| full[b.index()]);
        }

        Self { central, full }
    }

    pub fn central_weight(&self, id: BlockId) -> f64 {
        self.central[id.index()]
    }

    pub fn full_weight(&self, id: BlockId) -> f64 {
        self.full[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::arena::EntityNode;

    /// root container: central = a → b (bottom chain), right = empty container
    fn sample() -> (EntityTree, BlockTree) {
        let mut entities = EntityTree::new("root", 2);
        let mut a = EntityNode::new("a", "a", 2);
        a.weights = vec![3.0, 1.0];
        let mut b = EntityNode::new("b", "b", 2);
        b.weights = vec![1.0, 0.0];
        let a = entities.add_child(entities.root, a);
        let b = entities.add_child(entities.root, b);

        let mut builder = BlockTreeBuilder::new();
        let root = builder.add(None, Rect::sized(10.0, 10.0));
        let ba = builder.add(Some(a), Rect::default());
        let bb = builder.add(Some(b), Rect::default());
        let tail = builder.add(None, Rect::default());
        builder.set_central(root, ba);
        builder.set_bottom(ba, bb);
        builder.set_right(root, tail);
        (entities, builder.finish(root))
    }

    #[test]
    fn weight_queries_follow_chains() {
        let (entities, tree) = sample();
        let root = tree.root();
        assert_eq!(tree.central_weight(root, &entities, 0), 4.0);
        assert_eq!(tree.full_weight(root, &entities, 0), 4.0);
        assert_eq!(tree.central_weight(BlockId(1), &entities, 0), 3.0);
        assert_eq!(tree.full_weight(BlockId(1), &entities, 0), 4.0);
        assert_eq!(tree.full_weight(BlockId(3), &entities, 0), 0.0);
        assert_eq!(tree.full_weight(root, &entities, 1), 1.0);
    }

    #[test]
    fn memoized_weights_match_direct_queries() {
        let (entities, tree) = sample();
        for revision in 0..2 {
            let table = WeightTable::compute(&tree, &entities, revision);
            for i in 0..tree.len() {
                let id = BlockId(i as u32);
                assert!((table.central_weight(id) - tree.central_weight(id, &entities, revision)).abs() < 1e-12);
                assert!((table.full_weight(id) - tree.full_weight(id, &entities, revision)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn leaves_and_entity_blocks() {
        let (_, tree) = sample();
        let entity_blocks: Vec<_> = tree.entity_blocks().map(|(id, _)| id).collect();
        assert_eq!(entity_blocks, vec![BlockId(1), BlockId(2)]);
        assert!(tree.is_leaf(BlockId(1)));
        assert!(!tree.is_leaf(tree.root()));
        assert!(!tree.is_leaf(BlockId(3)));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn relinking_is_rejected() {
        let mut builder = BlockTreeBuilder::new();
        let root = builder.add(None, Rect::default());
        let a = builder.add(None, Rect::default());
        let b = builder.add(None, Rect::default());
        builder.set_right(root, a);
        builder.set_right(root, b);
    }
}
