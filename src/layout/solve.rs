use super::block::{Block, BlockId, BlockTree, WeightTable};
use super::rect::{finite_or_zero, Rect};

/// Recompute every rectangle of `tree` below its root from `weights`.
/// The root rectangle must already hold the bounding box.
pub fn solve(tree: &mut BlockTree, weights: &WeightTable) {
    let root = tree.root();
    let (blocks, rects) = tree.parts_mut();
    solve_into(blocks, root, weights, rects);
}

/// Solver core over a read-only topology and a separate geometry buffer, so
/// several revisions can be solved side by side against the same tree.
///
/// Uses an explicit stack: row chains can be as long as the entity count.
pub fn solve_into(blocks: &[Block], root: BlockId, weights: &WeightTable, rects: &mut [Rect]) {
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let block = &blocks[id.index()];
        let base = rects[id.index()];
        let central = weights.central_weight(id);

        match (block.right, block.bottom) {
            (Some(right), Some(bottom)) => {
                let bottom_weight = weights.full_weight(bottom);
                let right_weight = weights.full_weight(right);
                let column = central + bottom_weight;

                let width = finite_or_zero(column / (column + right_weight) * base.width);
                let height = finite_or_zero(central / column * base.height);

                rects[id.index()] = Rect::new(base.x, base.y, width, height);
                rects[bottom.index()] = Rect::new(
                    base.x,
                    base.y + height,
                    width,
                    (base.height - height).max(0.0),
                );
                rects[right.index()] = Rect::new(
                    base.x + width,
                    base.y,
                    (base.width - width).max(0.0),
                    base.height,
                );

                stack.push(bottom);
                stack.push(right);
            }
            (Some(right), None) => {
                let right_weight = weights.full_weight(right);
                let width = finite_or_zero(central / (central + right_weight) * base.width);

                rects[id.index()].width = width;
                rects[right.index()] = Rect::new(
                    base.x + width,
                    base.y,
                    (base.width - width).max(0.0),
                    base.height,
                );

                stack.push(right);
            }
            (None, Some(bottom)) => {
                let bottom_weight = weights.full_weight(bottom);
                let height = finite_or_zero(central / (central + bottom_weight) * base.height);

                rects[id.index()].height = height;
                rects[bottom.index()] = Rect::new(
                    base.x,
                    base.y + height,
                    base.width,
                    (base.height - height).max(0.0),
                );

                stack.push(bottom);
            }
            (None, None) => {}
        }

        // Nesting inherits the full footprint
        if let Some(child) = block.central {
            rects[child.index()] = rects[id.index()];
            stack.push(child);
        }
    }
}
