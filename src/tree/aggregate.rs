use super::arena::EntityTree;

/// Fold every node's per-revision weights into its parent (bottom-up).
/// After this, each parent's weight equals its own input value plus the sum of
/// all descendant weights, for every revision.
pub fn aggregate_weights(tree: &mut EntityTree) {
    // Process nodes in reverse order (children before parents) since
    // children always have higher indices than their parents in our arena.
    // This is guaranteed by the add_child insertion order.
    let len = tree.nodes.len();
    for i in (1..len).rev() {
        let Some(parent) = tree.nodes[i].parent else {
            continue;
        };
        let (head, tail) = tree.nodes.split_at_mut(i);
        let child = &tail[0];
        let parent_node = &mut head[parent.index()];
        for (total, w) in parent_node.weights.iter_mut().zip(&child.weights) {
            *total += *w;
        }
    }
}
