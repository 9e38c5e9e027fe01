use compact_str::CompactString;

/// Index into the arena `Vec<EntityNode>`. Uses u32 to save memory (supports up to ~4 billion nodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single entity in the hierarchy, stored in a flat arena.
/// Uses sibling-list representation: each node has `first_child` and `next_sibling`.
#[derive(Debug, Clone)]
pub struct EntityNode {
    /// Last path component (e.g. "main.rs")
    pub name: CompactString,
    /// Full identifier emitted in rect records (e.g. "src/main.rs")
    pub id: CompactString,
    /// Weight per revision. For leaves: the input value. For parents: own value
    /// plus the sum of children (see `aggregate`).
    pub weights: Vec<f64>,
    /// Parent node index (None for root)
    pub parent: Option<EntityId>,
    /// First child node index (None for leaves)
    pub first_child: Option<EntityId>,
    /// Last child node index, kept so children stay in insertion order
    pub last_child: Option<EntityId>,
    /// Next sibling node index (None if last child)
    pub next_sibling: Option<EntityId>,
    /// Depth in the tree (root = 0)
    pub depth: u16,
}

impl EntityNode {
    pub fn new(name: &str, id: &str, revisions: usize) -> Self {
        EntityNode {
            name: CompactString::new(name),
            id: CompactString::new(id),
            weights: vec![0.0; revisions],
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            depth: 0,
        }
    }
}

/// The entity hierarchy stored as a flat arena of nodes.
#[derive(Debug)]
pub struct EntityTree {
    /// All nodes in contiguous memory
    pub nodes: Vec<EntityNode>,
    /// Root node index
    pub root: EntityId,
    /// Number of revisions every node carries a weight for
    revisions: usize,
}

impl EntityTree {
    /// Create a tree holding only a root node.
    pub fn new(root_name: &str, revisions: usize) -> Self {
        EntityTree {
            nodes: vec![EntityNode::new(root_name, root_name, revisions)],
            root: EntityId(0),
            revisions,
        }
    }

    /// Add a child node under the given parent. Returns the new node's ID.
    /// The weight vector is resized to the tree's revision count.
    pub fn add_child(&mut self, parent: EntityId, mut node: EntityNode) -> EntityId {
        let new_id = EntityId(self.nodes.len() as u32);
        node.parent = Some(parent);
        node.depth = self.nodes[parent.index()].depth + 1;
        node.next_sibling = None;
        node.weights.resize(self.revisions, 0.0);

        // Append to parent's child list (O(1) via last_child)
        match self.nodes[parent.index()].last_child {
            Some(last) => self.nodes[last.index()].next_sibling = Some(new_id),
            None => self.nodes[parent.index()].first_child = Some(new_id),
        }
        self.nodes[parent.index()].last_child = Some(new_id);

        self.nodes.push(node);
        new_id
    }

    /// Get a node by ID.
    pub fn get(&self, id: EntityId) -> &EntityNode {
        &self.nodes[id.index()]
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: EntityId) -> &mut EntityNode {
        &mut self.nodes[id.index()]
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (only root).
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn number_of_revisions(&self) -> usize {
        self.revisions
    }

    /// Weight of `id` at `revision`. Revisions past the end weigh zero.
    pub fn weight(&self, id: EntityId, revision: usize) -> f64 {
        self.nodes[id.index()]
            .weights
            .get(revision)
            .copied()
            .unwrap_or(0.0)
    }

    /// Iterate over children of a node, in insertion order.
    pub fn children(&self, parent: EntityId) -> ChildIter<'_> {
        ChildIter {
            tree: self,
            current: self.nodes[parent.index()].first_child,
        }
    }
}

/// Iterator over the children of a node.
pub struct ChildIter<'a> {
    tree: &'a EntityTree,
    current: Option<EntityId>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let id = self.current?;
        self.current = self.tree.nodes[id.index()].next_sibling;
        Some(id)
    }
}
