use crate::id::{ComponentId, Node};
use slotmap::SecondaryMap;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown node: {0:?}")]
    UnknownNode(Node),
    #[error("self-loop on {0:?}")]
    SelfLoop(Node),
    #[error("edge from {0:?} targets the root node")]
    RootTarget(Node),
    #[error("cycle detected in dependency graph ({} components unordered)", .0.len())]
    CycleDetected(Vec<ComponentId>),
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Adjacency lists for a single component. Both lists keep insertion order,
/// which is what makes the topological tie-break reproducible.
///
/// The root -> component edge is implicit: every registered component has it
/// until it is unregistered.
#[derive(Debug, Clone, Default)]
struct Adjacency {
    /// Components with an edge into this one.
    parents: Vec<ComponentId>,
    /// Components this one has an edge into.
    children: Vec<ComponentId>,
}

/// Directed dependency graph over registered components plus a synthetic
/// root.
///
/// An edge `u -> v` means `u` runs its lifecycle hook before `v`. Parallel
/// edges collapse into one and self-loops are rejected. Every registered
/// component is a successor of the root, so every component is reachable
/// from it.
///
/// The topological order is cached and recomputed lazily after any
/// mutation.
#[derive(Debug)]
pub struct DependencyGraph {
    adjacency: SecondaryMap<ComponentId, Adjacency>,
    /// Successors of the root, in registration order.
    rooted: Vec<ComponentId>,
    /// Number of component -> component edges.
    link_count: usize,

    /// Cached topological order. Recomputed lazily when `dirty` is true.
    topo_cache: Vec<ComponentId>,
    dirty: bool,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    /// Create a graph containing only the root.
    pub fn new() -> Self {
        Self {
            adjacency: SecondaryMap::new(),
            rooted: Vec::new(),
            link_count: 0,
            topo_cache: Vec::new(),
            dirty: true,
        }
    }

    fn invalidate(&mut self) {
        self.dirty = true;
    }

    fn ensure(&self, node: Node) -> Result<(), GraphError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node))
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a component and connect it to the root. Registering an
    /// already registered component does nothing.
    pub fn register(&mut self, id: ComponentId) {
        if self.adjacency.contains_key(id) {
            return;
        }
        self.adjacency.insert(id, Adjacency::default());
        self.rooted.push(id);
        self.invalidate();
        tracing::debug!(component = ?id, "registered component");
    }

    /// Remove a component together with every edge touching it, including
    /// its root edge.
    pub fn unregister(&mut self, id: ComponentId) -> Result<(), GraphError> {
        let adj = self
            .adjacency
            .remove(id)
            .ok_or(GraphError::UnknownNode(Node::Component(id)))?;

        for &parent in &adj.parents {
            if let Some(p) = self.adjacency.get_mut(parent) {
                p.children.retain(|&c| c != id);
            }
        }
        for &child in &adj.children {
            if let Some(c) = self.adjacency.get_mut(child) {
                c.parents.retain(|&p| p != id);
            }
        }
        self.link_count -= adj.parents.len() + adj.children.len();
        self.rooted.retain(|&c| c != id);
        self.invalidate();

        tracing::debug!(
            component = ?id,
            parents = adj.parents.len(),
            children = adj.children.len(),
            "unregistered component"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Insert the edge `from -> to`. Inserting an existing edge is a no-op.
    ///
    /// Root -> component edges always exist for registered components, so
    /// adding one only validates the target.
    pub fn add_edge(&mut self, from: Node, to: Node) -> Result<(), GraphError> {
        self.ensure(from)?;
        self.ensure(to)?;

        let to_id = match to {
            Node::Root => return Err(GraphError::RootTarget(from)),
            Node::Component(id) => id,
        };
        let from_id = match from {
            Node::Root => return Ok(()),
            Node::Component(id) => id,
        };
        if from_id == to_id {
            return Err(GraphError::SelfLoop(from));
        }

        let Some(adj) = self.adjacency.get_mut(from_id) else {
            return Err(GraphError::UnknownNode(from));
        };
        if adj.children.contains(&to_id) {
            return Ok(());
        }
        adj.children.push(to_id);
        if let Some(adj) = self.adjacency.get_mut(to_id) {
            adj.parents.push(from_id);
        }
        self.link_count += 1;
        self.invalidate();

        tracing::trace!(from = ?from_id, to = ?to_id, "added edge");
        Ok(())
    }

    /// Remove the edge `from -> to` if present. Returns whether an edge was
    /// removed.
    ///
    /// Root edges are left alone; only [`unregister`](Self::unregister)
    /// detaches a component from the root.
    pub fn remove_edge(&mut self, from: Node, to: Node) -> Result<bool, GraphError> {
        self.ensure(from)?;
        self.ensure(to)?;

        let (Node::Component(from_id), Node::Component(to_id)) = (from, to) else {
            return Ok(false);
        };
        let removed = match self.adjacency.get_mut(from_id) {
            Some(adj) => {
                let before = adj.children.len();
                adj.children.retain(|&c| c != to_id);
                adj.children.len() != before
            }
            None => false,
        };
        if !removed {
            return Ok(false);
        }
        if let Some(adj) = self.adjacency.get_mut(to_id) {
            adj.parents.retain(|&p| p != from_id);
        }
        self.link_count -= 1;
        self.invalidate();

        tracing::trace!(from = ?from_id, to = ?to_id, "removed edge");
        Ok(true)
    }

    /// Returns true if the edge `from -> to` exists.
    pub fn has_edge(&self, from: Node, to: Node) -> bool {
        match (from, to) {
            (Node::Root, Node::Component(id)) => self.adjacency.contains_key(id),
            (Node::Component(f), Node::Component(t)) => self
                .adjacency
                .get(f)
                .is_some_and(|adj| adj.children.contains(&t)),
            (_, Node::Root) => false,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Direct predecessors of `node`. For a component this always starts
    /// with the root.
    pub fn predecessors(&self, node: Node) -> Result<Vec<Node>, GraphError> {
        match node {
            Node::Root => Ok(Vec::new()),
            Node::Component(id) => {
                let adj = self.adjacency.get(id).ok_or(GraphError::UnknownNode(node))?;
                let mut out = Vec::with_capacity(adj.parents.len() + 1);
                out.push(Node::Root);
                out.extend(adj.parents.iter().copied().map(Node::Component));
                Ok(out)
            }
        }
    }

    /// Direct successors of `node`.
    pub fn successors(&self, node: Node) -> Result<Vec<Node>, GraphError> {
        match node {
            Node::Root => Ok(self.rooted.iter().copied().map(Node::Component).collect()),
            Node::Component(id) => {
                let adj = self.adjacency.get(id).ok_or(GraphError::UnknownNode(node))?;
                Ok(adj.children.iter().copied().map(Node::Component).collect())
            }
        }
    }

    /// Component parents of `id`, root excluded.
    pub fn parents(&self, id: ComponentId) -> Result<&[ComponentId], GraphError> {
        self.adjacency
            .get(id)
            .map(|adj| adj.parents.as_slice())
            .ok_or(GraphError::UnknownNode(Node::Component(id)))
    }

    /// Component children of `id`.
    pub fn children(&self, id: ComponentId) -> Result<&[ComponentId], GraphError> {
        self.adjacency
            .get(id)
            .map(|adj| adj.children.as_slice())
            .ok_or(GraphError::UnknownNode(Node::Component(id)))
    }

    /// Returns true if the node is the root or a registered component.
    pub fn contains(&self, node: Node) -> bool {
        match node {
            Node::Root => true,
            Node::Component(id) => self.adjacency.contains_key(id),
        }
    }

    /// Registered components in registration order.
    pub fn components(&self) -> &[ComponentId] {
        &self.rooted
    }

    /// Number of registered components (the root is not counted).
    pub fn component_count(&self) -> usize {
        self.rooted.len()
    }

    /// Total number of edges, root edges included.
    pub fn edge_count(&self) -> usize {
        self.rooted.len() + self.link_count
    }

    /// Returns true if the cached order is stale.
    pub fn needs_reorder(&self) -> bool {
        self.dirty
    }

    // -----------------------------------------------------------------------
    // Topo cache borrowing helpers
    // -----------------------------------------------------------------------

    /// Temporarily take ownership of the topo cache. The cache Vec is left
    /// empty; call `restore_topo_cache` to put it back.
    pub(crate) fn take_topo_cache(&mut self) -> Vec<ComponentId> {
        std::mem::take(&mut self.topo_cache)
    }

    /// Restore the topo cache after a `take_topo_cache` call.
    pub(crate) fn restore_topo_cache(&mut self, cache: Vec<ComponentId>) {
        self.topo_cache = cache;
    }

    // -----------------------------------------------------------------------
    // Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------

    /// All registered components ordered so that every edge `u -> v` has `u`
    /// before `v`. The root is excluded.
    ///
    /// Ties are broken by registration order for components whose parents
    /// have all been placed, then by edge insertion order as successors are
    /// released. The same mutation history always yields the same order.
    pub fn topological_order(&mut self) -> Result<&[ComponentId], GraphError> {
        if self.dirty {
            self.recompute_topological_order()?;
            self.dirty = false;
        }
        Ok(&self.topo_cache)
    }

    fn recompute_topological_order(&mut self) -> Result<(), GraphError> {
        let count = self.rooted.len();

        // Root edges are satisfied up front, so only component parents count.
        let mut in_degree: SecondaryMap<ComponentId, usize> = SecondaryMap::new();
        for (id, adj) in &self.adjacency {
            in_degree.insert(id, adj.parents.len());
        }

        let mut queue: VecDeque<ComponentId> = self
            .rooted
            .iter()
            .copied()
            .filter(|&id| in_degree.get(id).copied() == Some(0))
            .collect();

        let mut order: Vec<ComponentId> = Vec::with_capacity(count);

        while let Some(id) = queue.pop_front() {
            order.push(id);
            let Some(adj) = self.adjacency.get(id) else {
                continue;
            };
            for &child in &adj.children {
                if let Some(deg) = in_degree.get_mut(child) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if order.len() != count {
            let unordered: Vec<ComponentId> = self
                .rooted
                .iter()
                .copied()
                .filter(|&id| in_degree.get(id).is_some_and(|&deg| deg > 0))
                .collect();
            tracing::warn!(unordered = unordered.len(), "cycle detected in dependency graph");
            return Err(GraphError::CycleDetected(unordered));
        }

        self.topo_cache = order;
        Ok(())
    }
}
