//! Parent/child relationships between components.
//!
//! Relationships are not stored on components. They are read from and
//! written to the [`DependencyGraph`], either through the free functions
//! [`parents_of`] and [`children_of`] or through a [`RelationView`] bound
//! to one component and one direction.

use crate::graph::{DependencyGraph, GraphError};
use crate::id::{ComponentId, Node};

/// Which side of a component a view looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Components with an edge into the owner (root excluded).
    Parents,
    /// Components the owner has an edge into.
    Children,
}

/// Fresh list of the component parents of `id`.
pub fn parents_of(graph: &DependencyGraph, id: ComponentId) -> Result<Vec<ComponentId>, GraphError> {
    graph.parents(id).map(|ids| ids.to_vec())
}

/// Fresh list of the children of `id`.
pub fn children_of(graph: &DependencyGraph, id: ComponentId) -> Result<Vec<ComponentId>, GraphError> {
    graph.children(id).map(|ids| ids.to_vec())
}

/// A view over one component's parents or children.
///
/// Holds no state beyond the owner and direction; every read goes to the
/// graph, so mutations made through the opposite view or directly on the
/// graph are visible immediately.
#[derive(Debug)]
pub struct RelationView<'g> {
    graph: &'g mut DependencyGraph,
    owner: ComponentId,
    direction: Direction,
}

impl<'g> RelationView<'g> {
    pub fn new(graph: &'g mut DependencyGraph, owner: ComponentId, direction: Direction) -> Self {
        Self {
            graph,
            owner,
            direction,
        }
    }

    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Orient an edge between the owner and `other` for this view.
    fn edge(&self, other: ComponentId) -> (Node, Node) {
        let owner = Node::Component(self.owner);
        let other = Node::Component(other);
        match self.direction {
            Direction::Children => (owner, other),
            Direction::Parents => (other, owner),
        }
    }

    /// Add `item` to this relationship. The root is not a component and is
    /// ignored.
    pub fn add(&mut self, item: impl Into<Node>) -> Result<(), GraphError> {
        let Some(other) = item.into().component() else {
            return Ok(());
        };
        let (from, to) = self.edge(other);
        self.graph.add_edge(from, to)
    }

    /// Remove `item` from this relationship. Absent members and the root are
    /// ignored.
    pub fn remove(&mut self, item: impl Into<Node>) -> Result<(), GraphError> {
        let Some(other) = item.into().component() else {
            return Ok(());
        };
        let (from, to) = self.edge(other);
        self.graph.remove_edge(from, to).map(|_| ())
    }

    /// Remove every member. The owner stays registered and keeps its root
    /// edge.
    pub fn clear(&mut self) -> Result<(), GraphError> {
        for other in self.members()? {
            let (from, to) = self.edge(other);
            self.graph.remove_edge(from, to)?;
        }
        Ok(())
    }

    /// Current members, read from the graph.
    pub fn members(&self) -> Result<Vec<ComponentId>, GraphError> {
        match self.direction {
            Direction::Parents => parents_of(&*self.graph, self.owner),
            Direction::Children => children_of(&*self.graph, self.owner),
        }
    }

    pub fn contains(&self, item: impl Into<Node>) -> bool {
        match item.into() {
            Node::Root => false,
            Node::Component(other) => {
                let (from, to) = self.edge(other);
                self.graph.has_edge(from, to)
            }
        }
    }

    pub fn len(&self) -> Result<usize, GraphError> {
        let members = match self.direction {
            Direction::Parents => self.graph.parents(self.owner)?,
            Direction::Children => self.graph.children(self.owner)?,
        };
        Ok(members.len())
    }

    pub fn is_empty(&self) -> Result<bool, GraphError> {
        Ok(self.len()? == 0)
    }

    pub fn iter(&self) -> Result<std::vec::IntoIter<ComponentId>, GraphError> {
        Ok(self.members()?.into_iter())
    }
}
