use slotmap::{new_key_type, SlotMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

new_key_type! {
    /// Identifies a component registered with a model. Stable for the
    /// lifetime of the component; never reused for a different component
    /// while the old key is still held.
    ///
    /// Handles handed out by a model are unique across every model in the
    /// process, so a handle from one model is never mistaken for a component
    /// of another.
    pub struct ComponentId;
}

/// Owner of every live model-issued handle.
static OWNERS: LazyLock<Mutex<SlotMap<ComponentId, ModelId>>> =
    LazyLock::new(|| Mutex::new(SlotMap::with_key()));

fn owners() -> MutexGuard<'static, SlotMap<ComponentId, ModelId>> {
    // The map is never left half-updated, so a poisoned lock is still usable.
    OWNERS.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ComponentId {
    /// The model that issued this handle, or `None` once the component has
    /// been removed or its model dropped.
    pub fn owner(self) -> Option<ModelId> {
        owners().get(self).copied()
    }
}

/// A node in the dependency graph: either the synthetic root or a component.
///
/// The root is not a component. Relationship queries never return it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Root,
    Component(ComponentId),
}

impl Node {
    /// The component behind this node, or `None` for the root.
    pub fn component(self) -> Option<ComponentId> {
        match self {
            Node::Root => None,
            Node::Component(id) => Some(id),
        }
    }

    pub fn is_root(self) -> bool {
        matches!(self, Node::Root)
    }
}

impl From<ComponentId> for Node {
    fn from(id: ComponentId) -> Self {
        Node::Component(id)
    }
}

/// Process-unique identity of a model. Each component remembers the model
/// that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    /// Generate a new unique model ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Issue a fresh component handle owned by this model.
    pub(crate) fn issue(self) -> ComponentId {
        owners().insert(self)
    }

    /// Retire a handle issued by this model. Handles owned by another model
    /// are left alone.
    pub(crate) fn retire(self, id: ComponentId) -> bool {
        let mut owners = owners();
        if owners.get(id) == Some(&self) {
            owners.remove(id);
            true
        } else {
            false
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}
