//! Handle-based storage for scene nodes

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node stored in a [`NodeArena`]
    ///
    /// Keys are generational: a key to a disposed node never resolves to a
    /// node created later in the same slot.
    pub struct NodeKey;
}

/// Arena owning every node of one scene graph
pub type NodeArena<T> = SlotMap<NodeKey, T>;
