//! Hierarchical scene graph
//!
//! Nodes live in a slotmap arena owned by [`SceneGraph`]. Parents own their
//! children through `children` key lists; the `parent` key is a
//! back-reference used for upward bounds invalidation and for composing
//! world matrices. An id registry gives O(1) lookup for every node reachable
//! from the root, and only for those.
//!
//! ## Dirty flags
//!
//! - transform edits set `transform_dirty` on the node and
//!   `world_matrix_dirty` + `bounds_dirty` on the whole subtree
//! - any transform, visibility or topology change walks `bounds_dirty` up
//!   to the root
//! - everything is recomputed lazily by [`SceneGraph::update_world_matrix`]
//!   and [`SceneGraph::world_bounds`], which `update` and `cull` call

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::{Config, SceneGraphConfig};
use crate::foundation::collections::{NodeArena, NodeKey};
use crate::foundation::math::{Mat4Ext, Quat, Vec3};
use crate::scene::animation::{Animation, AnimationTarget, KeyframeValue, TransformProperty};
use crate::scene::bounds::Bounds;
use crate::scene::culling::{AlwaysVisible, CullingResult, CullingStatistics, OcclusionQuery};
use crate::scene::error::SceneError;
use crate::scene::lod::Lod;
use crate::scene::node::{NodeType, SceneNode, UniformValue};
use crate::scene::transform::Transform;

/// Id of the root node every graph starts with
pub const ROOT_ID: &str = "root";

/// Scene graph: node arena, id registry and per-frame state
///
/// Arena slots are freed only by [`dispose_node`](Self::dispose_node) and
/// [`clear`](Self::clear). Nodes that are detached with
/// [`remove_node`](Self::remove_node) or never attached keep their slot for
/// the lifetime of the graph until disposed.
pub struct SceneGraph {
    pub(crate) nodes: NodeArena<SceneNode>,
    pub(crate) registry: HashMap<String, NodeKey>,
    pub(crate) root: NodeKey,
    pub(crate) frame_count: u64,
    pub(crate) last_result: Option<CullingResult>,
    pub(crate) config: SceneGraphConfig,
    pub(crate) occlusion: Box<dyn OcclusionQuery>,
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("registered", &self.registry.len())
            .field("frame_count", &self.frame_count)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a scene graph with default configuration
    pub fn new() -> Self {
        Self::with_config(SceneGraphConfig::default())
    }

    /// Create a scene graph with custom configuration
    pub fn with_config(config: SceneGraphConfig) -> Self {
        let mut nodes = NodeArena::with_key();
        let root = nodes.insert(SceneNode::new(ROOT_ID, "Root", NodeType::Group));
        let mut registry = HashMap::new();
        registry.insert(ROOT_ID.to_string(), root);

        log::info!("Scene graph created ({:?})", config);

        Self {
            nodes,
            registry,
            root,
            frame_count: 0,
            last_result: None,
            config,
            occlusion: Box::new(AlwaysVisible),
        }
    }

    /// Create a scene graph with configuration read from a `.toml` or `.ron` file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let config = SceneGraphConfig::load_from_file(path)?;
        Ok(Self::with_config(config))
    }

    /// Current configuration
    pub fn config(&self) -> &SceneGraphConfig {
        &self.config
    }

    /// Mutable configuration; takes effect on the next `cull`
    pub fn config_mut(&mut self) -> &mut SceneGraphConfig {
        &mut self.config
    }

    /// Replace the occlusion query consulted when occlusion culling is on
    pub fn set_occlusion_query(&mut self, query: Box<dyn OcclusionQuery>) {
        self.occlusion = query;
    }

    /// Root node key
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of `update` calls so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Result of the most recent successful `cull`
    pub fn last_result(&self) -> Option<&CullingResult> {
        self.last_result.as_ref()
    }

    /// Statistics of the most recent successful `cull`
    pub fn statistics(&self) -> Option<&CullingStatistics> {
        self.last_result.as_ref().map(|result| &result.statistics)
    }

    /// Number of nodes reachable from the root (root included)
    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    // ------------------------------------------------------------------
    // Node creation and lookup
    // ------------------------------------------------------------------

    /// Create a detached node; attach it with [`add_node`](Self::add_node) or
    /// [`add_child`](Self::add_child)
    pub fn create_node(&mut self, id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> NodeKey {
        self.insert_node(SceneNode::new(id, name, node_type))
    }

    /// Move a prepared node into the arena, detached
    pub fn insert_node(&mut self, mut node: SceneNode) -> NodeKey {
        node.parent = None;
        node.children.clear();
        node.transform.mark_dirty();
        node.bounds_dirty = true;
        self.nodes.insert(node)
    }

    /// Key registered for `id`
    pub fn node_key(&self, id: &str) -> Option<NodeKey> {
        self.registry.get(id).copied()
    }

    /// Node registered for `id`
    pub fn get_node(&self, id: &str) -> Option<&SceneNode> {
        self.node_key(id).and_then(|key| self.nodes.get(key))
    }

    /// Mutable node registered for `id`
    ///
    /// Writes to `transform`, `render_state.visible` or bounds through this
    /// reference skip dirty propagation; prefer the graph setters.
    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut SceneNode> {
        let key = self.node_key(id)?;
        self.nodes.get_mut(key)
    }

    /// Node by key, attached or not
    pub fn node(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Mutable node by key; see [`get_node_mut`](Self::get_node_mut)
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Child of `parent` at `index`
    pub fn child(&self, parent: NodeKey, index: usize) -> Option<NodeKey> {
        self.nodes.get(parent)?.children.get(index).copied()
    }

    /// First direct child of `parent` with display name `name`
    pub fn child_by_name(&self, parent: NodeKey, name: &str) -> Option<NodeKey> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|child| self.nodes.get(*child).is_some_and(|node| node.name == name))
    }

    /// Whether `ancestor` is a strict ancestor of `key`
    pub fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = self.nodes.get(key).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes.get(parent).and_then(|node| node.parent);
        }
        false
    }

    /// Whether `key` is reachable from the root
    pub fn is_attached(&self, key: NodeKey) -> bool {
        key == self.root || self.is_ancestor(self.root, key)
    }

    /// Every node below `key`, depth-first pre-order, `key` excluded
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = match self.nodes.get(key) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Visit `key` and its subtree depth-first pre-order
    pub fn traverse<F: FnMut(NodeKey, &SceneNode)>(&self, key: NodeKey, mut visit: F) {
        if let Some(node) = self.nodes.get(key) {
            visit(key, node);
        }
        for descendant in self.descendants(key) {
            if let Some(node) = self.nodes.get(descendant) {
                visit(descendant, node);
            }
        }
    }

    // ------------------------------------------------------------------
    // Hierarchy edits
    // ------------------------------------------------------------------

    /// Attach a node under the node registered as `parent_id` (root when `None`)
    ///
    /// A node that already has a parent is moved.
    pub fn add_node(&mut self, key: NodeKey, parent_id: Option<&str>) -> Result<(), SceneError> {
        let parent = match parent_id {
            Some(id) => self
                .node_key(id)
                .ok_or_else(|| SceneError::ParentNotFound(id.to_string()))?,
            None => self.root,
        };
        self.attach(parent, key)
    }

    /// Detach the node registered as `id` from the tree
    ///
    /// The subtree is unregistered but stays in the arena so it can be
    /// re-added. It is not freed until [`dispose_node`](Self::dispose_node)
    /// is called on it, so hosts that drop a removed node for good must
    /// dispose it. Returns `false` for unknown ids and for the root.
    pub fn remove_node(&mut self, id: &str) -> bool {
        match self.node_key(id) {
            Some(key) if key != self.root => self.detach(key),
            _ => false,
        }
    }

    /// Attach `child` under `parent`; `false` if rejected
    ///
    /// Rejected when either key is stale, when `child` is `parent` or one of
    /// its ancestors, or when attaching would register a duplicate id.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        match self.attach(parent, child) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("add_child rejected: {}", err);
                false
            }
        }
    }

    /// Detach `child` if `parent` is its parent
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        match self.nodes.get(child) {
            Some(node) if node.parent == Some(parent) => self.detach(child),
            _ => false,
        }
    }

    fn attach(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        let parent_id = match self.nodes.get(parent) {
            Some(node) => node.id.clone(),
            None => return Err(SceneError::NodeNotFound(format!("{:?}", parent))),
        };
        let child_id = match self.nodes.get(child) {
            Some(node) => node.id.clone(),
            None => return Err(SceneError::NodeNotFound(format!("{:?}", child))),
        };
        if child == self.root || child == parent || self.is_ancestor(child, parent) {
            return Err(SceneError::CycleDetected { child: child_id, parent: parent_id });
        }

        self.check_unique_ids(parent, child)?;

        if self.nodes[child].parent.is_some() {
            self.detach(child);
        }

        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.mark_subtree_dirty(child);
        self.invalidate_bounds(parent);

        if self.is_attached(parent) {
            self.register_subtree(child);
        }
        log::trace!("Attached '{}' under '{}'", child_id, parent_id);
        Ok(())
    }

    /// Ids of the moved subtree must be unique among themselves and within
    /// the tree `parent` belongs to, attached or not
    fn check_unique_ids(&self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        let mut moved = vec![child];
        moved.extend(self.descendants(child));

        let mut top = parent;
        while let Some(up) = self.nodes.get(top).and_then(|node| node.parent) {
            top = up;
        }

        let mut taken: HashSet<&str> = HashSet::new();
        if top != self.root {
            // Detached destination: the registry does not cover it
            let mut destination = vec![top];
            destination.extend(self.descendants(top));
            taken.extend(
                destination
                    .into_iter()
                    .filter(|key| !moved.contains(key))
                    .map(|key| self.nodes[key].id.as_str()),
            );
        }

        let mut seen = HashSet::with_capacity(moved.len());
        for &key in &moved {
            let id = self.nodes[key].id.as_str();
            let registered_elsewhere =
                top == self.root && self.registry.get(id).is_some_and(|existing| *existing != key);
            if !seen.insert(id) || taken.contains(id) || registered_elsewhere {
                return Err(SceneError::DuplicateId(id.to_string()));
            }
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeKey) -> bool {
        let Some(parent) = self.nodes.get(child).and_then(|node| node.parent) else {
            return false;
        };
        let was_attached = self.is_attached(child);

        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|key| *key != child);
        }
        self.nodes[child].parent = None;
        if was_attached {
            self.unregister_subtree(child);
        }
        self.invalidate_bounds(parent);
        self.mark_subtree_dirty(child);

        log::trace!("Detached '{}'", self.nodes[child].id);
        true
    }

    fn register_subtree(&mut self, key: NodeKey) {
        let mut subtree = vec![key];
        subtree.extend(self.descendants(key));
        for key in subtree {
            let id = self.nodes[key].id.clone();
            self.registry.insert(id, key);
        }
    }

    fn unregister_subtree(&mut self, key: NodeKey) {
        let mut subtree = vec![key];
        subtree.extend(self.descendants(key));
        for key in subtree {
            let id = &self.nodes[key].id;
            if self.registry.get(id) == Some(&key) {
                self.registry.remove(id);
            }
        }
    }

    /// Detach, recursively dispose children, clear and free a node
    ///
    /// Returns the emptied node (no parent, children, animations or
    /// uniforms). Disposing a stale key returns `None`; the root cannot be
    /// disposed.
    pub fn dispose_node(&mut self, key: NodeKey) -> Option<SceneNode> {
        if key == self.root {
            log::warn!("Refusing to dispose the root node");
            return None;
        }
        if !self.nodes.contains_key(key) {
            return None;
        }

        self.detach(key);
        self.unregister_subtree(key);
        for descendant in self.descendants(key) {
            if let Some(mut node) = self.nodes.remove(descendant) {
                node.clear();
            }
        }

        let mut node = self.nodes.remove(key)?;
        node.clear();
        log::trace!("Disposed '{}'", node.id);
        Some(node)
    }

    /// Dispose every node below the root
    pub fn clear(&mut self) {
        let children = self.nodes[self.root].children.clone();
        for child in children {
            self.dispose_node(child);
        }
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    fn modify_transform<F: FnOnce(&mut Transform) -> bool>(&mut self, key: NodeKey, edit: F) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        if !edit(&mut node.transform) {
            return false;
        }
        self.mark_subtree_dirty(key);
        self.invalidate_bounds(key);
        true
    }

    /// Set local position
    pub fn set_position(&mut self, key: NodeKey, position: Vec3) -> bool {
        self.modify_transform(key, |t| {
            t.set_position(position);
            true
        })
    }

    /// Set local rotation
    pub fn set_rotation(&mut self, key: NodeKey, rotation: Quat) -> bool {
        self.modify_transform(key, |t| {
            t.set_rotation(rotation);
            true
        })
    }

    /// Set local scale
    pub fn set_scale(&mut self, key: NodeKey, scale: Vec3) -> bool {
        self.modify_transform(key, |t| {
            t.set_scale(scale);
            true
        })
    }

    /// Offset local position
    pub fn translate(&mut self, key: NodeKey, offset: Vec3) -> bool {
        self.modify_transform(key, |t| {
            t.translate(offset);
            true
        })
    }

    /// Rotate about local axes
    pub fn rotate(&mut self, key: NodeKey, rotation: Quat) -> bool {
        self.modify_transform(key, |t| {
            t.rotate(rotation);
            true
        })
    }

    /// Point the node's -Z axis at `target` (parent space)
    pub fn look_at(&mut self, key: NodeKey, target: Vec3, up: Vec3) -> bool {
        self.modify_transform(key, |t| t.look_at(target, up))
    }

    fn mark_subtree_dirty(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.world_matrix_dirty = true;
            node.bounds_dirty = true;
        }
        for descendant in self.descendants(key) {
            let node = &mut self.nodes[descendant];
            node.transform.world_matrix_dirty = true;
            node.bounds_dirty = true;
        }
    }

    /// Recompute the local matrix if dirty
    pub fn update_transform(&mut self, key: NodeKey) {
        let recomputed = self
            .nodes
            .get_mut(key)
            .is_some_and(|node| node.transform.update_local());
        if recomputed {
            self.invalidate_bounds(key);
        }
    }

    /// Bring the world matrix of `key` up to date
    ///
    /// Dirty ancestors are refreshed first (top-down). Every node whose world
    /// matrix is recomputed marks its direct children's world matrices dirty.
    pub fn update_world_matrix(&mut self, key: NodeKey) {
        // A dirty ancestor always has a dirty subtree, so a clean node has
        // nothing to pull from above
        match self.nodes.get(key) {
            Some(node) if node.transform.world_matrix_dirty || node.transform.transform_dirty => {}
            _ => return,
        }

        let mut chain = vec![key];
        let mut current = key;
        while let Some(parent) = self.nodes.get(current).and_then(|node| node.parent) {
            chain.push(parent);
            current = parent;
        }

        let mut parent_world = None;
        for key in chain.into_iter().rev() {
            self.update_transform(key);
            let Some(node) = self.nodes.get_mut(key) else {
                return;
            };
            if node.transform.world_matrix_dirty {
                node.transform.world_matrix = match parent_world {
                    Some(parent) => parent * node.transform.local_matrix,
                    None => node.transform.local_matrix,
                };
                node.transform.world_matrix_dirty = false;
                for child in node.children.clone() {
                    self.nodes[child].transform.world_matrix_dirty = true;
                }
            }
            parent_world = Some(self.nodes[key].transform.world_matrix);
        }
    }

    /// World-space position of a node's origin
    pub fn world_position(&mut self, key: NodeKey) -> Option<Vec3> {
        self.update_world_matrix(key);
        self.nodes.get(key).map(|node| node.transform.world_matrix.translation_part())
    }

    // ------------------------------------------------------------------
    // Bounds
    // ------------------------------------------------------------------

    /// Mark `key` and every ancestor's bounds dirty
    pub fn invalidate_bounds(&mut self, key: NodeKey) {
        let mut current = Some(key);
        while let Some(key) = current {
            match self.nodes.get_mut(key) {
                Some(node) => {
                    node.bounds_dirty = true;
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    /// Override a node's local geometry bounds (default: unit box)
    pub fn set_local_bounds(&mut self, key: NodeKey, bounds: Bounds) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        node.local_bounds = bounds;
        node.custom_bounds = true;
        self.invalidate_bounds(key);
        true
    }

    /// World-space bounds of a node, refreshing stale caches below it
    ///
    /// Leaves (and nodes with geometry) contribute their local bounds
    /// transformed by their world matrix; interior nodes add the union of
    /// their visible children. If nothing contributes, the previous bounds
    /// are kept.
    pub fn world_bounds(&mut self, key: NodeKey) -> Option<Bounds> {
        self.update_world_matrix(key);
        let node = self.nodes.get(key)?;
        if !node.bounds_dirty {
            return Some(node.world_bounds);
        }

        let own_geometry = node.is_leaf() || node.custom_bounds || node.node_type.has_geometry();
        let mut aggregate = own_geometry.then(|| node.local_bounds.transformed(&node.transform.world_matrix));

        for child in node.children.clone() {
            if !self.nodes[child].render_state.visible {
                continue;
            }
            if let Some(child_bounds) = self.world_bounds(child) {
                aggregate = Some(match aggregate {
                    Some(bounds) => bounds.union(&child_bounds),
                    None => child_bounds,
                });
            }
        }

        let node = self.nodes.get_mut(key)?;
        if let Some(bounds) = aggregate {
            node.world_bounds = bounds;
        }
        node.bounds_dirty = false;
        Some(node.world_bounds)
    }

    // ------------------------------------------------------------------
    // Render state, LOD, animation
    // ------------------------------------------------------------------

    /// Show or hide a node (and so its subtree)
    pub fn set_visible(&mut self, key: NodeKey, visible: bool) -> bool {
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        if node.render_state.visible != visible {
            node.render_state.visible = visible;
            self.invalidate_bounds(key);
        }
        true
    }

    /// Attach or replace a node's LOD descriptor
    pub fn set_lod(&mut self, key: NodeKey, lod: Lod) -> bool {
        self.nodes.get_mut(key).map(|node| node.lod = Some(lod)).is_some()
    }

    /// Set one material uniform
    pub fn set_uniform(&mut self, key: NodeKey, name: impl Into<String>, value: UniformValue) -> bool {
        self.nodes
            .get_mut(key)
            .map(|node| node.render_state.uniforms.insert(name.into(), value))
            .is_some()
    }

    /// Append an animation to a node
    pub fn add_animation(&mut self, key: NodeKey, animation: Animation) -> bool {
        self.nodes.get_mut(key).map(|node| node.animations.push(animation)).is_some()
    }

    /// Restart the named animation; `false` if node or animation is unknown
    pub fn play_animation(&mut self, key: NodeKey, name: &str) -> bool {
        self.nodes
            .get_mut(key)
            .and_then(|node| node.animation_mut(name))
            .map(Animation::play)
            .is_some()
    }

    /// Stop the named animation, keeping its time
    pub fn stop_animation(&mut self, key: NodeKey, name: &str) -> bool {
        self.nodes
            .get_mut(key)
            .and_then(|node| node.animation_mut(name))
            .map(Animation::stop)
            .is_some()
    }

    fn apply_animation_value(&mut self, key: NodeKey, target: &AnimationTarget, value: KeyframeValue) {
        match (target, value) {
            (AnimationTarget::Transform(TransformProperty::Position), KeyframeValue::Vector(v)) => {
                self.set_position(key, v);
            }
            (AnimationTarget::Transform(TransformProperty::Rotation), KeyframeValue::Rotation(q)) => {
                self.set_rotation(key, q);
            }
            (AnimationTarget::Transform(TransformProperty::Scale), KeyframeValue::Vector(v)) => {
                self.set_scale(key, v);
            }
            (AnimationTarget::Transform(TransformProperty::Scale), KeyframeValue::Scalar(s)) => {
                self.set_scale(key, Vec3::new(s, s, s));
            }
            (AnimationTarget::Material { uniform }, value) => {
                let uniform_value = match value {
                    KeyframeValue::Scalar(v) => UniformValue::Float(v),
                    KeyframeValue::Vector(v) => UniformValue::Vec3(v),
                    KeyframeValue::Rotation(q) => UniformValue::Vec4(q.into_inner().coords),
                    KeyframeValue::Flag(b) => UniformValue::Bool(b),
                };
                self.set_uniform(key, uniform.clone(), uniform_value);
            }
            (AnimationTarget::Visibility, KeyframeValue::Flag(visible)) => {
                self.set_visible(key, visible);
            }
            (target, value) => {
                log::trace!("Animation value {:?} does not fit target {:?}", value, target);
            }
        }
    }

    /// Advance one frame: play animations, then refresh dirty matrices and bounds
    pub fn update(&mut self, delta_time: f32) {
        self.frame_count += 1;

        let mut order = vec![self.root];
        order.extend(self.descendants(self.root));

        for &key in &order {
            let mut writes = Vec::new();
            if let Some(node) = self.nodes.get_mut(key) {
                for animation in &mut node.animations {
                    if animation.advance(delta_time) {
                        if let Some(value) = animation.sample() {
                            writes.push((animation.target.clone(), value));
                        }
                    }
                }
            }
            for (target, value) in writes {
                self.apply_animation_value(key, &target, value);
            }
        }

        // Pre-order: parents are clean before their children are visited
        for &key in &order {
            self.update_world_matrix(key);
        }
        self.world_bounds(self.root);
    }
}
