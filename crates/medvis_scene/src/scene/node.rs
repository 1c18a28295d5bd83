//! Scene node: the unit of the hierarchy
//!
//! A node is plain data. Hierarchy links are arena keys owned by the
//! [`SceneGraph`](crate::scene::SceneGraph): `children` is the owning side,
//! `parent` a back-reference used only for upward propagation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::foundation::collections::NodeKey;
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::animation::Animation;
use crate::scene::bounds::Bounds;
use crate::scene::lod::Lod;
use crate::scene::medical::MedicalData;
use crate::scene::render_queue::BatchKey;
use crate::scene::transform::Transform;

/// Kind of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Pure grouping node
    Group,
    /// Renderable geometry; the only type that gets batched
    Mesh,
    /// Light source
    Light,
    /// Camera placeholder
    Camera,
    /// Medical structure (segmentation, volume region)
    Medical,
    /// Label or marker
    Annotation,
}

impl NodeType {
    /// Whether nodes of this type carry their own geometry
    ///
    /// Such nodes keep their local bounds in the world-bounds union even
    /// when they have children.
    pub fn has_geometry(self) -> bool {
        matches!(self, Self::Mesh | Self::Medical | Self::Annotation)
    }
}

/// Value of a material uniform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    /// Float uniform
    Float(f32),
    /// Integer uniform
    Int(i32),
    /// Boolean uniform
    Bool(bool),
    /// vec3 uniform
    Vec3(Vec3),
    /// vec4 uniform
    Vec4(Vec4),
    /// mat4 uniform
    Mat4(Mat4),
}

/// Render flags and material parameters read by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// Hidden nodes (and their subtrees) are culled
    pub visible: bool,
    /// Casts shadows
    pub cast_shadows: bool,
    /// Receives shadows
    pub receive_shadows: bool,
    /// Needs blending
    pub transparent: bool,
    /// Draw order hint
    pub render_order: i32,
    /// Material handle used for batching
    pub material: Option<String>,
    /// Shader handle used for batching
    pub shader: Option<String>,
    /// Material parameters
    pub uniforms: HashMap<String, UniformValue>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            visible: true,
            cast_shadows: true,
            receive_shadows: true,
            transparent: false,
            render_order: 0,
            material: None,
            shader: None,
            uniforms: HashMap::new(),
        }
    }
}

/// A node in the scene hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Unique id within a scene graph
    pub id: String,
    /// Display name
    pub name: String,
    /// Node kind
    pub node_type: NodeType,
    /// Local transform and cached matrices
    pub transform: Transform,
    /// Geometry bounds in local space (unit box unless overridden)
    pub local_bounds: Bounds,
    /// Cached world-space bounds: own geometry plus visible children
    pub world_bounds: Bounds,
    /// `world_bounds` needs recomputing
    pub bounds_dirty: bool,
    /// Render flags and material parameters
    pub render_state: RenderState,
    /// Optional level-of-detail descriptor
    pub lod: Option<Lod>,
    /// Optional medical metadata
    pub medical_data: Option<MedicalData>,
    /// Attached animations
    pub animations: Vec<Animation>,
    pub(crate) custom_bounds: bool,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
}

impl SceneNode {
    /// Create a detached node with identity transform and unit bounds
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            transform: Transform::identity(),
            local_bounds: Bounds::default(),
            world_bounds: Bounds::default(),
            bounds_dirty: true,
            render_state: RenderState::default(),
            lod: None,
            medical_data: None,
            animations: Vec::new(),
            custom_bounds: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Parent key, `None` for the root and detached nodes
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child keys in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Whether the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the node is visible
    pub fn is_visible(&self) -> bool {
        self.render_state.visible
    }

    /// Composite `(shader, material)` batching key; unset handles are empty
    pub fn batch_key(&self) -> BatchKey {
        BatchKey::new(
            self.render_state.shader.clone().unwrap_or_default(),
            self.render_state.material.clone().unwrap_or_default(),
        )
    }

    /// Find an animation by name
    pub fn animation_mut(&mut self, name: &str) -> Option<&mut Animation> {
        self.animations.iter_mut().find(|animation| animation.name == name)
    }

    /// Drop links, animations, uniforms and metadata
    pub(crate) fn clear(&mut self) {
        self.parent = None;
        self.children.clear();
        self.animations.clear();
        self.render_state.uniforms.clear();
        if let Some(medical) = self.medical_data.as_mut() {
            medical.metadata.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_defaults() {
        let node = SceneNode::new("liver", "Liver", NodeType::Medical);
        assert!(node.is_leaf());
        assert!(node.is_visible());
        assert!(node.parent().is_none());
        assert!(node.bounds_dirty);
        assert_eq!(node.local_bounds, Bounds::default());
    }

    #[test]
    fn test_batch_key_defaults_to_empty_strings() {
        let mut node = SceneNode::new("m", "mesh", NodeType::Mesh);
        assert_eq!(node.batch_key(), BatchKey::new("", ""));

        node.render_state.shader = Some("pbr".into());
        node.render_state.material = Some("bone".into());
        assert_eq!(node.batch_key(), BatchKey::new("pbr", "bone"));
    }
}
