//! Scene graph, culling and batching
//!
//! Provides the node hierarchy, per-frame transform and bounds refresh,
//! visibility culling against a camera, and render batch construction.

pub mod animation;
pub mod bounds;
pub mod camera;
pub mod culling;
pub mod error;
pub mod frustum;
pub mod lod;
pub mod medical;
pub mod node;
pub mod queries;
pub mod render_queue;
pub mod scene_graph;
pub mod transform;

#[cfg(test)]
mod tests;

pub use animation::{
    Animation, AnimationTarget, Interpolation, Keyframe, KeyframeValue, PlaybackState, TransformProperty,
};
pub use bounds::Bounds;
pub use camera::Camera;
pub use culling::{AlwaysVisible, CullReason, CullingResult, CullingStatistics, OcclusionQuery};
pub use error::SceneError;
pub use frustum::{Frustum, Plane};
pub use lod::{Lod, MeshHandle};
pub use medical::{
    ClinicalRelevance, Interactivity, MedicalCriteria, MedicalData, MedicalType, RoleVisibility, ViewerRole,
};
pub use node::{NodeType, RenderState, SceneNode, UniformValue};
pub use render_queue::{BatchBuilder, BatchInstance, BatchKey, RenderBatch};
pub use scene_graph::{SceneGraph, ROOT_ID};
pub use transform::Transform;
