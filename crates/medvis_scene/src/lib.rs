//! # MedVis Scene
//!
//! Scene graph and visibility engine for medical visualization.
//!
//! ## Features
//!
//! - **Hierarchy**: Arena-backed node tree with id lookup and cycle checks
//! - **Lazy Refresh**: Dirty-flagged world matrices and bounds
//! - **Culling**: Visibility, LOD, distance, frustum and pluggable occlusion
//! - **Batching**: Instanced render batches keyed by shader and material
//! - **Medical Metadata**: Type, organ system, relevance and role filters
//! - **Animation**: Keyframed transform, material and visibility tracks
//!
//! ## Quick Start
//!
//! ```rust
//! use medvis_scene::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = SceneGraph::new();
//!     let liver = scene.create_node("liver", "Liver", NodeType::Mesh);
//!     scene.add_node(liver, None)?;
//!     scene.set_position(liver, Vec3::new(0.0, 0.0, -2.0));
//!
//!     let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
//!     scene.update(1.0 / 60.0);
//!     let result = scene.cull(&mut camera)?;
//!     assert!(result.is_visible(liver));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod scene;

/// Common imports for scene users
pub mod prelude {
    pub use crate::{
        config::{BatchOverflow, Config, ConfigError, SceneGraphConfig},
        foundation::{
            collections::NodeKey,
            math::{Mat4, Quat, Vec3},
            time::{Stopwatch, Timer},
        },
        scene::{
            Animation, AnimationTarget, Bounds, Camera, ClinicalRelevance, CullReason, CullingResult,
            Interpolation, Keyframe, KeyframeValue, Lod, MedicalCriteria, MedicalData, MedicalType, MeshHandle,
            NodeType, SceneError, SceneGraph, SceneNode, TransformProperty, ViewerRole,
        },
    };
}
