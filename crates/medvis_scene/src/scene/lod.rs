//! Level-of-detail selection

use serde::{Deserialize, Serialize};

/// Opaque handle to a mesh owned by the renderer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub String);

impl MeshHandle {
    /// Wrap a renderer mesh name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Distance-based LOD descriptor attached to a node
///
/// `distances[i]` is the upper bound (exclusive) of level `i`; a distance at
/// or beyond the last threshold selects level `distances.len()`. Level `i`
/// renders `meshes[i]`, so a node with two thresholds normally carries three
/// meshes. A level without a mesh means "draw nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lod {
    /// Ascending distance thresholds
    pub distances: Vec<f32>,

    /// Mesh per level, parallel to the levels
    pub meshes: Vec<MeshHandle>,

    /// Level chosen by the last selection
    pub current_level: usize,

    /// Per-node multiplier applied to the distance
    pub bias: f32,

    /// Whether the culler consults this descriptor
    pub enabled: bool,
}

impl Lod {
    /// Create an enabled descriptor with bias 1
    pub fn new(distances: Vec<f32>, meshes: Vec<MeshHandle>) -> Self {
        Self {
            distances,
            meshes,
            current_level: 0,
            bias: 1.0,
            enabled: true,
        }
    }

    /// Level index for a biased distance
    pub fn level_for_distance(&self, distance: f32) -> usize {
        self.distances
            .iter()
            .position(|threshold| distance < *threshold)
            .unwrap_or(self.distances.len())
    }

    /// Select and store the level for `distance` scaled by `global_bias`
    ///
    /// Returns the selected mesh, or `None` when that level has no mesh.
    pub fn select(&mut self, distance: f32, global_bias: f32) -> Option<&MeshHandle> {
        self.current_level = self.level_for_distance(distance * global_bias * self.bias);
        self.meshes.get(self.current_level)
    }

    /// Mesh for the current level
    pub fn current_mesh(&self) -> Option<&MeshHandle> {
        self.meshes.get(self.current_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_lod() -> Lod {
        Lod::new(vec![10.0, 50.0], vec![MeshHandle::new("high"), MeshHandle::new("medium")])
    }

    #[test]
    fn test_levels_by_distance() {
        let lod = two_level_lod();
        assert_eq!(lod.level_for_distance(5.0), 0);
        assert_eq!(lod.level_for_distance(10.0), 1);
        assert_eq!(lod.level_for_distance(30.0), 1);
        assert_eq!(lod.level_for_distance(80.0), 2);
    }

    #[test]
    fn test_select_beyond_meshes_returns_none() {
        let mut lod = two_level_lod();
        assert_eq!(lod.select(30.0, 1.0), Some(&MeshHandle::new("medium")));
        assert_eq!(lod.current_level, 1);

        assert!(lod.select(80.0, 1.0).is_none());
        assert_eq!(lod.current_level, 2);
    }

    #[test]
    fn test_bias_scales_distance() {
        let mut lod = two_level_lod();
        lod.bias = 0.5;
        // 30 * 0.5 * 0.5 = 7.5
        assert!(lod.select(30.0, 0.5).is_some());
        assert_eq!(lod.current_level, 0);
    }
}
