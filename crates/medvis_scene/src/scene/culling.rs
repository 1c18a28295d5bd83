//! Visibility culling
//!
//! [`SceneGraph::cull`] walks the hierarchy depth-first from the root and
//! runs each node through, in order: visibility flag, LOD selection,
//! culling distance, frustum (bounding sphere) and occlusion. The first
//! failing test records the reason and skips the node's whole subtree.
//! Visible mesh nodes are then grouped into render batches.

use std::time::Duration;

use crate::foundation::collections::NodeKey;
use crate::foundation::time::Stopwatch;
use crate::scene::bounds::Bounds;
use crate::scene::camera::Camera;
use crate::scene::error::SceneError;
use crate::scene::frustum::Frustum;
use crate::scene::node::NodeType;
use crate::scene::render_queue::{BatchBuilder, BatchInstance, RenderBatch};
use crate::scene::scene_graph::SceneGraph;

/// Why a node was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullReason {
    /// `render_state.visible` is false
    Hidden,
    /// Selected LOD level has no mesh
    Lod,
    /// Beyond the configured culling distance
    Distance,
    /// Bounding sphere outside the view frustum
    Frustum,
    /// Reported hidden by the occlusion query
    Occlusion,
}

/// Counters for one `cull` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CullingStatistics {
    /// Nodes visited (culled subtrees are not visited)
    pub total_nodes: usize,
    /// Nodes that passed every test
    pub visible_nodes: usize,
    /// Nodes hidden by their visibility flag
    pub hidden_culled: usize,
    /// Nodes rejected by LOD selection
    pub lod_culled: usize,
    /// Nodes rejected by distance
    pub distance_culled: usize,
    /// Nodes rejected by the frustum test
    pub frustum_culled: usize,
    /// Nodes rejected by the occlusion query
    pub occlusion_culled: usize,
    /// Render batches produced
    pub batch_count: usize,
    /// Wall time spent in `cull`
    pub elapsed: Duration,
}

impl CullingStatistics {
    /// Count a rejection
    pub fn record(&mut self, reason: CullReason) {
        match reason {
            CullReason::Hidden => self.hidden_culled += 1,
            CullReason::Lod => self.lod_culled += 1,
            CullReason::Distance => self.distance_culled += 1,
            CullReason::Frustum => self.frustum_culled += 1,
            CullReason::Occlusion => self.occlusion_culled += 1,
        }
    }

    /// Total rejections across all reasons
    pub fn culled_nodes(&self) -> usize {
        self.hidden_culled + self.lod_culled + self.distance_culled + self.frustum_culled + self.occlusion_culled
    }
}

/// Output of one `SceneGraph::cull`
#[derive(Debug, Clone, Default)]
pub struct CullingResult {
    /// Visible nodes in traversal (depth-first pre-order) order
    pub visible_nodes: Vec<NodeKey>,
    /// Rejected nodes with the reason, in traversal order
    pub culled_nodes: Vec<(NodeKey, CullReason)>,
    /// Batches of visible mesh nodes
    pub render_batches: Vec<RenderBatch>,
    /// Counters and timing
    pub statistics: CullingStatistics,
}

impl CullingResult {
    /// Whether `key` survived culling
    pub fn is_visible(&self, key: NodeKey) -> bool {
        self.visible_nodes.contains(&key)
    }

    /// Reason `key` was culled, if it was visited and rejected
    pub fn cull_reason(&self, key: NodeKey) -> Option<CullReason> {
        self.culled_nodes
            .iter()
            .find_map(|(culled, reason)| (*culled == key).then_some(*reason))
    }
}

/// Occlusion test plugged into the culler
///
/// Hardware occlusion queries live in the renderer; the scene graph only
/// asks this trait. The default [`AlwaysVisible`] never occludes.
pub trait OcclusionQuery: Send {
    /// Whether the world-space `bounds` are hidden from `camera`
    fn is_occluded(&self, bounds: &Bounds, camera: &Camera) -> bool;
}

/// Occlusion query that never reports occlusion
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl OcclusionQuery for AlwaysVisible {
    fn is_occluded(&self, _bounds: &Bounds, _camera: &Camera) -> bool {
        false
    }
}

impl SceneGraph {
    /// Cull the scene against `camera` and build render batches
    ///
    /// Refreshes the camera matrices and frustum first. If the frustum is
    /// degenerate the error is returned and the previous result is left
    /// untouched. Dirty world matrices and bounds are refreshed on the way.
    pub fn cull(&mut self, camera: &mut Camera) -> Result<&CullingResult, SceneError> {
        let stopwatch = Stopwatch::start_new();
        let frustum = camera.update_matrices()?.clone();

        let mut result = CullingResult::default();
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            result.statistics.total_nodes += 1;
            match self.test_node(key, camera, &frustum) {
                Ok(()) => {
                    result.visible_nodes.push(key);
                    if let Some(node) = self.nodes.get(key) {
                        stack.extend(node.children.iter().rev().copied());
                    }
                }
                Err(reason) => {
                    result.statistics.record(reason);
                    result.culled_nodes.push((key, reason));
                }
            }
        }
        result.statistics.visible_nodes = result.visible_nodes.len();

        if self.config.enable_batching {
            let instances: Vec<BatchInstance> = result
                .visible_nodes
                .iter()
                .filter_map(|&key| {
                    let node = self.nodes.get(key)?;
                    (node.node_type == NodeType::Mesh).then(|| BatchInstance {
                        node: key,
                        key: node.batch_key(),
                        world_matrix: node.transform.world_matrix,
                        world_bounds: node.world_bounds,
                    })
                })
                .collect();
            let builder = BatchBuilder::new(self.config.max_batch_size, self.config.batch_overflow);
            result.render_batches = builder.build(instances);
        }
        result.statistics.batch_count = result.render_batches.len();
        result.statistics.elapsed = stopwatch.elapsed();

        log::debug!(
            "Cull: {} visible / {} visited, {} culled, {} batches in {:?}",
            result.statistics.visible_nodes,
            result.statistics.total_nodes,
            result.statistics.culled_nodes(),
            result.statistics.batch_count,
            result.statistics.elapsed
        );

        Ok(self.last_result.insert(result))
    }

    fn test_node(&mut self, key: NodeKey, camera: &Camera, frustum: &Frustum) -> Result<(), CullReason> {
        if !self.nodes.get(key).is_some_and(|node| node.render_state.visible) {
            return Err(CullReason::Hidden);
        }

        let bounds = self.world_bounds(key).ok_or(CullReason::Hidden)?;
        let center = bounds.center();
        let distance = camera.distance_to(&center);

        let lod_bias = self.config.lod_bias;
        if let Some(lod) = self.nodes.get_mut(key).and_then(|node| node.lod.as_mut()) {
            if lod.enabled && lod.select(distance, lod_bias).is_none() {
                return Err(CullReason::Lod);
            }
        }

        let culling_distance = self.config.culling_distance;
        if culling_distance > 0.0 && distance - bounds.radius() > culling_distance {
            return Err(CullReason::Distance);
        }

        if self.config.enable_frustum_culling && !frustum.intersects_sphere(center, bounds.radius()) {
            return Err(CullReason::Frustum);
        }

        if self.config.enable_occlusion_culling && self.occlusion.is_occluded(&bounds, camera) {
            return Err(CullReason::Occlusion);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn camera_at(z: f32) -> Camera {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, z), 60.0, 1.0, 0.1, 1000.0);
        camera.look_at(Vec3::zeros(), Vec3::y());
        camera
    }

    fn mesh(graph: &mut SceneGraph, id: &str, position: Vec3) -> NodeKey {
        let key = graph.create_node(id, id, NodeType::Mesh);
        graph.add_node(key, None).unwrap();
        graph.set_position(key, position);
        key
    }

    struct OccludeAll;

    impl OcclusionQuery for OccludeAll {
        fn is_occluded(&self, _bounds: &Bounds, _camera: &Camera) -> bool {
            true
        }
    }

    #[test]
    fn test_hidden_node_culled_with_reason() {
        let mut graph = SceneGraph::new();
        let a = mesh(&mut graph, "a", Vec3::zeros());
        let b = mesh(&mut graph, "b", Vec3::new(1.0, 0.0, 0.0));
        graph.set_visible(b, false);

        let result = graph.cull(&mut camera_at(10.0)).unwrap();
        assert!(result.is_visible(a));
        assert_eq!(result.cull_reason(b), Some(CullReason::Hidden));
        assert_eq!(result.statistics.hidden_culled, 1);
        assert_eq!(result.statistics.total_nodes, 3);
    }

    #[test]
    fn test_behind_camera_is_frustum_culled() {
        let mut graph = SceneGraph::new();
        let front = mesh(&mut graph, "front", Vec3::zeros());
        let behind = mesh(&mut graph, "behind", Vec3::new(0.0, 0.0, 50.0));

        let result = graph.cull(&mut camera_at(10.0)).unwrap();
        assert!(result.is_visible(front));
        assert_eq!(result.cull_reason(behind), Some(CullReason::Frustum));

        graph.config_mut().enable_frustum_culling = false;
        assert!(graph.cull(&mut camera_at(10.0)).unwrap().is_visible(behind));
    }

    #[test]
    fn test_occlusion_only_when_enabled() {
        let mut graph = SceneGraph::new();
        mesh(&mut graph, "a", Vec3::zeros());
        graph.set_occlusion_query(Box::new(OccludeAll));

        assert_eq!(graph.cull(&mut camera_at(10.0)).unwrap().statistics.occlusion_culled, 0);

        graph.config_mut().enable_occlusion_culling = true;
        let result = graph.cull(&mut camera_at(10.0)).unwrap();
        assert_eq!(result.statistics.occlusion_culled, 1);
        assert!(result.visible_nodes.is_empty());
    }

    #[test]
    fn test_batching_disabled_builds_no_batches() {
        let mut graph = SceneGraph::new();
        mesh(&mut graph, "a", Vec3::zeros());
        graph.config_mut().enable_batching = false;

        let result = graph.cull(&mut camera_at(10.0)).unwrap();
        assert_eq!(result.visible_nodes.len(), 2);
        assert!(result.render_batches.is_empty());
    }

    #[test]
    fn test_degenerate_camera_keeps_previous_result() {
        let mut graph = SceneGraph::new();
        mesh(&mut graph, "a", Vec3::zeros());
        graph.cull(&mut camera_at(10.0)).unwrap();

        let mut broken = camera_at(10.0);
        broken.look_at(broken.position, Vec3::y());
        assert!(matches!(graph.cull(&mut broken), Err(SceneError::DegenerateFrustum { .. })));
        assert_eq!(graph.last_result().unwrap().visible_nodes.len(), 2);
    }

    #[test]
    fn test_statistics_record() {
        let mut stats = CullingStatistics::default();
        stats.record(CullReason::Distance);
        stats.record(CullReason::Distance);
        stats.record(CullReason::Frustum);

        assert_eq!(stats.distance_culled, 2);
        assert_eq!(stats.frustum_culled, 1);
        assert_eq!(stats.culled_nodes(), 3);
    }
}
