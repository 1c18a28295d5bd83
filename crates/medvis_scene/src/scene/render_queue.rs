//! Render batches for instanced drawing
//!
//! Visible mesh nodes sharing a `(shader, material)` key are grouped so the
//! renderer can issue one instanced draw per batch. Batches appear in the
//! order their key is first met during traversal, and members keep
//! traversal order.

use std::collections::HashMap;

use crate::config::BatchOverflow;
use crate::foundation::collections::NodeKey;
use crate::foundation::math::Mat4;
use crate::scene::bounds::Bounds;

/// Shared state of all instances in a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Shader handle (empty when unset)
    pub shader: String,
    /// Material handle (empty when unset)
    pub material: String,
}

impl BatchKey {
    /// Create a key from shader and material handles
    pub fn new(shader: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            shader: shader.into(),
            material: material.into(),
        }
    }
}

/// A batch of instances sharing shader and material
#[derive(Debug, Clone)]
pub struct RenderBatch {
    /// `"shader|material"`, suffixed `#n` for spill batches
    pub id: String,

    /// Shader/material shared by every member
    pub key: BatchKey,

    /// Member nodes in traversal order
    pub nodes: Vec<NodeKey>,

    /// Number of instances (equals `nodes.len()`)
    pub instance_count: usize,

    /// Column-major 4x4 world matrices, 16 floats per instance
    pub instance_transforms: Vec<f32>,

    /// World-space box covering every member
    pub bounds: Option<Bounds>,
}

impl RenderBatch {
    /// Create a new empty batch
    pub fn new(id: String, key: BatchKey) -> Self {
        Self {
            id,
            key,
            nodes: Vec::new(),
            instance_count: 0,
            instance_transforms: Vec::new(),
            bounds: None,
        }
    }

    /// Append one instance
    pub fn add_instance(&mut self, node: NodeKey, world_matrix: &Mat4, world_bounds: &Bounds) {
        self.nodes.push(node);
        self.instance_transforms.extend_from_slice(world_matrix.as_slice());
        self.instance_count += 1;
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.union(world_bounds),
            None => *world_bounds,
        });
    }

    /// Instance buffer as bytes, ready for upload
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instance_transforms)
    }
}

/// One visible mesh node offered to the batcher
#[derive(Debug, Clone)]
pub struct BatchInstance {
    /// Node key
    pub node: NodeKey,
    /// Batching key
    pub key: BatchKey,
    /// World matrix
    pub world_matrix: Mat4,
    /// World-space bounds
    pub world_bounds: Bounds,
}

/// Groups visible instances into capped batches
#[derive(Debug, Clone, Copy)]
pub struct BatchBuilder {
    max_batch_size: usize,
    overflow: BatchOverflow,
}

impl BatchBuilder {
    /// Create a builder with a per-batch cap and overflow policy
    pub fn new(max_batch_size: usize, overflow: BatchOverflow) -> Self {
        Self { max_batch_size, overflow }
    }

    /// Batch instances by key
    pub fn build<I>(&self, instances: I) -> Vec<RenderBatch>
    where
        I: IntoIterator<Item = BatchInstance>,
    {
        if self.max_batch_size == 0 {
            log::warn!("max_batch_size is 0; no render batches built");
            return Vec::new();
        }

        let mut batches: Vec<RenderBatch> = Vec::new();
        // Key -> (index of the open batch, batches created so far)
        let mut open: HashMap<BatchKey, (usize, usize)> = HashMap::new();
        let mut dropped = 0usize;

        for instance in instances {
            let slot = match open.get(&instance.key) {
                Some(&(index, created)) if batches[index].nodes.len() >= self.max_batch_size => {
                    match self.overflow {
                        BatchOverflow::Drop => {
                            dropped += 1;
                            continue;
                        }
                        BatchOverflow::Spill => {
                            let id = format!("{}|{}#{}", instance.key.shader, instance.key.material, created);
                            batches.push(RenderBatch::new(id, instance.key.clone()));
                            (batches.len() - 1, created + 1)
                        }
                    }
                }
                Some(&slot) => slot,
                None => {
                    let id = format!("{}|{}", instance.key.shader, instance.key.material);
                    batches.push(RenderBatch::new(id, instance.key.clone()));
                    (batches.len() - 1, 1)
                }
            };

            batches[slot.0].add_instance(instance.node, &instance.world_matrix, &instance.world_bounds);
            open.insert(instance.key, slot);
        }

        if dropped > 0 {
            log::debug!("Dropped {} instances beyond max_batch_size {}", dropped, self.max_batch_size);
        }
        batches
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new(100, BatchOverflow::Spill)
    }
}
