//! Randomized hierarchy checks
//!
//! Builds scenes from seeded random edits and checks the structural
//! guarantees of the graph after every step.

use crate::foundation::collections::NodeKey;
use crate::foundation::math::{Mat4, Quat, Vec3};
use crate::scene::{Camera, NodeType, SceneGraph, ROOT_ID};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
mod tests {
    use super::*;

    fn random_vec(rng: &mut StdRng, range: f32) -> Vec3 {
        Vec3::new(
            rng.gen_range(-range..range),
            rng.gen_range(-range..range),
            rng.gen_range(-range..range),
        )
    }

    /// Root plus `count` nodes attached under random earlier nodes
    fn random_scene(rng: &mut StdRng, count: usize) -> (SceneGraph, Vec<NodeKey>) {
        let mut graph = SceneGraph::new();
        let mut keys = vec![graph.root()];
        for i in 0..count {
            let node_type = if rng.gen_bool(0.5) { NodeType::Mesh } else { NodeType::Group };
            let key = graph.create_node(format!("n{i}"), format!("Node {i}"), node_type);
            let parent = keys[rng.gen_range(0..keys.len())];
            assert!(graph.add_child(parent, key));
            graph.set_position(key, random_vec(rng, 10.0));
            graph.set_rotation(key, Quat::from_euler_angles(rng.gen(), rng.gen(), rng.gen()));
            graph.set_scale(
                key,
                Vec3::new(rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0), rng.gen_range(0.5..2.0)),
            );
            keys.push(key);
        }
        (graph, keys)
    }

    fn assert_structure_consistent(graph: &SceneGraph) {
        let mut reachable = vec![graph.root()];
        reachable.extend(graph.descendants(graph.root()));
        assert_eq!(reachable.len(), graph.node_count());

        for &key in &reachable {
            let node = graph.node(key).unwrap();
            assert_eq!(graph.node_key(&node.id), Some(key));
            assert!(!graph.is_ancestor(key, key));
            match node.parent() {
                Some(parent) => assert!(graph.node(parent).unwrap().children().contains(&key)),
                None => assert_eq!(key, graph.root()),
            }
            for &child in node.children() {
                assert_eq!(graph.node(child).unwrap().parent(), Some(key));
            }
        }
    }

    #[test]
    fn test_random_edits_keep_tree_acyclic() {
        let mut rng = StdRng::seed_from_u64(7);
        let (mut graph, keys) = random_scene(&mut rng, 40);

        for _ in 0..200 {
            let parent = keys[rng.gen_range(0..keys.len())];
            let child = keys[rng.gen_range(0..keys.len())];
            let would_cycle = child == graph.root() || child == parent || graph.is_ancestor(child, parent);

            assert_eq!(graph.add_child(parent, child), !would_cycle);
            assert_structure_consistent(&graph);
        }
    }

    #[test]
    fn test_remove_and_readd_keeps_registry_consistent() {
        let mut rng = StdRng::seed_from_u64(11);
        let (mut graph, keys) = random_scene(&mut rng, 30);

        for _ in 0..50 {
            let key = keys[rng.gen_range(1..keys.len())];
            let id = graph.node(key).unwrap().id.clone();
            if graph.node_key(&id).is_some() {
                assert!(graph.remove_node(&id));
                assert!(graph.node_key(&id).is_none());
            } else if graph.node(key).unwrap().parent().is_none() {
                graph.add_node(key, Some(ROOT_ID)).unwrap();
            }
            assert_structure_consistent(&graph);
        }
    }

    #[test]
    fn test_set_position_dirties_whole_subtree_until_updated() {
        let mut rng = StdRng::seed_from_u64(3);
        let (mut graph, keys) = random_scene(&mut rng, 25);
        graph.update(0.0);

        let target = keys[1];
        graph.set_position(target, Vec3::new(1.0, 2.0, 3.0));
        let subtree = graph.descendants(target);
        assert!(graph.node(target).unwrap().transform.world_matrix_dirty);
        for &key in &subtree {
            assert!(graph.node(key).unwrap().transform.world_matrix_dirty);
        }

        // Refreshing one descendant leaves its untouched siblings dirty
        if let Some(&first) = subtree.first() {
            graph.update_world_matrix(first);
            assert!(!graph.node(first).unwrap().transform.world_matrix_dirty);
            assert!(!graph.node(target).unwrap().transform.world_matrix_dirty);
        }

        graph.update(0.0);
        for &key in &subtree {
            assert!(!graph.node(key).unwrap().transform.world_matrix_dirty);
        }
    }

    #[test]
    fn test_world_matrix_matches_composed_chain() {
        let mut rng = StdRng::seed_from_u64(42);
        let (mut graph, keys) = random_scene(&mut rng, 30);
        graph.update(0.0);

        for &key in &keys {
            let mut expected = Mat4::identity();
            let mut current = Some(key);
            while let Some(k) = current {
                let node = graph.node(k).unwrap();
                let t = &node.transform;
                let local = nalgebra::Translation3::from(t.position).to_homogeneous()
                    * t.rotation.to_homogeneous()
                    * Mat4::new_nonuniform_scaling(&t.scale);
                expected = local * expected;
                current = node.parent();
            }
            assert_relative_eq!(graph.node(key).unwrap().transform.world_matrix, expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_adding_child_never_shrinks_bounds() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut graph = SceneGraph::new();
        let group = graph.create_node("group", "Group", NodeType::Group);
        graph.add_node(group, None).unwrap();
        let first = graph.create_node("first", "First", NodeType::Mesh);
        graph.add_node(first, Some("group")).unwrap();

        for i in 0..30 {
            let before = graph.world_bounds(group).unwrap();
            let key = graph.create_node(format!("extra{i}"), "Extra", NodeType::Mesh);
            graph.add_node(key, Some("group")).unwrap();
            graph.set_position(key, random_vec(&mut rng, 20.0));
            graph.set_scale(key, Vec3::new(rng.gen_range(0.1..3.0), 1.0, 1.0));

            let after = graph.world_bounds(group).unwrap();
            assert!(after.contains(&before));
        }
    }

    #[test]
    fn test_cull_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(99);
        let (mut graph, keys) = random_scene(&mut rng, 60);
        for &key in keys.iter().skip(1).step_by(4) {
            graph.node_mut(key).unwrap().render_state.material = Some("tissue".into());
        }
        graph.update(0.016);

        let mut camera = Camera::perspective(Vec3::new(0.0, 5.0, 30.0), 45.0, 1.5, 0.1, 200.0);
        let mut first = graph.cull(&mut camera).unwrap().clone();
        let mut second = graph.cull(&mut camera).unwrap().clone();
        first.statistics.elapsed = Default::default();
        second.statistics.elapsed = Default::default();

        assert_eq!(first.visible_nodes, second.visible_nodes);
        assert_eq!(first.culled_nodes, second.culled_nodes);
        assert_eq!(first.statistics, second.statistics);
        let ids = |result: &crate::scene::CullingResult| {
            result.render_batches.iter().map(|b| (b.id.clone(), b.nodes.clone())).collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_culled_parent_hides_descendants() {
        let mut rng = StdRng::seed_from_u64(1);
        let (mut graph, keys) = random_scene(&mut rng, 40);
        let hidden = keys[1];
        graph.set_visible(hidden, false);
        let subtree = graph.descendants(hidden);

        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 40.0), 60.0, 1.0, 0.1, 500.0);
        let result = graph.cull(&mut camera).unwrap();
        for key in subtree {
            assert!(!result.is_visible(key));
            assert!(result.cull_reason(key).is_none());
        }
        assert_eq!(result.statistics.total_nodes, result.visible_nodes.len() + result.culled_nodes.len());
    }
}
