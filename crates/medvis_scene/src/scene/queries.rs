//! Medical visibility queries and ray picking
//!
//! Queries walk the attached tree depth-first pre-order, so counts and
//! result order are stable across runs.

use crate::foundation::collections::NodeKey;
use crate::foundation::math::Vec3;
use crate::scene::medical::{ClinicalRelevance, Interactivity, MedicalCriteria, MedicalData, MedicalType, ViewerRole};
use crate::scene::scene_graph::SceneGraph;

impl SceneGraph {
    fn attached_nodes(&self) -> Vec<NodeKey> {
        let mut keys = vec![self.root];
        keys.extend(self.descendants(self.root));
        keys
    }

    fn set_visibility_where<F>(&mut self, visible: bool, mut predicate: F) -> usize
    where
        F: FnMut(&MedicalData) -> bool,
    {
        let matching: Vec<NodeKey> = self
            .attached_nodes()
            .into_iter()
            .filter(|&key| {
                self.nodes
                    .get(key)
                    .and_then(|node| node.medical_data.as_ref())
                    .is_some_and(&mut predicate)
            })
            .collect();

        for &key in &matching {
            self.set_visible(key, visible);
        }
        matching.len()
    }

    /// Show or hide every node of `medical_type`; returns the match count
    pub fn set_visibility_by_medical_type(&mut self, medical_type: MedicalType, visible: bool) -> usize {
        self.set_visibility_where(visible, |data| data.medical_type == medical_type)
    }

    /// Show or hide every node in `organ_system`; returns the match count
    pub fn set_visibility_by_organ_system(&mut self, organ_system: &str, visible: bool) -> usize {
        self.set_visibility_where(visible, |data| data.organ_system.as_deref() == Some(organ_system))
    }

    /// Show or hide every node with exactly `relevance`; returns the match count
    pub fn set_visibility_by_clinical_relevance(&mut self, relevance: ClinicalRelevance, visible: bool) -> usize {
        self.set_visibility_where(visible, |data| data.clinical_relevance == relevance)
    }

    /// Nodes whose medical data satisfies every set field of `criteria`
    pub fn nodes_by_medical_criteria(&self, criteria: &MedicalCriteria) -> Vec<NodeKey> {
        self.attached_nodes()
            .into_iter()
            .filter(|&key| {
                self.nodes
                    .get(key)
                    .and_then(|node| node.medical_data.as_ref())
                    .is_some_and(|data| criteria.matches(data))
            })
            .collect()
    }

    /// Show medical nodes visible to `role` and hide the rest
    ///
    /// Nodes without medical data are untouched. Returns the number of nodes
    /// left visible.
    pub fn apply_role_visibility(&mut self, role: ViewerRole) -> usize {
        let decisions: Vec<(NodeKey, bool)> = self
            .attached_nodes()
            .into_iter()
            .filter_map(|key| {
                let data = self.nodes.get(key)?.medical_data.as_ref()?;
                Some((key, data.visible_to(role)))
            })
            .collect();

        let mut shown = 0;
        for (key, visible) in decisions {
            self.set_visible(key, visible);
            shown += usize::from(visible);
        }
        log::debug!("Role {:?}: {} medical nodes visible", role, shown);
        shown
    }

    /// Attach or replace a node's medical metadata
    pub fn set_medical_data(&mut self, key: NodeKey, data: MedicalData) -> bool {
        self.nodes.get_mut(key).map(|node| node.medical_data = Some(data)).is_some()
    }

    /// Nearest visible, selectable node with geometry hit by a ray
    ///
    /// Tests world-space bounds only. Hidden subtrees, and subtrees whose
    /// aggregate bounds the ray misses, are skipped. Nodes with medical
    /// data must be [`Interactivity::SELECTABLE`].
    pub fn pick(&mut self, ray_origin: Vec3, ray_dir: Vec3) -> Option<NodeKey> {
        let mut best: Option<(f32, NodeKey)> = None;
        let mut stack = vec![self.root];

        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            if !node.render_state.visible {
                continue;
            }
            let Some(bounds) = self.world_bounds(key) else {
                continue;
            };
            if bounds.intersect_ray(ray_origin, ray_dir).is_none() {
                continue;
            }

            let node = &self.nodes[key];
            let selectable = node
                .medical_data
                .as_ref()
                .map_or(true, |data| data.interactivity.contains(Interactivity::SELECTABLE));
            if node.node_type.has_geometry() && selectable {
                // Interior bounds include children; re-test own geometry
                let own = node.local_bounds.transformed(&node.transform.world_matrix);
                if let Some(hit) = own.intersect_ray(ray_origin, ray_dir) {
                    if best.map_or(true, |(nearest, _)| hit < nearest) {
                        best = Some((hit, key));
                    }
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }

        best.map(|(_, key)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::medical::RoleVisibility;
    use crate::scene::node::NodeType;

    fn medical_node(graph: &mut SceneGraph, id: &str, data: MedicalData) -> NodeKey {
        let key = graph.create_node(id, id, NodeType::Medical);
        graph.set_medical_data(key, data);
        graph.add_node(key, None).unwrap();
        key
    }

    fn anatomy() -> (SceneGraph, NodeKey, NodeKey, NodeKey) {
        let mut graph = SceneGraph::new();
        let heart = medical_node(
            &mut graph,
            "heart",
            MedicalData::new(MedicalType::Anatomy, ClinicalRelevance::High).with_organ_system("cardiovascular"),
        );
        let aorta = medical_node(
            &mut graph,
            "aorta",
            MedicalData::new(MedicalType::Anatomy, ClinicalRelevance::Medium).with_organ_system("cardiovascular"),
        );
        let tumor = medical_node(
            &mut graph,
            "tumor",
            MedicalData::new(MedicalType::Pathology, ClinicalRelevance::Critical)
                .with_roles(RoleVisibility::RADIOLOGIST | RoleVisibility::SURGEON),
        );
        (graph, heart, aorta, tumor)
    }

    #[test]
    fn test_visibility_by_organ_system() {
        let (mut graph, heart, aorta, tumor) = anatomy();
        assert_eq!(graph.set_visibility_by_organ_system("cardiovascular", false), 2);
        assert!(!graph.node(heart).unwrap().is_visible());
        assert!(!graph.node(aorta).unwrap().is_visible());
        assert!(graph.node(tumor).unwrap().is_visible());
        assert_eq!(graph.set_visibility_by_organ_system("nervous", false), 0);
    }

    #[test]
    fn test_visibility_by_type_and_relevance() {
        let (mut graph, heart, _aorta, tumor) = anatomy();
        assert_eq!(graph.set_visibility_by_medical_type(MedicalType::Pathology, false), 1);
        assert!(!graph.node(tumor).unwrap().is_visible());

        assert_eq!(graph.set_visibility_by_clinical_relevance(ClinicalRelevance::High, false), 1);
        assert!(!graph.node(heart).unwrap().is_visible());
    }

    #[test]
    fn test_criteria_conjunction() {
        let (graph, heart, aorta, _tumor) = anatomy();
        let mut criteria = MedicalCriteria {
            organ_system: Some("cardiovascular".into()),
            ..Default::default()
        };
        assert_eq!(graph.nodes_by_medical_criteria(&criteria), vec![heart, aorta]);

        criteria.clinical_relevance = Some(ClinicalRelevance::Medium);
        assert_eq!(graph.nodes_by_medical_criteria(&criteria), vec![aorta]);
        assert_eq!(graph.nodes_by_medical_criteria(&MedicalCriteria::default()).len(), 3);
    }

    #[test]
    fn test_role_visibility() {
        let (mut graph, heart, _aorta, tumor) = anatomy();
        assert_eq!(graph.apply_role_visibility(ViewerRole::Student), 2);
        assert!(!graph.node(tumor).unwrap().is_visible());
        assert!(graph.node(heart).unwrap().is_visible());

        assert_eq!(graph.apply_role_visibility(ViewerRole::Surgeon), 3);
        assert!(graph.node(tumor).unwrap().is_visible());
    }

    #[test]
    fn test_pick_nearest_selectable() {
        let (mut graph, heart, aorta, tumor) = anatomy();
        graph.set_position(heart, Vec3::new(0.0, 0.0, -5.0));
        graph.set_position(aorta, Vec3::new(0.0, 0.0, -2.0));
        graph.set_position(tumor, Vec3::new(3.0, 0.0, 0.0));
        let forward = Vec3::new(0.0, 0.0, -1.0);

        assert_eq!(graph.pick(Vec3::new(0.0, 0.0, 5.0), forward), Some(aorta));

        graph.node_mut(aorta).unwrap().medical_data.as_mut().unwrap().interactivity = Interactivity::HOVERABLE;
        assert_eq!(graph.pick(Vec3::new(0.0, 0.0, 5.0), forward), Some(heart));

        graph.set_visible(heart, false);
        assert_eq!(graph.pick(Vec3::new(0.0, 0.0, 5.0), forward), None);
    }
}
