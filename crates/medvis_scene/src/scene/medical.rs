//! Medical metadata attached to scene nodes
//!
//! Anatomy, pathology, annotation, measurement and implant nodes carry a
//! [`MedicalData`] record. The scene graph filters on it for UI-driven
//! visibility toggles (see `SceneGraph::set_visibility_by_*`).

use std::collections::HashMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Kind of medical content a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicalType {
    /// Segmented anatomical structure
    Anatomy,
    /// Lesion, tumour or other finding
    Pathology,
    /// Free-form label or marker
    Annotation,
    /// Distance, angle or volume measurement
    Measurement,
    /// Prosthesis, stent, screw, etc.
    Implant,
}

/// Clinical importance, ordered from least to most relevant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalRelevance {
    /// Context only
    Low,
    /// Worth noting
    Medium,
    /// Relevant to diagnosis
    High,
    /// Must never be hidden by accident
    Critical,
}

bitflags! {
    /// Which viewer roles see a node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RoleVisibility: u8 {
        /// Default viewer
        const DEFAULT = 1 << 0;
        /// Radiologist reading view
        const RADIOLOGIST = 1 << 1;
        /// Surgical planning view
        const SURGEON = 1 << 2;
        /// Teaching view
        const STUDENT = 1 << 3;
    }
}

impl Default for RoleVisibility {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// What a user may do with a node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Interactivity: u8 {
        /// Can be picked
        const SELECTABLE = 1 << 0;
        /// Highlights on hover
        const HOVERABLE = 1 << 1;
        /// Can be edited
        const EDITABLE = 1 << 2;
        /// Can be measured
        const MEASURABLE = 1 << 3;
    }
}

impl Default for Interactivity {
    fn default() -> Self {
        Self::SELECTABLE | Self::HOVERABLE
    }
}

/// Viewer role used for role-based visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    /// Default viewer
    Default,
    /// Radiologist
    Radiologist,
    /// Surgeon
    Surgeon,
    /// Student
    Student,
}

impl ViewerRole {
    /// Flag corresponding to this role
    pub fn flag(self) -> RoleVisibility {
        match self {
            Self::Default => RoleVisibility::DEFAULT,
            Self::Radiologist => RoleVisibility::RADIOLOGIST,
            Self::Surgeon => RoleVisibility::SURGEON,
            Self::Student => RoleVisibility::STUDENT,
        }
    }
}

/// Medical metadata for a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalData {
    /// Kind of content
    pub medical_type: MedicalType,
    /// Organ system, e.g. "cardiovascular"
    pub organ_system: Option<String>,
    /// Tissue type, e.g. "bone"
    pub tissue_type: Option<String>,
    /// Clinical relevance
    pub clinical_relevance: ClinicalRelevance,
    /// Per-role visibility
    pub role_visibility: RoleVisibility,
    /// Interaction permissions
    pub interactivity: Interactivity,
    /// Free-form key/value metadata (DICOM tags, study ids, notes)
    pub metadata: HashMap<String, String>,
}

impl MedicalData {
    /// Create metadata with default roles and interactivity
    pub fn new(medical_type: MedicalType, clinical_relevance: ClinicalRelevance) -> Self {
        Self {
            medical_type,
            organ_system: None,
            tissue_type: None,
            clinical_relevance,
            role_visibility: RoleVisibility::default(),
            interactivity: Interactivity::default(),
            metadata: HashMap::new(),
        }
    }

    /// Builder pattern: Set organ system
    pub fn with_organ_system(mut self, organ_system: impl Into<String>) -> Self {
        self.organ_system = Some(organ_system.into());
        self
    }

    /// Builder pattern: Set tissue type
    pub fn with_tissue_type(mut self, tissue_type: impl Into<String>) -> Self {
        self.tissue_type = Some(tissue_type.into());
        self
    }

    /// Builder pattern: Set role visibility
    pub fn with_roles(mut self, roles: RoleVisibility) -> Self {
        self.role_visibility = roles;
        self
    }

    /// Builder pattern: Set interactivity
    pub fn with_interactivity(mut self, interactivity: Interactivity) -> Self {
        self.interactivity = interactivity;
        self
    }

    /// Builder pattern: Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether `role` may see this node
    pub fn visible_to(&self, role: ViewerRole) -> bool {
        self.role_visibility.contains(role.flag())
    }
}

/// Conjunction of optional filters; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicalCriteria {
    /// Required medical type
    pub medical_type: Option<MedicalType>,
    /// Required organ system
    pub organ_system: Option<String>,
    /// Required clinical relevance
    pub clinical_relevance: Option<ClinicalRelevance>,
}

impl MedicalCriteria {
    /// Whether `data` satisfies every set filter
    pub fn matches(&self, data: &MedicalData) -> bool {
        self.medical_type.map_or(true, |t| t == data.medical_type)
            && self
                .organ_system
                .as_deref()
                .map_or(true, |system| data.organ_system.as_deref() == Some(system))
            && self.clinical_relevance.map_or(true, |r| r == data.clinical_relevance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_ordering() {
        assert!(ClinicalRelevance::Critical > ClinicalRelevance::High);
        assert!(ClinicalRelevance::Low < ClinicalRelevance::Medium);
    }

    #[test]
    fn test_criteria_conjunction() {
        let heart = MedicalData::new(MedicalType::Anatomy, ClinicalRelevance::High)
            .with_organ_system("cardiovascular");

        assert!(MedicalCriteria::default().matches(&heart));
        assert!(MedicalCriteria {
            medical_type: Some(MedicalType::Anatomy),
            organ_system: Some("cardiovascular".into()),
            ..Default::default()
        }
        .matches(&heart));
        assert!(!MedicalCriteria {
            medical_type: Some(MedicalType::Anatomy),
            clinical_relevance: Some(ClinicalRelevance::Low),
            ..Default::default()
        }
        .matches(&heart));
    }

    #[test]
    fn test_role_visibility() {
        let lesion = MedicalData::new(MedicalType::Pathology, ClinicalRelevance::Critical)
            .with_roles(RoleVisibility::RADIOLOGIST | RoleVisibility::SURGEON);

        assert!(lesion.visible_to(ViewerRole::Surgeon));
        assert!(!lesion.visible_to(ViewerRole::Student));
    }
}
