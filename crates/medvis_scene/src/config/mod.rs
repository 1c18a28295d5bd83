//! Configuration system
//!
//! Scene configuration is plain serde data so hosts can keep it in TOML or
//! RON files next to their other settings.

pub use serde::{Serialize, Deserialize};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match format {
            ConfigFormat::Toml => Self::from_toml_str(&contents),
            ConfigFormat::Ron => Self::from_ron_str(&contents),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => self.to_toml_string()?,
            ConfigFormat::Ron => self.to_ron_string()?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse from a TOML document
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse from a RON document
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize as pretty TOML
    fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Serialize as pretty RON
    fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// What happens to visible nodes beyond `max_batch_size` in one material group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchOverflow {
    /// Start another batch with the same shader/material key
    #[default]
    Spill,
    /// Leave the excess nodes out of batching entirely
    Drop,
}

/// Culling and batching settings for a [`SceneGraph`](crate::scene::SceneGraph)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphConfig {
    /// Test node bounding spheres against the camera frustum
    pub enable_frustum_culling: bool,

    /// Ask the occlusion query whether a node is hidden
    pub enable_occlusion_culling: bool,

    /// Group visible mesh nodes into render batches
    pub enable_batching: bool,

    /// Global multiplier applied to camera distance before LOD selection
    pub lod_bias: f32,

    /// Maximum view distance; `0` or less disables distance culling
    pub culling_distance: f32,

    /// Upper bound on nodes per render batch
    pub max_batch_size: usize,

    /// Overflow policy for groups larger than `max_batch_size`
    pub batch_overflow: BatchOverflow,
}

impl Default for SceneGraphConfig {
    fn default() -> Self {
        Self {
            enable_frustum_culling: true,
            enable_occlusion_culling: false,
            enable_batching: true,
            lod_bias: 1.0,
            culling_distance: 0.0,
            max_batch_size: 100,
            batch_overflow: BatchOverflow::default(),
        }
    }
}

impl Config for SceneGraphConfig {}
