//! Persistent session settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PoseWranglerError, Result};
use crate::network::{SolverConfig, SolverMode};

/// Hyperparameters given to newly created solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverDefaults {
    pub mode: SolverMode,
    pub radius: f64,
    pub automatic_radius: bool,
    pub weight_threshold: f64,
}

impl Default for SolverDefaults {
    fn default() -> Self {
        let config = SolverConfig::default();
        Self {
            mode: config.mode,
            radius: config.radius,
            automatic_radius: config.automatic_radius,
            weight_threshold: config.weight_threshold,
        }
    }
}

impl SolverDefaults {
    pub fn apply(&self, config: &mut SolverConfig) {
        config.mode = self.mode;
        config.radius = self.radius;
        config.automatic_radius = self.automatic_radius;
        config.weight_threshold = self.weight_threshold;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mirror mapping document; the MetaHuman mapping is used when unset.
    pub mirror_mapping_file: Option<PathBuf>,
    pub default_solver: SolverDefaults,
    /// First frame written by pose baking.
    pub bake_start_frame: i32,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| PoseWranglerError::io(path, e))?;
        let settings = serde_json::from_str(&json)?;
        log::debug!("Loaded settings from '{}'", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| PoseWranglerError::io(path, e))
    }
}
