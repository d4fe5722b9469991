use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vista_render::CameraDefaults;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid scene config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Scene and timing parameters for the demo commands, loaded from YAML.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraDefaults,
    /// Entities per side of the square grid.
    pub grid_size: usize,
    /// Distance between neighbouring grid entities.
    pub grid_spacing: f32,
    pub ticks: u64,
    /// Frames the simulated GPU fence stays busy after each new snapshot.
    pub gpu_latency_frames: u32,
    /// Sleep between simulation ticks, in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraDefaults::default(),
            grid_size: 16,
            grid_spacing: 3.0,
            ticks: 120,
            gpu_latency_frames: 2,
            tick_interval_ms: 1,
        }
    }
}

impl SceneConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a YAML config. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
