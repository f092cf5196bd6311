//! Stress run configuration.

use std::path::Path;

use collisions::{QuadTreeConfig, Rectangle};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StressConfig {
    #[serde(default)]
    pub tree: QuadTreeConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl StressConfig {
    /// Load configuration from `stress.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("stress.toml"))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.tree.validate()?;
        Ok(config)
    }
}

/// Area covered by the tree.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f32,
    #[serde(default = "default_world_size")]
    pub height: f32,
}

impl WorldConfig {
    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
        }
    }
}

/// Thread counts and workload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Threads issuing area queries.
    #[serde(default = "default_readers")]
    pub readers: usize,
    /// Threads cycling their own points in and out of the tree.
    #[serde(default = "default_writers")]
    pub writers: usize,
    /// How long writers keep cycling, in milliseconds.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_points_per_writer")]
    pub points_per_writer: usize,
    /// Seed for point placement and query areas.
    #[serde(default)]
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            readers: default_readers(),
            writers: default_writers(),
            duration_ms: default_duration_ms(),
            points_per_writer: default_points_per_writer(),
            seed: 0,
        }
    }
}

fn default_world_size() -> f32 {
    1024.0
}
fn default_readers() -> usize {
    4
}
fn default_writers() -> usize {
    4
}
fn default_duration_ms() -> u64 {
    2000
}
fn default_points_per_writer() -> usize {
    256
}
