//! Quadtree configuration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::geom::Rectangle;

/// Subdivision and merge policy shared by every quadtree variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuadTreeConfig {
    /// Maximum elements a leaf holds before it subdivides.
    #[serde(default = "default_element_limit")]
    pub element_limit: usize,
    /// Subtree element count at or below which four children collapse back
    /// into their parent. Must be strictly below `element_limit`.
    #[serde(default)]
    pub merge_watermark: usize,
    /// Deepest level a node may subdivide to. The root is depth 0.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl QuadTreeConfig {
    /// Create a config with the default max depth.
    pub fn new(element_limit: usize, merge_watermark: usize) -> Self {
        Self {
            element_limit,
            merge_watermark,
            max_depth: default_max_depth(),
        }
    }

    /// Override the maximum subdivision depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a config from a TOML document and validate it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        debug!(
            "Parsed quadtree config: limit={} watermark={} max_depth={}",
            config.element_limit, config.merge_watermark, config.max_depth
        );
        Ok(config)
    }

    /// Reject configurations that would never subdivide or would thrash
    /// between subdividing and merging.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.element_limit == 0 {
            return Err(ConfigError::ZeroElementLimit);
        }
        if self.merge_watermark >= self.element_limit {
            return Err(ConfigError::WatermarkNotBelowLimit {
                element_limit: self.element_limit,
                merge_watermark: self.merge_watermark,
            });
        }
        Ok(())
    }
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            element_limit: default_element_limit(),
            merge_watermark: 0,
            max_depth: default_max_depth(),
        }
    }
}

fn default_element_limit() -> usize {
    4
}
fn default_max_depth() -> usize {
    16
}

/// Check that a root quadrant covers a real, finite area.
pub(crate) fn validate_bounds(bounds: &Rectangle) -> Result<(), ConfigError> {
    if !bounds.x.is_finite() || !bounds.y.is_finite() {
        return Err(ConfigError::InvalidOrigin {
            x: bounds.x,
            y: bounds.y,
        });
    }
    // Written so that NaN fails too.
    if !(bounds.width > 0.0 && bounds.height > 0.0)
        || !bounds.width.is_finite()
        || !bounds.height.is_finite()
    {
        return Err(ConfigError::InvalidBounds {
            width: bounds.width,
            height: bounds.height,
        });
    }
    Ok(())
}
