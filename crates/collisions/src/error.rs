//! Configuration error types.

use thiserror::Error;

/// Errors raised while building a quadtree or its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Element limit must be at least 1")]
    ZeroElementLimit,

    #[error("Merge watermark ({merge_watermark}) must be below the element limit ({element_limit})")]
    WatermarkNotBelowLimit {
        element_limit: usize,
        merge_watermark: usize,
    },

    #[error("Invalid root bounds: {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },

    #[error("Invalid root origin: ({x}, {y})")]
    InvalidOrigin { x: f32, y: f32 },

    #[error("Failed to parse quadtree config: {0}")]
    Parse(#[from] toml::de::Error),
}
