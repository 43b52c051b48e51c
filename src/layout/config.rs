//! Configuration for the layout engine

use serde::Deserialize;

/// Configuration options for constraint resolution
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between edge-anchored peers when an element sets none
    pub default_gap: f64,

    /// Container padding when a container sets none
    pub default_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_gap: 10.0,
            default_padding: 0.0,
        }
    }
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default gap between peers
    pub fn with_default_gap(mut self, gap: f64) -> Self {
        self.default_gap = gap;
        self
    }

    /// Set the default container padding
    pub fn with_default_padding(mut self, padding: f64) -> Self {
        self.default_padding = padding;
        self
    }
}
