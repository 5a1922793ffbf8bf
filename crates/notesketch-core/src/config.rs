//! Canvas configuration.

use crate::color::InkColor;
use crate::history::{MAX_HISTORY_BYTES, MAX_UNDO_HISTORY};
use crate::surface::Viewport;
use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings a [`StrokeCanvas`](crate::StrokeCanvas) starts with.
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```json
/// { "default_tool": "marker", "default_color": "#2563eb" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Tool selected when the canvas is created.
    pub default_tool: ToolKind,
    /// Ink color selected when the canvas is created.
    pub default_color: InkColor,
    /// Maximum number of undo snapshots kept per drawing.
    pub max_history: usize,
    /// Cap on the pixel bytes the undo snapshots may hold together.
    pub max_history_bytes: usize,
    /// Initial viewport until the host reports the real one.
    pub viewport: Viewport,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            default_tool: ToolKind::Pen,
            default_color: InkColor::CHARCOAL,
            max_history: MAX_UNDO_HISTORY,
            max_history_bytes: MAX_HISTORY_BYTES,
            viewport: Viewport::default(),
        }
    }
}

impl CanvasConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::debug!("Loaded canvas config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MAX_SURFACE_DIMENSION;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CanvasConfig::from_json(r##"{ "default_tool": "marker", "default_color": "#2563eb" }"##).unwrap();
        assert_eq!(config.default_tool, ToolKind::Marker);
        assert_eq!(config.default_color, InkColor::new(0x25, 0x63, 0xeb, 255));
        assert_eq!(config.max_history, MAX_UNDO_HISTORY);
        assert_eq!(config.max_history_bytes, MAX_HISTORY_BYTES);
    }

    #[test]
    fn test_unknown_tool_is_rejected() {
        let result = CanvasConfig::from_json(r#"{ "default_tool": "lasso" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        let config = CanvasConfig {
            max_history: 5,
            ..CanvasConfig::default()
        };
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        assert_eq!(CanvasConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_oversized_viewport_is_clamped() {
        let config =
            CanvasConfig::from_json(r#"{ "viewport": { "width": 1e12, "height": 600, "scale_factor": 4 } }"#).unwrap();
        let (width, height) = config.viewport.pixel_size();
        assert_eq!(width, MAX_SURFACE_DIMENSION);
        assert_eq!(height, 2400);
    }

    #[test]
    fn test_missing_file() {
        let result = CanvasConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
