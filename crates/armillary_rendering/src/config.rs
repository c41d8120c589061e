//! Viewer configuration.
//!
//! Loaded from TOML; every section and every field is optional.
//!
//! ```toml
//! [synchronizer]
//! ground_color = [0.0, 1.0, 0.0]
//! auto_geometry_scale = 0.5
//! camera_reset = "never"
//!
//! [window]
//! title = "pendulums"
//! width = 800
//! height = 600
//! ```

use crate::error::ConfigError;
use armillary_shared::{Color, Real};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When the synchronizer refits the camera on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraResetPolicy {
    /// After persistent or dynamic-line attachments and explicit requests
    #[default]
    OnPersistentChange,
    /// Also whenever a frame draws ephemeral geometry
    OnAnyChange,
    /// Only on explicit requests
    Never,
}

/// Configuration for the frame synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynchronizerConfig {
    /// Default color of ground
    pub ground_color: Color,
    /// Default color of bodies attached directly to ground
    pub base_body_color: Color,
    /// Default color of every other body
    pub body_color: Color,
    /// Default color of dynamic lines
    pub rubber_band_color: Color,
    /// Size multiplier for generated frames and markers; 0 disables them
    pub auto_geometry_scale: Real,
    /// Camera refit policy
    pub camera_reset: CameraResetPolicy,
    /// Attach the system's own topology geometry at construction
    pub include_system_geometry: bool,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            ground_color: Color::GREEN,
            base_body_color: Color::RED,
            body_color: Color::GRAY,
            rubber_band_color: Color::BLACK,
            auto_geometry_scale: 1.0,
            camera_reset: CameraResetPolicy::default(),
            include_system_geometry: true,
        }
    }
}

/// Configuration for the host window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Inner width in pixels
    pub width: u32,
    /// Inner height in pixels
    pub height: u32,
    /// Clear color
    pub background: Color,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Armillary".to_string(),
            width: 1200,
            height: 900,
            background: Color::WHITE,
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Synchronizer section
    pub synchronizer: SynchronizerConfig,
    /// Window section
    pub window: WindowConfig,
}

impl ViewerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML, `Invalid` for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `Invalid` describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = self.synchronizer.auto_geometry_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "auto_geometry_scale must be finite and >= 0, got {scale}"
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.synchronizer.ground_color, Color::GREEN);
        assert_eq!(config.synchronizer.base_body_color, Color::RED);
        assert_eq!(config.synchronizer.body_color, Color::GRAY);
        assert_eq!(config.synchronizer.rubber_band_color, Color::BLACK);
        assert_eq!(config.synchronizer.camera_reset, CameraResetPolicy::OnPersistentChange);
        assert_eq!((config.window.width, config.window.height), (1200, 900));
        assert_eq!(config.window.background, Color::WHITE);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(ViewerConfig::from_toml_str("").unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [synchronizer]
            body_color = [0.0, 0.0, 1.0]
            camera_reset = "never"
            auto_geometry_scale = 0.0

            [window]
            width = 640
            "#,
        )
        .unwrap();
        assert_eq!(config.synchronizer.body_color, Color::BLUE);
        assert_eq!(config.synchronizer.camera_reset, CameraResetPolicy::Never);
        assert_eq!(config.synchronizer.auto_geometry_scale, 0.0);
        assert_eq!(config.synchronizer.ground_color, Color::GREEN);
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 900);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ViewerConfig::from_toml_str("[window]\nheight = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ViewerConfig::from_toml_str("[synchronizer]\nauto_geometry_scale = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ViewerConfig::from_toml_str("[window\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ViewerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
