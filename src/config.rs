//! Pipeline configuration

use crate::error::{Result, RoundTripError};
use crate::storage::FileFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paint radius, in samples, used when none is configured
pub const DEFAULT_BRUSH_RADIUS: u32 = 20;

/// Number of labels painted when none is configured
pub const DEFAULT_LABEL_COUNT: u32 = 4;

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory the label file is written to
    pub output_dir: PathBuf,

    /// Raster format of the label file
    pub file_format: FileFormat,

    /// Appended to the input name to name the reduced volume
    pub grey_suffix: String,

    /// Appended to the reduced volume's name to name the label volume
    pub label_suffix: String,

    /// Labels `1..=label_count` are painted
    pub label_count: u32,

    /// Brush radius in samples
    pub brush_radius: u32,

    /// Canvas `(width, height)`; the image's in-plane extent when absent
    pub canvas: Option<(u32, u32)>,

    /// Slice the strokes are painted on
    pub paint_slice: usize,

    /// Write a JSON geometry header next to the raster
    pub write_sidecar: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir(),
            file_format: FileFormat::Png,
            grey_suffix: "_grey".to_string(),
            label_suffix: "-label".to_string(),
            label_count: DEFAULT_LABEL_COUNT,
            brush_radius: DEFAULT_BRUSH_RADIUS,
            canvas: None,
            paint_slice: 0,
            write_sidecar: true,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_output_dir(mut self, output_dir: impl AsRef<Path>) -> Self {
        self.output_dir = output_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_label_count(mut self, label_count: u32) -> Self {
        self.label_count = label_count;
        self
    }

    pub fn with_brush_radius(mut self, brush_radius: u32) -> Self {
        self.brush_radius = brush_radius;
        self
    }

    pub fn with_canvas(mut self, width: u32, height: u32) -> Self {
        self.canvas = Some((width, height));
        self
    }

    pub fn with_paint_slice(mut self, paint_slice: usize) -> Self {
        self.paint_slice = paint_slice;
        self
    }

    pub fn with_sidecar(mut self, write_sidecar: bool) -> Self {
        self.write_sidecar = write_sidecar;
        self
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.label_count == 0 {
            return Err(RoundTripError::Configuration(
                "label_count must be at least 1".to_string(),
            ));
        }
        if self.label_count > u32::from(u8::MAX) {
            return Err(RoundTripError::Configuration(format!(
                "label_count {} does not fit unsigned char labels",
                self.label_count
            )));
        }
        if self.brush_radius == 0 {
            return Err(RoundTripError::Configuration(
                "brush_radius must be at least 1".to_string(),
            ));
        }
        if let Some((width, height)) = self.canvas {
            if width == 0 || height == 0 {
                return Err(RoundTripError::Configuration(format!(
                    "canvas {}x{} has no area",
                    width, height
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.label_count, 4);
        assert_eq!(config.brush_radius, 20);
        assert_eq!(config.label_suffix, "-label");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(PipelineConfig::new().with_label_count(0).validate().is_err());
        assert!(PipelineConfig::new().with_label_count(256).validate().is_err());
        assert!(PipelineConfig::new().with_brush_radius(0).validate().is_err());
        assert!(PipelineConfig::new().with_canvas(0, 10).validate().is_err());
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "brush_radius": 5, "canvas": [120, 120] }"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.brush_radius, 5);
        assert_eq!(config.canvas, Some((120, 120)));
        assert_eq!(config.label_count, DEFAULT_LABEL_COUNT);
        assert_eq!(config.file_format, FileFormat::Png);
    }

    #[test]
    fn test_from_json_file_validates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "label_count": 0 }"#).unwrap();
        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, RoundTripError::Configuration(_)));
    }
}
