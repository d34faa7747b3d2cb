/// Transform parameters for a resize
///
/// These values describe one output of the codec engine: how wide,
/// how compressed, and in which format. They are serialized to JSON
/// for display and seeded from the stored settings record.

use serde::{Deserialize, Serialize};

use crate::codec::format::OutputFormat;
use crate::error::{Error, Result};

/// Default output width in pixels
pub const DEFAULT_TARGET_WIDTH: u32 = 400;

/// Default encoder quality
pub const DEFAULT_QUALITY: f32 = 0.6;

/// Parameters for a single transform
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TransformParameters {
    /// Output width in pixels (UI range 50 to 1200, step 50)
    /// - Height is always derived from the source aspect ratio
    pub target_width: u32,

    /// Lossy encoder fidelity in (0, 1] (UI range 0.1 to 1.0, step 0.1)
    /// - Higher = larger, less compressed output
    /// - Ignored by PNG
    pub quality: f32,

    /// Output encoding
    pub format: OutputFormat,
}

impl Default for TransformParameters {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::Jpeg,
        }
    }
}

impl TransformParameters {
    pub fn new(target_width: u32, quality: f32, format: OutputFormat) -> Self {
        Self {
            target_width,
            quality,
            format,
        }
    }

    /// Check the engine preconditions: width > 0, quality in (0, 1]
    pub fn validate(&self) -> Result<()> {
        if self.target_width == 0 {
            return Err(Error::InvalidParameters(
                "target width must be positive".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(Error::InvalidParameters(format!(
                "quality {} is outside (0, 1]",
                self.quality
            )));
        }
        Ok(())
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = TransformParameters::default();
        assert_eq!(params.target_width, 400);
        assert_eq!(params.format, OutputFormat::Jpeg);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(TransformParameters::new(1, 1.0, OutputFormat::Png).validate().is_ok());
        assert!(TransformParameters::new(5000, 0.01, OutputFormat::Webp).validate().is_ok());
        assert!(TransformParameters::new(0, 0.5, OutputFormat::Jpeg).validate().is_err());
        assert!(TransformParameters::new(100, 1.5, OutputFormat::Jpeg).validate().is_err());
        assert!(TransformParameters::new(100, f32::NAN, OutputFormat::Jpeg).validate().is_err());
    }

    #[test]
    fn test_serialization() {
        let params = TransformParameters::new(850, 0.3, OutputFormat::Webp);

        let json = params.to_json().unwrap();
        assert!(json.contains("\"webp\""));

        let restored = TransformParameters::from_json(&json).unwrap();
        assert_eq!(params, restored);
    }
}
