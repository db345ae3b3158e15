use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{Calibration, DEFAULT_PIXEL_TO_CM_RATIO};
use crate::error::{Error, Result};

/// Tunable constants for the measurement engine.
///
/// The multipliers are empirical body-proportion heuristics, not physical
/// constants. Every field has a default so a config file may set only what
/// it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// cm per pixel at the working camera distance
    #[serde(default = "default_pixel_to_cm_ratio")]
    pub pixel_to_cm_ratio: f64,
    /// Keypoints at or below this visibility are treated as absent
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f64,
    /// Nose to top of head (cm)
    #[serde(default = "default_head_top_offset_cm")]
    pub head_top_offset_cm: f64,
    /// Two hand lengths added to the wrist-to-wrist span (cm)
    #[serde(default = "default_hand_span_cm")]
    pub hand_span_cm: f64,
    /// Chest circumference = shoulder breadth x this
    #[serde(default = "default_chest_multiplier")]
    pub chest_multiplier: f64,
    /// Waist circumference = hip keypoint distance x this
    #[serde(default = "default_waist_multiplier")]
    pub waist_multiplier: f64,
    /// Head circumference = ear-to-ear distance x this
    #[serde(default = "default_head_multiplier")]
    pub head_multiplier: f64,
}

fn default_pixel_to_cm_ratio() -> f64 {
    DEFAULT_PIXEL_TO_CM_RATIO
}

fn default_visibility_threshold() -> f64 {
    0.5
}

fn default_head_top_offset_cm() -> f64 {
    10.0
}

fn default_hand_span_cm() -> f64 {
    36.0
}

fn default_chest_multiplier() -> f64 {
    2.4
}

fn default_waist_multiplier() -> f64 {
    2.8
}

fn default_head_multiplier() -> f64 {
    3.14
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            pixel_to_cm_ratio: default_pixel_to_cm_ratio(),
            visibility_threshold: default_visibility_threshold(),
            head_top_offset_cm: default_head_top_offset_cm(),
            hand_span_cm: default_hand_span_cm(),
            chest_multiplier: default_chest_multiplier(),
            waist_multiplier: default_waist_multiplier(),
            head_multiplier: default_head_multiplier(),
        }
    }
}

impl MeasurementConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The configured ratio as a validated calibration.
    pub fn calibration(&self) -> Result<Calibration> {
        Calibration::new(self.pixel_to_cm_ratio)
    }

    /// Check every constant so that produced measurements stay non-negative.
    pub fn validate(&self) -> Result<()> {
        self.calibration()?;
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(Error::InvalidConfig(format!(
                "visibility_threshold must be between 0.0 and 1.0, got {}",
                self.visibility_threshold
            )));
        }
        let non_negative = [
            ("head_top_offset_cm", self.head_top_offset_cm),
            ("hand_span_cm", self.hand_span_cm),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig(format!("{name} must be >= 0, got {value}")));
            }
        }
        let positive = [
            ("chest_multiplier", self.chest_multiplier),
            ("waist_multiplier", self.waist_multiplier),
            ("head_multiplier", self.head_multiplier),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidConfig(format!("{name} must be > 0, got {value}")));
            }
        }
        Ok(())
    }
}
