//! Pixel-to-length calibration.
//!
//! All measurements are a pixel distance times a cm-per-pixel ratio. The
//! default ratio is an uncalibrated guess; callers are expected to measure a
//! reference object at the working camera distance and set the real value.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default cm per pixel. Uncalibrated.
pub const DEFAULT_PIXEL_TO_CM_RATIO: f64 = 0.1;

/// A validated, strictly positive cm-per-pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Calibration(f64);

impl Calibration {
    pub fn new(cm_per_pixel: f64) -> Result<Self> {
        if cm_per_pixel.is_finite() && cm_per_pixel > 0.0 {
            Ok(Self(cm_per_pixel))
        } else {
            Err(Error::InvalidCalibration(cm_per_pixel))
        }
    }

    pub fn cm_per_pixel(self) -> f64 {
        self.0
    }

    pub fn to_cm(self, pixels: f64) -> f64 {
        pixels * self.0
    }

    pub fn to_pixels(self, cm: f64) -> f64 {
        cm / self.0
    }

    /// Disclaimer attached to every measurement set.
    pub fn note(self) -> String {
        format!(
            "Measurements use pixel-to-cm ratio of {}. Calibration recommended for accuracy.",
            self.0
        )
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self(DEFAULT_PIXEL_TO_CM_RATIO)
    }
}

impl TryFrom<f64> for Calibration {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Calibration> for f64 {
    fn from(c: Calibration) -> Self {
        c.0
    }
}

/// A calibration ratio that can be swapped while other threads read it.
///
/// The ratio is stored as raw `f64` bits in an atomic, so readers never block
/// and always observe either the old or the new value.
#[derive(Debug)]
pub struct SharedCalibration {
    bits: AtomicU64,
}

impl SharedCalibration {
    pub fn new(initial: Calibration) -> Self {
        Self {
            bits: AtomicU64::new(initial.cm_per_pixel().to_bits()),
        }
    }

    pub fn get(&self) -> Calibration {
        Calibration(f64::from_bits(self.bits.load(Ordering::Acquire)))
    }

    /// Replace the stored ratio. Non-positive or non-finite values are
    /// rejected and leave the current ratio in place.
    pub fn set(&self, cm_per_pixel: f64) -> bool {
        match Calibration::new(cm_per_pixel) {
            Ok(c) => {
                self.bits.store(c.cm_per_pixel().to_bits(), Ordering::Release);
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for SharedCalibration {
    fn default() -> Self {
        Self::new(Calibration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_ratios() {
        assert!(Calibration::new(0.0).is_err());
        assert!(Calibration::new(-0.1).is_err());
        assert!(Calibration::new(f64::NAN).is_err());
        assert!(Calibration::new(f64::INFINITY).is_err());
        assert!(Calibration::new(0.2).is_ok());
    }

    #[test]
    fn converts_both_ways() {
        let c = Calibration::new(0.1).unwrap();
        assert!((c.to_cm(128.0) - 12.8).abs() < 1e-9);
        assert!((c.to_pixels(10.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn shared_set_and_reject() {
        let shared = SharedCalibration::default();
        assert_eq!(shared.get().cm_per_pixel(), DEFAULT_PIXEL_TO_CM_RATIO);

        assert!(shared.set(0.2));
        assert_eq!(shared.get().cm_per_pixel(), 0.2);

        assert!(!shared.set(0.0));
        assert!(!shared.set(-1.0));
        assert_eq!(shared.get().cm_per_pixel(), 0.2);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Calibration = serde_json::from_str("0.33").unwrap();
        assert_eq!(ok.cm_per_pixel(), 0.33);
        assert!(serde_json::from_str::<Calibration>("-2.0").is_err());
    }

    #[test]
    fn note_mentions_ratio() {
        let note = Calibration::new(0.25).unwrap().note();
        assert!(note.contains("0.25"));
        assert!(note.contains("Calibration recommended"));
    }
}
