//! # percent-body
//!
//! Anthropometric body measurements from pose landmarks, and a
//! multi-indicator sex estimate built on them.
//!
//! This crate provides:
//! - **Measurement Engine**: shoulder breadth, standing height, arm span, limb
//!   segments, and estimated circumferences from 33 normalized pose landmarks
//! - **Calibration**: a single cm-per-pixel ratio, adjustable at runtime
//! - **Sex Predictor**: seven weighted indicators (absolute sizes and body
//!   proportions) combined into a label, confidence, and certainty
//!
//! ## Pipeline Overview
//!
//! 1. A pose provider reports landmarks in `[0, 1]` frame coordinates
//! 2. Visible landmarks are scaled to pixels, paired, and measured
//! 3. Pixel distances become centimeters through the calibration ratio
//! 4. Each indicator is evaluated against sex-specific thresholds
//! 5. Weighted votes are normalized into male and female scores
//!
//! All numbers are population heuristics. Without a real calibration the
//! absolute values are only approximate, and the prediction is an estimate.
//!
//! ## Quick Start
//!
//! ```rust
//! use percent_body::{
//!     FrameSize, Keypoint, KeypointName, Landmarks, MeasurementEngine, SexPredictor,
//! };
//!
//! let kp = |x, y| Keypoint::new(x, y, 0.0, 0.9);
//! let landmarks = Landmarks::new()
//!     .with(KeypointName::LeftShoulder, kp(0.55, 0.30))
//!     .with(KeypointName::RightShoulder, kp(0.45, 0.30));
//!
//! let engine = MeasurementEngine::new();
//! let measurements = engine.compute_measurements(Some(&landmarks), FrameSize::new(640, 480));
//! println!("{:?}", measurements.get(percent_body::Measurement::ShoulderBreadth));
//!
//! let prediction = SexPredictor::new().predict(&measurements);
//! println!("{}", prediction.explain());
//! ```
//!
//! ## Custom Pose Providers
//!
//! Implement the [`LandmarkSource`] trait for your provider's output type:
//!
//! ```rust
//! use percent_body::{Keypoint, KeypointName, LandmarkSource};
//!
//! struct MyPose { /* ... */ }
//!
//! impl LandmarkSource for MyPose {
//!     fn keypoint(&self, name: KeypointName) -> Option<Keypoint> {
//!         // Return the normalized landmark, or None if not reported
//!         None
//!     }
//! }
//! ```

mod calibration;
mod config;
mod error;
mod indicators;
mod measurements;
mod pose;
mod predictor;
mod types;

pub use calibration::{Calibration, SharedCalibration, DEFAULT_PIXEL_TO_CM_RATIO};
pub use config::MeasurementConfig;
pub use error::{Error, Result};
pub use indicators::{
    CutoffThresholds, Indicator, IndicatorEvaluation, SexLabel, Thresholds, TypicalRule,
    TypicalThresholds, OVERLAP_CONFIDENCE,
};
pub use measurements::{measurement_descriptions, Measurement, MeasurementEngine, MeasurementSet};
pub use pose::{LandmarkFrame, LandmarkSource, Landmarks, PoseLandmarks};
pub use predictor::{estimate_hip_width, Prediction, PredictionLabel, Ratios, Scores, SexPredictor};
pub use types::{FrameSize, Keypoint, KeypointName, Point};
