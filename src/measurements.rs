//! Anthropometric measurements from pose landmarks.
//!
//! Every measurement is derived from a pair of visible landmarks: a planar
//! pixel distance scaled by the calibration ratio. The three circumferences
//! are not measured at all; they are a linear distance times an empirical
//! multiplier from [`MeasurementConfig`].
//!
//! Missing landmarks only drop the measurements that need them. A frame with
//! no pose, or with malformed landmark data, yields a [`MeasurementSet`] with
//! `pose_detected == false` and an `error` message instead of failing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::{Calibration, SharedCalibration};
use crate::config::MeasurementConfig;
use crate::error::{Error, Result};
use crate::pose::LandmarkSource;
use crate::types::{FrameSize, KeypointName, Point};

/// The closed catalogue of body measurements, all in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    ShoulderBreadth,
    StandingHeight,
    ArmSpan,
    LeftUpperArmLength,
    RightUpperArmLength,
    LeftForearmLength,
    RightForearmLength,
    LeftThighLength,
    RightThighLength,
    LeftLowerLegLength,
    RightLowerLegLength,
    ChestCircumference,
    WaistCircumference,
    HeadCircumference,
}

impl Measurement {
    pub const COUNT: usize = 14;

    pub const ALL: [Measurement; Self::COUNT] = [
        Self::ShoulderBreadth,
        Self::StandingHeight,
        Self::ArmSpan,
        Self::LeftUpperArmLength,
        Self::RightUpperArmLength,
        Self::LeftForearmLength,
        Self::RightForearmLength,
        Self::LeftThighLength,
        Self::RightThighLength,
        Self::LeftLowerLegLength,
        Self::RightLowerLegLength,
        Self::ChestCircumference,
        Self::WaistCircumference,
        Self::HeadCircumference,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShoulderBreadth => "shoulder_breadth",
            Self::StandingHeight => "standing_height",
            Self::ArmSpan => "arm_span",
            Self::LeftUpperArmLength => "left_upper_arm_length",
            Self::RightUpperArmLength => "right_upper_arm_length",
            Self::LeftForearmLength => "left_forearm_length",
            Self::RightForearmLength => "right_forearm_length",
            Self::LeftThighLength => "left_thigh_length",
            Self::RightThighLength => "right_thigh_length",
            Self::LeftLowerLegLength => "left_lower_leg_length",
            Self::RightLowerLegLength => "right_lower_leg_length",
            Self::ChestCircumference => "chest_circumference",
            Self::WaistCircumference => "waist_circumference",
            Self::HeadCircumference => "head_circumference",
        }
    }

    /// Short human-readable description for display.
    pub fn description(self) -> &'static str {
        match self {
            Self::ShoulderBreadth => {
                "Distance between left and right shoulder landmarks (biacromial breadth)"
            }
            Self::StandingHeight => "Estimated height from head top to ankle",
            Self::ArmSpan => "Distance from left fingertip to right fingertip (estimated)",
            Self::LeftUpperArmLength => "Distance from left shoulder to left elbow",
            Self::RightUpperArmLength => "Distance from right shoulder to right elbow",
            Self::LeftForearmLength => "Distance from left elbow to left wrist",
            Self::RightForearmLength => "Distance from right elbow to right wrist",
            Self::LeftThighLength => "Distance from left hip to left knee",
            Self::RightThighLength => "Distance from right hip to right knee",
            Self::LeftLowerLegLength => "Distance from left knee to left ankle",
            Self::RightLowerLegLength => "Distance from right knee to right ankle",
            Self::ChestCircumference => "Estimated chest circumference based on shoulder breadth",
            Self::WaistCircumference => "Estimated waist circumference based on hip width",
            Self::HeadCircumference => "Estimated head circumference based on head width",
        }
    }

    /// Landmarks the formula reads.
    ///
    /// Standing height needs the nose and at least one of the two ankles.
    pub fn keypoints(self) -> &'static [KeypointName] {
        use KeypointName::*;
        match self {
            Self::ShoulderBreadth | Self::ChestCircumference => &[LeftShoulder, RightShoulder],
            Self::StandingHeight => &[Nose, LeftAnkle, RightAnkle],
            Self::ArmSpan => &[LeftWrist, RightWrist],
            Self::LeftUpperArmLength => &[LeftShoulder, LeftElbow],
            Self::RightUpperArmLength => &[RightShoulder, RightElbow],
            Self::LeftForearmLength => &[LeftElbow, LeftWrist],
            Self::RightForearmLength => &[RightElbow, RightWrist],
            Self::LeftThighLength => &[LeftHip, LeftKnee],
            Self::RightThighLength => &[RightHip, RightKnee],
            Self::LeftLowerLegLength => &[LeftKnee, LeftAnkle],
            Self::RightLowerLegLength => &[RightKnee, RightAnkle],
            Self::WaistCircumference => &[LeftHip, RightHip],
            Self::HeadCircumference => &[LeftEar, RightEar],
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name to description lookup for every measurement in the catalogue.
pub fn measurement_descriptions() -> BTreeMap<Measurement, &'static str> {
    Measurement::ALL
        .iter()
        .map(|m| (*m, m.description()))
        .collect()
}

/// Round to `digits` decimal places.
///
/// Rounds the exact binary value, with exact ties going to the even digit:
/// 1.25 becomes 1.2, while 0.35 (stored just below) becomes 0.3. Scaling by a
/// power of ten first would perturb values that sit near a tie.
pub(crate) fn round_to(value: f64, digits: usize) -> f64 {
    format!("{value:.digits$}").parse().unwrap_or(value)
}

pub(crate) fn round1(value: f64) -> f64 {
    round_to(value, 1)
}

/// Measurements for one frame, plus detection metadata.
///
/// Serializes to a flat JSON object: one key per present measurement, then
/// `pose_detected` and whichever metadata fields apply. Absent measurements
/// are omitted, never null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSet {
    #[serde(flatten)]
    values: BTreeMap<Measurement, f64>,

    #[serde(default)]
    pub pose_detected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_note: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MeasurementSet {
    /// Parse an externally supplied set, e.g. `{"shoulder_breadth": 42.5, "pose_detected": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// A detected-pose set from externally supplied values.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (Measurement, f64)>,
    {
        Self {
            values: values.into_iter().collect(),
            pose_detected: true,
            ..Self::default()
        }
    }

    /// A failed frame carrying the reason.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn get(&self, measurement: Measurement) -> Option<f64> {
        self.values.get(&measurement).copied()
    }

    pub fn contains(&self, measurement: Measurement) -> bool {
        self.values.contains_key(&measurement)
    }

    pub fn insert(&mut self, measurement: Measurement, value: f64) -> Option<f64> {
        self.values.insert(measurement, value)
    }

    pub fn remove(&mut self, measurement: Measurement) -> Option<f64> {
        self.values.remove(&measurement)
    }

    /// Number of measurement values (metadata excluded).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Measurement, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }
}

/// Resolves landmarks for one frame into pixel-space points.
struct FrameGeometry<'a, P: ?Sized> {
    pose: &'a P,
    frame: FrameSize,
    calibration: Calibration,
    config: &'a MeasurementConfig,
}

impl<P: LandmarkSource + ?Sized> FrameGeometry<'_, P> {
    /// Pixel position of a landmark, or `None` when it is missing or not visible enough.
    fn locate(&self, name: KeypointName) -> Result<Option<Point>> {
        let Some(kp) = self.pose.keypoint(name) else {
            return Ok(None);
        };
        // Occluded landmarks are absent, whatever their coordinates hold
        if !kp.is_visible(self.config.visibility_threshold) {
            return Ok(None);
        }
        kp.validate(name)?;
        Ok(Some(self.frame.denormalize(&kp)))
    }

    /// Planar distance between two landmarks in cm.
    ///
    /// A zero pixel distance means the provider collapsed both points onto
    /// one spot, and is treated as missing.
    fn segment(&self, a: KeypointName, b: KeypointName) -> Result<Option<f64>> {
        let (Some(pa), Some(pb)) = (self.locate(a)?, self.locate(b)?) else {
            return Ok(None);
        };
        let pixels = pa.distance(&pb);
        if pixels > 0.0 {
            Ok(Some(self.calibration.to_cm(pixels)))
        } else {
            Ok(None)
        }
    }

    /// Head top is estimated from the nose by a fixed offset; the ground is
    /// whichever visible ankle sits lower in the image.
    fn standing_height(&self) -> Result<Option<f64>> {
        let Some(nose) = self.locate(KeypointName::Nose)? else {
            return Ok(None);
        };
        let left = self.locate(KeypointName::LeftAnkle)?;
        let right = self.locate(KeypointName::RightAnkle)?;
        let ankle = match (left, right) {
            (Some(l), Some(r)) if l.y > r.y => l,
            (_, Some(r)) => r,
            (Some(l), None) => l,
            (None, None) => return Ok(None),
        };

        let head_top_y = nose.y - self.calibration.to_pixels(self.config.head_top_offset_cm);
        let span = ankle.y - head_top_y;
        if span > 0.0 {
            Ok(Some(self.calibration.to_cm(span)))
        } else {
            Ok(None)
        }
    }

    fn measure(&self, measurement: Measurement) -> Result<Option<f64>> {
        use KeypointName::*;
        let cfg = self.config;
        let value = match measurement {
            Measurement::ShoulderBreadth => self.segment(LeftShoulder, RightShoulder)?,
            Measurement::StandingHeight => self.standing_height()?,
            Measurement::ArmSpan => self
                .segment(LeftWrist, RightWrist)?
                .map(|d| d + cfg.hand_span_cm),
            Measurement::LeftUpperArmLength => self.segment(LeftShoulder, LeftElbow)?,
            Measurement::RightUpperArmLength => self.segment(RightShoulder, RightElbow)?,
            Measurement::LeftForearmLength => self.segment(LeftElbow, LeftWrist)?,
            Measurement::RightForearmLength => self.segment(RightElbow, RightWrist)?,
            Measurement::LeftThighLength => self.segment(LeftHip, LeftKnee)?,
            Measurement::RightThighLength => self.segment(RightHip, RightKnee)?,
            Measurement::LeftLowerLegLength => self.segment(LeftKnee, LeftAnkle)?,
            Measurement::RightLowerLegLength => self.segment(RightKnee, RightAnkle)?,
            Measurement::ChestCircumference => self
                .segment(LeftShoulder, RightShoulder)?
                .map(|d| d * cfg.chest_multiplier),
            Measurement::WaistCircumference => self
                .segment(LeftHip, RightHip)?
                .map(|d| d * cfg.waist_multiplier),
            Measurement::HeadCircumference => self
                .segment(LeftEar, RightEar)?
                .map(|d| d * cfg.head_multiplier),
        };
        Ok(value)
    }
}

/// Computes [`MeasurementSet`]s from pose landmarks.
///
/// The engine owns its calibration ratio. It can be shared across threads
/// (`&self` everywhere); [`set_calibration`](Self::set_calibration) swaps the
/// ratio atomically.
#[derive(Debug)]
pub struct MeasurementEngine {
    config: MeasurementConfig,
    calibration: SharedCalibration,
}

impl MeasurementEngine {
    /// Engine with the default constants and the uncalibrated default ratio.
    pub fn new() -> Self {
        let config = MeasurementConfig::default();
        Self {
            calibration: SharedCalibration::default(),
            config,
        }
    }

    pub fn with_config(config: MeasurementConfig) -> Result<Self> {
        config.validate()?;
        let calibration = SharedCalibration::new(config.calibration()?);
        Ok(Self { config, calibration })
    }

    /// The constants the engine was built with.
    ///
    /// `pixel_to_cm_ratio` here is the construction-time ratio and is not
    /// updated by [`set_calibration`](Self::set_calibration); use
    /// [`calibration`](Self::calibration) for the live value.
    pub fn config(&self) -> &MeasurementConfig {
        &self.config
    }

    /// The ratio measurements currently use.
    pub fn calibration(&self) -> Calibration {
        self.calibration.get()
    }

    /// Set the cm-per-pixel ratio. Returns `false` and keeps the current
    /// ratio if `ratio` is not a positive number.
    pub fn set_calibration(&self, ratio: f64) -> bool {
        let accepted = self.calibration.set(ratio);
        if accepted {
            info!("Calibration set to {} cm per pixel", ratio);
        } else {
            warn!("Rejected calibration ratio {}", ratio);
        }
        accepted
    }

    /// Measure a frame with the engine's current calibration.
    ///
    /// Never fails: a missing pose or malformed landmark data comes back as a
    /// set with `pose_detected == false` and `error` filled in.
    pub fn compute_measurements<P>(&self, pose: Option<&P>, frame: FrameSize) -> MeasurementSet
    where
        P: LandmarkSource + ?Sized,
    {
        match self.try_compute_measurements(pose, frame) {
            Ok(set) => set,
            Err(Error::NoPose) => MeasurementSet::failed(Error::NoPose.to_string()),
            Err(e) => {
                warn!("Error calculating anthropometric measurements: {}", e);
                MeasurementSet::failed(e.to_string())
            }
        }
    }

    pub fn try_compute_measurements<P>(&self, pose: Option<&P>, frame: FrameSize) -> Result<MeasurementSet>
    where
        P: LandmarkSource + ?Sized,
    {
        let pose = pose.ok_or(Error::NoPose)?;
        self.measure(pose, frame, self.calibration())
    }

    /// Measure a frame with an explicit calibration, ignoring the stored one.
    pub fn measure<P>(&self, pose: &P, frame: FrameSize, calibration: Calibration) -> Result<MeasurementSet>
    where
        P: LandmarkSource + ?Sized,
    {
        frame.validate()?;
        let geometry = FrameGeometry {
            pose,
            frame,
            calibration,
            config: &self.config,
        };

        let mut values = BTreeMap::new();
        for measurement in Measurement::ALL {
            if let Some(value) = geometry.measure(measurement)? {
                values.insert(measurement, round1(value));
            }
        }

        debug!(
            count = values.len(),
            width = frame.width,
            height = frame.height,
            "computed measurements"
        );

        Ok(MeasurementSet {
            values,
            pose_detected: true,
            timestamp: Some(Utc::now()),
            calibration_note: Some(calibration.note()),
            error: None,
        })
    }
}

impl Default for MeasurementEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmarks;
    use crate::types::Keypoint;

    const FRAME: FrameSize = FrameSize::new(640, 480);

    /// A standing figure in a 640x480 frame, every landmark well visible.
    fn standing_pose() -> Landmarks {
        let kp = |x, y| Keypoint::new(x, y, 0.0, 0.8);
        let mut points = vec![kp(0.5, 0.5); KeypointName::COUNT];
        points[KeypointName::Nose.index()] = kp(0.5, 0.1);
        points[KeypointName::LeftEar.index()] = kp(0.45, 0.1);
        points[KeypointName::RightEar.index()] = kp(0.55, 0.1);
        points[KeypointName::LeftShoulder.index()] = kp(0.4, 0.3);
        points[KeypointName::RightShoulder.index()] = kp(0.6, 0.3);
        points[KeypointName::LeftElbow.index()] = kp(0.3, 0.4);
        points[KeypointName::RightElbow.index()] = kp(0.7, 0.4);
        points[KeypointName::LeftWrist.index()] = kp(0.2, 0.5);
        points[KeypointName::RightWrist.index()] = kp(0.8, 0.5);
        points[KeypointName::LeftHip.index()] = kp(0.45, 0.6);
        points[KeypointName::RightHip.index()] = kp(0.55, 0.6);
        points[KeypointName::LeftKnee.index()] = kp(0.45, 0.75);
        points[KeypointName::RightKnee.index()] = kp(0.55, 0.75);
        points[KeypointName::LeftAnkle.index()] = kp(0.45, 0.9);
        points[KeypointName::RightAnkle.index()] = kp(0.55, 0.9);
        Landmarks::from_indexed(&points)
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("measurement missing");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn full_pose_measurements() {
        let engine = MeasurementEngine::new();
        let set = engine.compute_measurements(Some(&standing_pose()), FRAME);

        assert!(set.pose_detected);
        assert!(set.error.is_none());
        assert!(set.timestamp.is_some());
        assert_eq!(set.len(), Measurement::COUNT);

        // Shoulders (256,144)-(384,144): 128 px
        approx(set.get(Measurement::ShoulderBreadth), 12.8);
        approx(set.get(Measurement::ChestCircumference), 30.7);
        // Nose y=48, ankles y=432, head top 100 px above the nose
        approx(set.get(Measurement::StandingHeight), 48.4);
        // Wrists 384 px apart plus two hands
        approx(set.get(Measurement::ArmSpan), 74.4);
        // 64/48 px legs of a 3-4-5 triangle
        approx(set.get(Measurement::LeftUpperArmLength), 8.0);
        approx(set.get(Measurement::RightForearmLength), 8.0);
        approx(set.get(Measurement::LeftThighLength), 7.2);
        approx(set.get(Measurement::RightLowerLegLength), 7.2);
        // Hips 64 px apart
        approx(set.get(Measurement::WaistCircumference), 17.9);
        // Ears 64 px apart
        approx(set.get(Measurement::HeadCircumference), 20.1);
    }

    #[test]
    fn no_pose_is_reported_as_data() {
        let engine = MeasurementEngine::new();
        let set = engine.compute_measurements(None::<&Landmarks>, FRAME);
        assert!(!set.pose_detected);
        assert_eq!(set.error.as_deref(), Some("No pose detected in frame"));
        assert!(set.is_empty());
        assert!(set.timestamp.is_none());
    }

    #[test]
    fn malformed_keypoint_is_reported_as_data() {
        let mut pose = standing_pose();
        pose.get_mut(KeypointName::LeftShoulder).unwrap().x = f64::NAN;

        let engine = MeasurementEngine::new();
        let set = engine.compute_measurements(Some(&pose), FRAME);
        assert!(!set.pose_detected);
        assert!(set.error.unwrap().contains("left_shoulder"));

        assert!(matches!(
            engine.try_compute_measurements(Some(&pose), FRAME),
            Err(Error::InvalidKeypoint { name: KeypointName::LeftShoulder, .. })
        ));
    }

    #[test]
    fn zero_sized_frame_is_reported_as_data() {
        let engine = MeasurementEngine::new();
        let set = engine.compute_measurements(Some(&standing_pose()), FrameSize::new(0, 0));
        assert!(!set.pose_detected);
        assert!(set.error.is_some());
    }

    #[test]
    fn low_visibility_drops_dependent_measurements_only() {
        let engine = MeasurementEngine::new();
        let baseline = engine.compute_measurements(Some(&standing_pose()), FRAME);

        let mut pose = standing_pose();
        pose.get_mut(KeypointName::LeftElbow).unwrap().visibility = 0.3;
        let set = engine.compute_measurements(Some(&pose), FRAME);

        assert!(!set.contains(Measurement::LeftUpperArmLength));
        assert!(!set.contains(Measurement::LeftForearmLength));
        assert_eq!(set.len(), Measurement::COUNT - 2);
        for (m, v) in set.iter() {
            assert_eq!(baseline.get(m), Some(v), "{m} changed");
        }
    }

    #[test]
    fn hiding_each_landmark_drops_exactly_its_measurements() {
        let engine = MeasurementEngine::new();
        let baseline = engine.compute_measurements(Some(&standing_pose()), FRAME);

        for name in KeypointName::ALL {
            let mut pose = standing_pose();
            pose.get_mut(name).unwrap().visibility = 0.2;
            let set = engine.compute_measurements(Some(&pose), FRAME);
            assert!(set.pose_detected);

            for m in Measurement::ALL {
                let needed = match m {
                    // Either ankle will do; both sit at the same height here
                    Measurement::StandingHeight => name == KeypointName::Nose,
                    _ => m.keypoints().contains(&name),
                };
                if needed {
                    assert!(!set.contains(m), "{m} kept without {name}");
                } else {
                    assert_eq!(set.get(m), baseline.get(m), "{m} changed without {name}");
                }
            }
        }
    }

    #[test]
    fn occluded_landmark_with_garbage_coordinates_is_absent() {
        let engine = MeasurementEngine::new();
        let baseline = engine.compute_measurements(Some(&standing_pose()), FRAME);

        let mut pose = standing_pose();
        pose.insert(KeypointName::LeftWrist, Keypoint::new(f64::NAN, f64::NAN, 0.0, 0.1));
        pose.insert(KeypointName::RightWrist, Keypoint::new(0.8, 0.5, 0.0, f64::NAN));
        let set = engine.compute_measurements(Some(&pose), FRAME);

        assert!(set.pose_detected);
        assert!(set.error.is_none());
        assert!(!set.contains(Measurement::ArmSpan));
        assert!(!set.contains(Measurement::LeftForearmLength));
        assert!(!set.contains(Measurement::RightForearmLength));
        for m in [
            Measurement::ShoulderBreadth,
            Measurement::ChestCircumference,
            Measurement::WaistCircumference,
            Measurement::StandingHeight,
        ] {
            assert_eq!(set.get(m), baseline.get(m), "{m} changed");
        }
    }

    #[test]
    fn depth_does_not_affect_measurements() {
        let engine = MeasurementEngine::new();
        let baseline = engine.compute_measurements(Some(&standing_pose()), FRAME);

        let mut pose = standing_pose();
        pose.get_mut(KeypointName::LeftShoulder).unwrap().z = f64::NAN;
        let set = engine.compute_measurements(Some(&pose), FRAME);

        assert!(set.pose_detected);
        assert!(set.iter().eq(baseline.iter()));
    }

    #[test]
    fn standing_height_uses_lower_ankle() {
        let engine = MeasurementEngine::new();
        let mut pose = standing_pose();
        // Left ankle lower in the image (larger y): 0.95 * 480 = 456
        pose.get_mut(KeypointName::LeftAnkle).unwrap().y = 0.95;
        let set = engine.compute_measurements(Some(&pose), FRAME);
        approx(set.get(Measurement::StandingHeight), 50.8);

        // Only one ankle visible
        pose.get_mut(KeypointName::LeftAnkle).unwrap().visibility = 0.1;
        let set = engine.compute_measurements(Some(&pose), FRAME);
        approx(set.get(Measurement::StandingHeight), 48.4);
    }

    #[test]
    fn standing_height_needs_an_ankle_and_the_nose() {
        let engine = MeasurementEngine::new();
        let mut pose = standing_pose();
        pose.remove(KeypointName::LeftAnkle);
        pose.remove(KeypointName::RightAnkle);
        let set = engine.compute_measurements(Some(&pose), FRAME);
        assert!(!set.contains(Measurement::StandingHeight));

        let mut pose = standing_pose();
        pose.remove(KeypointName::Nose);
        let set = engine.compute_measurements(Some(&pose), FRAME);
        assert!(!set.contains(Measurement::StandingHeight));
        assert!(set.contains(Measurement::ShoulderBreadth));
    }

    #[test]
    fn coincident_landmarks_are_omitted() {
        let engine = MeasurementEngine::new();
        let mut pose = standing_pose();
        let left = pose.keypoint(KeypointName::LeftHip).unwrap();
        pose.insert(KeypointName::RightHip, left);
        let set = engine.compute_measurements(Some(&pose), FRAME);
        assert!(!set.contains(Measurement::WaistCircumference));
        assert!(set.contains(Measurement::LeftThighLength));
    }

    #[test]
    fn calibration_updates_and_rejections() {
        let engine = MeasurementEngine::new();
        assert!(!engine.set_calibration(-1.0));
        assert!(!engine.set_calibration(0.0));
        assert_eq!(engine.calibration().cm_per_pixel(), 0.1);

        assert!(engine.set_calibration(0.2));
        assert_eq!(engine.calibration().cm_per_pixel(), 0.2);
        // Config keeps the construction-time ratio
        assert_eq!(engine.config().pixel_to_cm_ratio, 0.1);
        let set = engine.compute_measurements(Some(&standing_pose()), FRAME);
        approx(set.get(Measurement::ShoulderBreadth), 25.6);
        assert!(set.calibration_note.unwrap().contains("0.2"));
    }

    #[test]
    fn config_constants_flow_into_formulas() {
        let config = MeasurementConfig {
            chest_multiplier: 3.0,
            hand_span_cm: 0.0,
            ..MeasurementConfig::default()
        };
        let engine = MeasurementEngine::with_config(config).unwrap();
        let set = engine.compute_measurements(Some(&standing_pose()), FRAME);
        approx(set.get(Measurement::ChestCircumference), 38.4);
        approx(set.get(Measurement::ArmSpan), 38.4);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = MeasurementConfig {
            pixel_to_cm_ratio: 0.0,
            ..MeasurementConfig::default()
        };
        assert!(MeasurementEngine::with_config(config).is_err());
    }

    #[test]
    fn serializes_flat_and_omits_absent_values() {
        let mut pose = standing_pose();
        pose.remove(KeypointName::LeftEar);
        let engine = MeasurementEngine::new();
        let set = engine.compute_measurements(Some(&pose), FRAME);

        let json = serde_json::to_value(&set).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["shoulder_breadth"], serde_json::json!(12.8));
        assert_eq!(obj["pose_detected"], serde_json::json!(true));
        assert!(obj.contains_key("timestamp"));
        assert!(obj.contains_key("calibration_note"));
        assert!(!obj.contains_key("head_circumference"));
        assert!(!obj.contains_key("error"));

        let back: MeasurementSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn external_set_rejects_unknown_keys() {
        let ok = MeasurementSet::from_json(r#"{"shoulder_breadth": 40, "pose_detected": true}"#).unwrap();
        assert_eq!(ok.get(Measurement::ShoulderBreadth), Some(40.0));
        assert!(ok.pose_detected);

        let bad = MeasurementSet::from_json(r#"{"shoulder_bredth": 40.0}"#);
        assert!(matches!(bad, Err(Error::Json(_))));
    }

    #[test]
    fn descriptions_cover_the_catalogue() {
        let descriptions = measurement_descriptions();
        assert_eq!(descriptions.len(), Measurement::COUNT);
        assert!(descriptions.values().all(|d| !d.is_empty()));
        assert!(descriptions[&Measurement::StandingHeight].contains("head top"));
    }

    #[test]
    fn rounding() {
        assert_eq!(round1(30.72), 30.7);
        assert_eq!(round1(20.096), 20.1);
        assert_eq!(round1(0.0), 0.0);
        // Exact tie goes to the even digit
        assert_eq!(round1(1.25), 1.2);
        assert_eq!(round1(1.75), 1.8);
        // Stored just below the tie
        assert_eq!(round1(0.35), 0.3);
        assert_eq!(round_to(0.125, 2), 0.12);
    }

    #[test]
    fn half_decimal_measurement_rounds_to_even() {
        // Shoulders 12.5 px apart: exactly 1.25 cm at 0.1 cm/px
        let kp = |x| Keypoint::new(x, 0.3, 0.0, 0.9);
        let pose = Landmarks::new()
            .with(KeypointName::LeftShoulder, kp(0.5))
            .with(KeypointName::RightShoulder, kp(0.51953125));
        let set = MeasurementEngine::new().compute_measurements(Some(&pose), FRAME);
        approx(set.get(Measurement::ShoulderBreadth), 1.2);
    }
}
