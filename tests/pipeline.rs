//! End-to-end tests: landmarks -> measurements -> prediction -> explanation.

use percent_body::{
    FrameSize, Indicator, Keypoint, KeypointName, LandmarkFrame, Landmarks, Measurement,
    MeasurementEngine, MeasurementSet, PredictionLabel, SexLabel, SexPredictor,
};

const FRAME: FrameSize = FrameSize::new(640, 480);

fn standing_pose() -> Landmarks {
    use KeypointName::*;
    let kp = |x, y| Keypoint::new(x, y, 0.0, 0.9);
    Landmarks::new()
        .with(Nose, kp(0.5, 0.1))
        .with(LeftEar, kp(0.45, 0.1))
        .with(RightEar, kp(0.55, 0.1))
        .with(LeftShoulder, kp(0.4, 0.3))
        .with(RightShoulder, kp(0.6, 0.3))
        .with(LeftElbow, kp(0.3, 0.4))
        .with(RightElbow, kp(0.7, 0.4))
        .with(LeftWrist, kp(0.2, 0.5))
        .with(RightWrist, kp(0.8, 0.5))
        .with(LeftHip, kp(0.45, 0.6))
        .with(RightHip, kp(0.55, 0.6))
        .with(LeftKnee, kp(0.45, 0.75))
        .with(RightKnee, kp(0.55, 0.75))
        .with(LeftAnkle, kp(0.45, 0.9))
        .with(RightAnkle, kp(0.55, 0.9))
}

fn is_one_decimal(value: f64) -> bool {
    ((value * 10.0).round() - value * 10.0).abs() < 1e-6
}

#[test]
fn landmarks_to_explanation() {
    let engine = MeasurementEngine::new();
    assert!(engine.set_calibration(0.33));

    let measurements = engine.compute_measurements(Some(&standing_pose()), FRAME);
    assert!(measurements.pose_detected);
    assert_eq!(measurements.len(), Measurement::COUNT);
    // 128 px shoulders at 0.33 cm/px
    assert!((measurements.get(Measurement::ShoulderBreadth).unwrap() - 42.2).abs() < 1e-9);

    let prediction = SexPredictor::new().predict(&measurements);
    assert_eq!(prediction.indicators_used, prediction.indicator_details.len());
    assert_eq!(
        prediction.indicator_details[&Indicator::ShoulderBreadth].prediction,
        SexLabel::Male
    );
    assert!(matches!(
        prediction.prediction,
        PredictionLabel::Male | PredictionLabel::Female | PredictionLabel::Uncertain
    ));

    let text = prediction.explain();
    assert!(text.contains("Key indicators:"));
    assert!(text.contains("Shoulder Breadth: 42.2cm"));
}

#[test]
fn frame_json_pipeline() {
    let json = r#"{
        "width": 640,
        "height": 480,
        "landmarks": {
            "left_shoulder": {"x": 0.4, "y": 0.3, "z": 0.0, "visibility": 0.9},
            "right_shoulder": {"x": 0.6, "y": 0.3, "z": 0.0, "visibility": 0.9}
        }
    }"#;
    let frame: LandmarkFrame = serde_json::from_str(json).unwrap();

    let engine = MeasurementEngine::new();
    let measurements = engine.compute_measurements(frame.landmarks.as_ref(), frame.size());
    assert!((measurements.get(Measurement::ShoulderBreadth).unwrap() - 12.8).abs() < 1e-9);
    assert!((measurements.get(Measurement::ChestCircumference).unwrap() - 30.7).abs() < 1e-9);
    assert_eq!(measurements.len(), 2);

    // Serialized measurements feed the predictor the same way
    let serialized = serde_json::to_string(&measurements).unwrap();
    let restored: MeasurementSet = serde_json::from_str(&serialized).unwrap();
    let predictor = SexPredictor::new();
    assert_eq!(predictor.predict(&restored), predictor.predict(&measurements));
}

#[test]
fn no_person_in_frame() {
    let frame: LandmarkFrame =
        serde_json::from_str(r#"{"width": 640, "height": 480, "landmarks": null}"#).unwrap();
    let measurements = MeasurementEngine::new().compute_measurements(frame.landmarks.as_ref(), frame.size());
    assert!(!measurements.pose_detected);

    let prediction = SexPredictor::new().predict(&measurements);
    assert_eq!(prediction.prediction, PredictionLabel::InsufficientData);
    assert_eq!(prediction.confidence, 0.0);
}

#[test]
fn detected_pose_with_no_values() {
    let measurements = MeasurementSet::from_json(r#"{"pose_detected": true}"#).unwrap();
    let prediction = SexPredictor::new().predict(&measurements);
    assert_eq!(prediction.prediction, PredictionLabel::InsufficientData);
    assert_eq!(prediction.confidence, 0.0);
    assert_eq!(prediction.indicators_used, 0);
}

#[test]
fn repeated_calls_give_identical_values() {
    let engine = MeasurementEngine::new();
    let pose = standing_pose();
    let first = engine.compute_measurements(Some(&pose), FRAME);
    let second = engine.compute_measurements(Some(&pose), FRAME);
    assert!(first.iter().eq(second.iter()));
    assert_eq!(first.calibration_note, second.calibration_note);
}

#[test]
fn doubling_calibration_doubles_segments() {
    let pose = standing_pose();
    let engine = MeasurementEngine::new();
    let base = engine.compute_measurements(Some(&pose), FRAME);
    assert!(engine.set_calibration(0.2));
    let doubled = engine.compute_measurements(Some(&pose), FRAME);

    for m in [
        Measurement::ShoulderBreadth,
        Measurement::LeftUpperArmLength,
        Measurement::RightForearmLength,
        Measurement::LeftThighLength,
        Measurement::RightLowerLegLength,
    ] {
        let a = base.get(m).unwrap();
        let b = doubled.get(m).unwrap();
        assert!((b - 2.0 * a).abs() < 1e-9, "{m}: {a} -> {b}");
    }
}

#[test]
fn produced_values_are_non_negative_and_one_decimal() {
    let engine = MeasurementEngine::new();
    for ratio in [0.05, 0.1, 0.137, 0.33, 1.0] {
        assert!(engine.set_calibration(ratio));
        let set = engine.compute_measurements(Some(&standing_pose()), FRAME);
        for (m, value) in set.iter() {
            assert!(value >= 0.0, "{m} negative at ratio {ratio}");
            assert!(is_one_decimal(value), "{m} = {value} at ratio {ratio}");
        }
    }
}

#[test]
fn confidence_stays_in_bounds() {
    let predictor = SexPredictor::new();
    for shoulder in [20.0, 34.0, 37.0, 40.0, 55.0] {
        for height in [0.0, 120.0, 165.0, 172.0, 210.0] {
            for waist in [0.0, 50.0, 85.0, 140.0] {
                let set = MeasurementSet::from_values([
                    (Measurement::ShoulderBreadth, shoulder),
                    (Measurement::StandingHeight, height),
                    (Measurement::WaistCircumference, waist),
                    (Measurement::ArmSpan, height * 1.02),
                    (Measurement::HeadCircumference, 56.0),
                ]);
                let p = predictor.predict(&set);
                assert!((0.0..=1.0).contains(&p.confidence));
                assert!((0.0..=1.0).contains(&p.certainty));
                assert!((0.0..=1.0).contains(&p.scores.male));
                assert!((0.0..=1.0).contains(&p.scores.female));
                for eval in p.indicator_details.values() {
                    assert!((0.0..=1.0).contains(&eval.confidence));
                }
            }
        }
    }
}

#[test]
fn calibration_shared_across_threads() {
    let engine = MeasurementEngine::new();
    let pose = standing_pose();

    std::thread::scope(|s| {
        s.spawn(|| assert!(engine.set_calibration(0.2)));
        for _ in 0..4 {
            s.spawn(|| {
                let set = engine.compute_measurements(Some(&pose), FRAME);
                let shoulder = set.get(Measurement::ShoulderBreadth).unwrap();
                assert!(shoulder == 12.8 || shoulder == 25.6, "torn read: {shoulder}");
            });
        }
    });

    assert_eq!(engine.calibration().cm_per_pixel(), 0.2);
}

#[test]
fn rejected_calibration_keeps_previous() {
    let engine = MeasurementEngine::new();
    assert!(!engine.set_calibration(-1.0));
    assert!(!engine.set_calibration(0.0));
    assert_eq!(engine.calibration().cm_per_pixel(), 0.1);
}
