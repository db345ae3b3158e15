use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::indicators::{Indicator, IndicatorEvaluation, SexLabel};
use crate::measurements::{round1, round_to, Measurement, MeasurementSet};

const METHODOLOGY: &str = "Multi-indicator anthropometric analysis";
const NOTE: &str =
    "Prediction based on established patterns of sexual dimorphism in human body measurements";

/// Hip width is not measured directly; it is backed out of the waist
/// circumference estimate.
const WAIST_TO_HIP_WIDTH: f64 = 3.5;

/// Present and non-zero. A zero value cannot divide or be divided meaningfully.
fn nonzero(set: &MeasurementSet, m: Measurement) -> Option<f64> {
    set.get(m).filter(|v| *v != 0.0)
}

fn round3(value: f64) -> f64 {
    round_to(value, 3)
}

/// Estimated hip width (cm) from the waist circumference.
///
/// The waist circumference is itself hip-keypoint distance times an empirical
/// multiplier, so errors compound through both factors.
pub fn estimate_hip_width(set: &MeasurementSet) -> Option<f64> {
    nonzero(set, Measurement::WaistCircumference).map(|waist| waist / WAIST_TO_HIP_WIDTH)
}

/// The four dimensionless body-proportion ratios. Each is `None` when an
/// input is missing or zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    pub shoulder_hip_ratio: Option<f64>,
    pub armspan_height_ratio: Option<f64>,
    pub head_height_ratio: Option<f64>,
    pub upperarm_forearm_ratio: Option<f64>,
}

impl Ratios {
    pub fn from_measurements(set: &MeasurementSet) -> Self {
        let height = nonzero(set, Measurement::StandingHeight);
        let ratio = |num: Option<f64>, den: Option<f64>| Some(num? / den?);

        let left_arm = ratio(
            nonzero(set, Measurement::LeftUpperArmLength),
            nonzero(set, Measurement::LeftForearmLength),
        );
        let right_arm = ratio(
            nonzero(set, Measurement::RightUpperArmLength),
            nonzero(set, Measurement::RightForearmLength),
        );

        Self {
            shoulder_hip_ratio: ratio(
                nonzero(set, Measurement::ShoulderBreadth),
                estimate_hip_width(set),
            ),
            armspan_height_ratio: ratio(nonzero(set, Measurement::ArmSpan), height),
            head_height_ratio: ratio(nonzero(set, Measurement::HeadCircumference), height),
            // Left side first, right side as fallback
            upperarm_forearm_ratio: left_arm.or(right_arm),
        }
    }

    /// The ratio backing a ratio indicator; `None` for the absolute ones.
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::ShoulderHipRatio => self.shoulder_hip_ratio,
            Indicator::ArmspanHeightRatio => self.armspan_height_ratio,
            Indicator::HeadHeightRatio => self.head_height_ratio,
            Indicator::UpperarmForearmRatio => self.upperarm_forearm_ratio,
            Indicator::ShoulderBreadth | Indicator::StandingHeight | Indicator::HeadCircumference => None,
        }
    }
}

/// Final label of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionLabel {
    Male,
    Female,
    Uncertain,
    InsufficientData,
    Error,
}

impl PredictionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Uncertain => "uncertain",
            Self::InsufficientData => "insufficient_data",
            Self::Error => "error",
        }
    }
}

/// Normalized weighted scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub male: f64,
    pub female: f64,
}

/// The outcome of one [`SexPredictor::predict`] call. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: PredictionLabel,
    pub confidence: f64,
    pub certainty: f64,
    pub scores: Scores,
    /// Indicators whose backing value was present
    pub indicators_used: usize,
    pub total_possible_indicators: usize,
    pub indicator_details: BTreeMap<Indicator, IndicatorEvaluation>,
    pub ratios_calculated: Ratios,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Prediction {
    fn failed(message: String) -> Self {
        Self {
            prediction: PredictionLabel::Error,
            confidence: 0.0,
            certainty: 0.0,
            scores: Scores::default(),
            indicators_used: 0,
            total_possible_indicators: Indicator::COUNT,
            indicator_details: BTreeMap::new(),
            ratios_calculated: Ratios::default(),
            methodology: None,
            note: None,
            error: Some(message),
        }
    }

    /// Human-readable summary of the prediction and every indicator vote.
    pub fn explain(&self) -> String {
        match self.prediction {
            PredictionLabel::Error => {
                return format!(
                    "Error in prediction: {}",
                    self.error.as_deref().unwrap_or("Unknown error")
                );
            }
            PredictionLabel::InsufficientData => {
                return "Insufficient anthropometric data available for reliable sex prediction."
                    .to_string();
            }
            _ => {}
        }

        let mut s = String::new();
        let _ = writeln!(s, "Prediction: {}", self.prediction.as_str().to_uppercase());
        let _ = writeln!(s, "Confidence: {:.1}%", self.confidence * 100.0);
        let _ = writeln!(s, "Certainty: {:.1}%", self.certainty * 100.0);
        let _ = writeln!(s, "Based on {} anthropometric indicators", self.indicators_used);

        s.push_str("\nKey indicators:\n");
        for (indicator, eval) in &self.indicator_details {
            let value = if indicator.is_ratio() {
                format!("{:.3}", eval.value)
            } else {
                format!("{:.1}cm", eval.value)
            };
            let _ = writeln!(
                s,
                "• {}: {} → {} ({:.1}%)",
                indicator.title(),
                value,
                eval.prediction,
                eval.confidence * 100.0
            );
        }

        s.push_str("\nNote: This prediction is based on established patterns of sexual dimorphism ");
        s.push_str("in human anthropometry and should be interpreted as an estimate only.");
        s
    }
}

/// Weighted multi-indicator sex estimate from body measurements.
///
/// Thresholds and weights are fixed tables (see [`Indicator`]); the predictor
/// itself carries no state and can be shared freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct SexPredictor;

impl SexPredictor {
    pub fn new() -> Self {
        Self
    }

    /// Weight of every indicator, summing to 1.0.
    pub fn indicator_weights(&self) -> BTreeMap<Indicator, f64> {
        Indicator::ALL.iter().map(|i| (*i, i.weight())).collect()
    }

    pub fn calculate_ratios(&self, set: &MeasurementSet) -> Ratios {
        Ratios::from_measurements(set)
    }

    pub fn evaluate_indicator(&self, indicator: Indicator, value: f64) -> IndicatorEvaluation {
        indicator.evaluate(value)
    }

    /// Predict from a measurement set. Never fails: invalid input comes back
    /// as a prediction labelled `error`.
    pub fn predict(&self, set: &MeasurementSet) -> Prediction {
        self.try_predict(set).unwrap_or_else(|e| {
            warn!("Error in sex prediction: {}", e);
            Prediction::failed(e.to_string())
        })
    }

    pub fn try_predict(&self, set: &MeasurementSet) -> Result<Prediction> {
        for (name, value) in set.iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidMeasurement { name, value });
            }
        }

        let ratios = self.calculate_ratios(set);

        let mut details = BTreeMap::new();
        let mut male_score = 0.0;
        let mut female_score = 0.0;
        // Every evaluated indicator counts here, including uncertain ones,
        // which therefore dilute both normalized scores.
        let mut total_weight = 0.0;

        for indicator in Indicator::ALL {
            let value = match indicator {
                Indicator::ShoulderBreadth => set.get(Measurement::ShoulderBreadth),
                Indicator::StandingHeight => set.get(Measurement::StandingHeight),
                Indicator::HeadCircumference => set.get(Measurement::HeadCircumference),
                _ => ratios.get(indicator),
            };
            let Some(value) = value else {
                continue;
            };

            let eval = self.evaluate_indicator(indicator, value);
            let weight = indicator.weight();
            match eval.prediction {
                SexLabel::Male => male_score += weight * eval.confidence,
                SexLabel::Female => female_score += weight * eval.confidence,
                SexLabel::Uncertain => {}
            }
            total_weight += weight;
            details.insert(indicator, eval);
        }

        let (label, confidence, certainty, scores) = if total_weight > 0.0 {
            let male = male_score / total_weight;
            let female = female_score / total_weight;
            let (label, confidence) = if male > female {
                (PredictionLabel::Male, male)
            } else if female > male {
                (PredictionLabel::Female, female)
            } else {
                (PredictionLabel::Uncertain, 0.5)
            };
            let certainty = ((male - female).abs() + 0.5).min(1.0);
            (label, confidence, certainty, Scores { male, female })
        } else {
            (PredictionLabel::InsufficientData, 0.0, 0.0, Scores::default())
        };

        debug!(
            prediction = label.as_str(),
            indicators = details.len(),
            "sex prediction complete"
        );

        Ok(Prediction {
            prediction: label,
            confidence: round3(confidence),
            certainty: round3(certainty),
            scores: Scores {
                male: round3(scores.male),
                female: round3(scores.female),
            },
            indicators_used: details.len(),
            total_possible_indicators: Indicator::COUNT,
            indicator_details: details,
            ratios_calculated: ratios,
            methodology: Some(METHODOLOGY.to_string()),
            note: Some(NOTE.to_string()),
            error: None,
        })
    }

    /// Plausible bust circumference range (cm) as `(min, max)`.
    ///
    /// Needs shoulder breadth plus waist circumference or standing height.
    pub fn estimate_bust_circumference_range(&self, set: &MeasurementSet) -> Option<(f64, f64)> {
        let shoulder = nonzero(set, Measurement::ShoulderBreadth)?;
        let waist = nonzero(set, Measurement::WaistCircumference);
        let height = nonzero(set, Measurement::StandingHeight);
        if waist.is_none() && height.is_none() {
            return None;
        }

        let mut base = shoulder * 2.2;
        if let Some(waist) = waist {
            base += (waist - 70.0) * 0.25;
        }
        if let Some(height) = height {
            base += (160.0 - height) * 0.15;
        }

        Some((round1(base * 0.95), round1(base * 1.05)))
    }
}
