//! Sexual-dimorphism indicators and their threshold tables.
//!
//! Each indicator maps one value (a measurement in cm or a dimensionless
//! ratio) to a [`SexLabel`] and a confidence in [0, 1]. Two evaluation styles
//! exist and are kept distinct:
//!
//! - **Cutoff**: a male minimum and a female maximum. Values past either
//!   cutoff score a base confidence plus a linear bonus; values between the
//!   cutoffs are `uncertain` at a fixed 0.3.
//! - **Typical value**: male and female typical values. Arm span / height
//!   picks the nearer typical value; the other two split at the midpoint.
//!
//! Thresholds are approximate literature values and are not population
//! calibrated.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-indicator outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SexLabel {
    Male,
    Female,
    Uncertain,
}

impl SexLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for SexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence assigned to any value inside an overlap zone.
pub const OVERLAP_CONFIDENCE: f64 = 0.3;

/// Male-minimum / female-maximum cutoffs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffThresholds {
    pub male_min: f64,
    pub female_max: f64,
    /// Confidence right at a cutoff
    pub base_confidence: f64,
    /// Distance past a cutoff that adds 1.0 to the confidence
    pub scale: f64,
    /// Informational; classification only uses the two cutoffs
    pub overlap_zone: (f64, f64),
}

impl CutoffThresholds {
    pub fn evaluate(&self, value: f64) -> (SexLabel, f64) {
        if value >= self.male_min {
            let confidence = ((value - self.male_min) / self.scale + self.base_confidence).min(1.0);
            (SexLabel::Male, confidence)
        } else if value <= self.female_max {
            let confidence = ((self.female_max - value) / self.scale + self.base_confidence).min(1.0);
            (SexLabel::Female, confidence)
        } else {
            (SexLabel::Uncertain, OVERLAP_CONFIDENCE)
        }
    }
}

/// How a typical-value indicator decides between the two labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypicalRule {
    /// Nearer typical value wins (ties go female);
    /// confidence = max(0.5, 1 - distance / scale).
    Nearest { scale: f64 },
    /// At or above the midpoint is male; confidence is the distance from the
    /// opposite typical value / scale + 0.5, capped at 1.
    Midpoint { scale: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypicalThresholds {
    pub male_typical: f64,
    pub female_typical: f64,
    pub rule: TypicalRule,
    /// Informational
    pub overlap_zone: (f64, f64),
}

impl TypicalThresholds {
    pub fn evaluate(&self, value: f64) -> (SexLabel, f64) {
        match self.rule {
            TypicalRule::Nearest { scale } => {
                let male_distance = (value - self.male_typical).abs();
                let female_distance = (value - self.female_typical).abs();
                if male_distance < female_distance {
                    (SexLabel::Male, (1.0 - male_distance / scale).max(0.5))
                } else {
                    (SexLabel::Female, (1.0 - female_distance / scale).max(0.5))
                }
            }
            TypicalRule::Midpoint { scale } => {
                let midpoint = (self.male_typical + self.female_typical) / 2.0;
                if value >= midpoint {
                    let confidence = ((value - self.female_typical) / scale + 0.5).min(1.0);
                    (SexLabel::Male, confidence)
                } else {
                    let confidence = ((self.male_typical - value) / scale + 0.5).min(1.0);
                    (SexLabel::Female, confidence)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thresholds {
    Cutoff(CutoffThresholds),
    Typical(TypicalThresholds),
}

impl Thresholds {
    pub fn evaluate(&self, value: f64) -> (SexLabel, f64) {
        match self {
            Self::Cutoff(t) => t.evaluate(value),
            Self::Typical(t) => t.evaluate(value),
        }
    }
}

const SHOULDER_BREADTH: CutoffThresholds = CutoffThresholds {
    male_min: 38.0,
    female_max: 36.0,
    base_confidence: 0.6,
    scale: 5.0,
    overlap_zone: (34.0, 40.0),
};

const STANDING_HEIGHT: CutoffThresholds = CutoffThresholds {
    male_min: 165.0,
    female_max: 170.0,
    base_confidence: 0.5,
    scale: 15.0,
    overlap_zone: (155.0, 180.0),
};

const HEAD_CIRCUMFERENCE: CutoffThresholds = CutoffThresholds {
    male_min: 56.0,
    female_max: 55.0,
    base_confidence: 0.6,
    scale: 3.0,
    overlap_zone: (53.0, 58.0),
};

const SHOULDER_HIP_RATIO: CutoffThresholds = CutoffThresholds {
    male_min: 1.35,
    female_max: 1.25,
    base_confidence: 0.6,
    scale: 0.2,
    overlap_zone: (1.20, 1.40),
};

const ARMSPAN_HEIGHT_RATIO: TypicalThresholds = TypicalThresholds {
    male_typical: 1.03,
    female_typical: 1.00,
    rule: TypicalRule::Nearest { scale: 0.05 },
    overlap_zone: (0.95, 1.08),
};

const HEAD_HEIGHT_RATIO: TypicalThresholds = TypicalThresholds {
    male_typical: 0.33,
    female_typical: 0.31,
    rule: TypicalRule::Midpoint { scale: 0.02 },
    overlap_zone: (0.30, 0.35),
};

const UPPERARM_FOREARM_RATIO: TypicalThresholds = TypicalThresholds {
    male_typical: 1.45,
    female_typical: 1.40,
    rule: TypicalRule::Midpoint { scale: 0.1 },
    overlap_zone: (1.35, 1.50),
};

/// The seven independent pieces of evidence used by the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    ShoulderBreadth,
    StandingHeight,
    HeadCircumference,
    ShoulderHipRatio,
    ArmspanHeightRatio,
    HeadHeightRatio,
    UpperarmForearmRatio,
}

impl Indicator {
    pub const COUNT: usize = 7;

    /// Evaluation order: absolute measurements first, then ratios.
    pub const ALL: [Indicator; Self::COUNT] = [
        Self::ShoulderBreadth,
        Self::StandingHeight,
        Self::HeadCircumference,
        Self::ShoulderHipRatio,
        Self::ArmspanHeightRatio,
        Self::HeadHeightRatio,
        Self::UpperarmForearmRatio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShoulderBreadth => "shoulder_breadth",
            Self::StandingHeight => "standing_height",
            Self::HeadCircumference => "head_circumference",
            Self::ShoulderHipRatio => "shoulder_hip_ratio",
            Self::ArmspanHeightRatio => "armspan_height_ratio",
            Self::HeadHeightRatio => "head_height_ratio",
            Self::UpperarmForearmRatio => "upperarm_forearm_ratio",
        }
    }

    /// Vote weight. The seven weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Self::ShoulderBreadth => 0.25,
            Self::StandingHeight => 0.15,
            Self::HeadCircumference => 0.15,
            Self::ShoulderHipRatio => 0.20,
            Self::ArmspanHeightRatio => 0.10,
            Self::HeadHeightRatio => 0.10,
            Self::UpperarmForearmRatio => 0.05,
        }
    }

    pub fn thresholds(self) -> Thresholds {
        match self {
            Self::ShoulderBreadth => Thresholds::Cutoff(SHOULDER_BREADTH),
            Self::StandingHeight => Thresholds::Cutoff(STANDING_HEIGHT),
            Self::HeadCircumference => Thresholds::Cutoff(HEAD_CIRCUMFERENCE),
            Self::ShoulderHipRatio => Thresholds::Cutoff(SHOULDER_HIP_RATIO),
            Self::ArmspanHeightRatio => Thresholds::Typical(ARMSPAN_HEIGHT_RATIO),
            Self::HeadHeightRatio => Thresholds::Typical(HEAD_HEIGHT_RATIO),
            Self::UpperarmForearmRatio => Thresholds::Typical(UPPERARM_FOREARM_RATIO),
        }
    }

    /// Dimensionless indicators are displayed with three decimals, the rest in cm.
    pub fn is_ratio(self) -> bool {
        self.as_str().ends_with("_ratio")
    }

    pub fn evaluate(self, value: f64) -> IndicatorEvaluation {
        let (label, confidence) = self.thresholds().evaluate(value);
        IndicatorEvaluation {
            value,
            prediction: label,
            confidence,
        }
    }

    /// Title-cased display name, e.g. "Shoulder Hip Ratio".
    pub fn title(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indicator's vote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorEvaluation {
    pub value: f64,
    pub prediction: SexLabel,
    pub confidence: f64,
}
