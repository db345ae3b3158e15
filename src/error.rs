use thiserror::Error;

use crate::measurements::Measurement;
use crate::types::KeypointName;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No pose detected in frame")]
    NoPose,

    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },

    #[error("Invalid calibration ratio {0}: must be a positive, finite number of cm per pixel")]
    InvalidCalibration(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed keypoint {name}: {reason}")]
    InvalidKeypoint { name: KeypointName, reason: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidMeasurement { name: Measurement, value: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
