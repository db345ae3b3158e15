//! CLI application for body measurements and sex estimation.
//!
//! Usage:
//!   percent-body <frame.json>                       # Human-readable output
//!   percent-body <frame.json> --json                # JSON output
//!   percent-body <measurements.json> --measurements # Prediction only
//!   percent-body <frame.json> -o result.json --json # Save to file
//!   percent-body --describe                         # Measurement catalogue

use clap::Parser;
use percent_body::{
    measurement_descriptions, LandmarkFrame, MeasurementConfig, MeasurementEngine, MeasurementSet,
    Prediction, SexPredictor,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "percent-body")]
#[command(author, version, about = "Body measurements and sex estimation from pose landmarks", long_about = None)]
struct Args {
    /// Input JSON file: a landmark frame, or measurements with --measurements
    #[arg(required_unless_present = "describe")]
    input: Option<PathBuf>,

    /// Input is a measurement object; skip the measurement step
    #[arg(long)]
    measurements: bool,

    /// Calibration ratio in cm per pixel
    #[arg(long)]
    calibration: Option<f64>,

    /// Measurement config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the measurement catalogue and exit
    #[arg(long)]
    describe: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    measurements: MeasurementSet,
    prediction: Prediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    bust_circumference_range: Option<(f64, f64)>,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "percent_body=debug" } else { "percent_body=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.describe {
        let mut s = String::new();
        for (measurement, description) in measurement_descriptions() {
            s.push_str(&format!("{:<24} {}\n", measurement.as_str(), description));
        }
        return emit(args, &s);
    }

    let input = args.input.as_ref().ok_or("No input file given")?;

    let config = match &args.config {
        Some(path) => {
            debug!("Loading config from {:?}", path);
            MeasurementConfig::load(path)?
        }
        None => MeasurementConfig::default(),
    };
    let engine = MeasurementEngine::with_config(config)?;
    if let Some(ratio) = args.calibration {
        if !engine.set_calibration(ratio) {
            return Err(format!("Invalid calibration ratio: {}", ratio).into());
        }
    }

    debug!("Reading {:?}", input);
    let content = std::fs::read_to_string(input)?;

    let measurements = if args.measurements {
        MeasurementSet::from_json(&content)?
    } else {
        let frame = LandmarkFrame::from_json(&content)?;
        engine.compute_measurements(frame.landmarks.as_ref(), frame.size())
    };

    let predictor = SexPredictor::new();
    let prediction = predictor.predict(&measurements);
    info!(
        prediction = prediction.prediction.as_str(),
        confidence = prediction.confidence,
        "processed {:?}",
        input
    );

    let output = Output {
        bust_circumference_range: predictor.estimate_bust_circumference_range(&measurements),
        measurements,
        prediction,
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };
    emit(args, &output_str)
}

fn emit(args: &Args, output_str: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref path) = args.output {
        std::fs::write(path, output_str)?;
        info!("Output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }
    Ok(())
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();
    let m = &output.measurements;

    s.push_str(&format!("Pose detected: {}\n", if m.pose_detected { "yes" } else { "no" }));
    if let Some(ref error) = m.error {
        s.push_str(&format!("Measurement error: {}\n", error));
    }

    if !m.is_empty() {
        s.push_str("\nMeasurements (cm):\n");
        for (measurement, value) in m.iter() {
            s.push_str(&format!("  {:<24} {:>6.1}\n", measurement.as_str(), value));
        }
    }
    if let Some(ref note) = m.calibration_note {
        s.push_str(&format!("\n{}\n", note));
    }
    if let Some((min, max)) = output.bust_circumference_range {
        s.push_str(&format!("Bust circumference (est.): {:.1}-{:.1} cm\n", min, max));
    }

    s.push('\n');
    s.push_str(&output.prediction.explain());
    s.push('\n');
    s
}
