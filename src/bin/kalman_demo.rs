//! Demo: track a noisy cubic signal with the constant-acceleration model
//!
//! Writes one JSON object per sample (measurement and the prediction made
//! before it was applied) so the result can be plotted with any tool.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use linear_kalman::{models, KalmanConfig, KalmanFilter, PredictionRecord};

#[derive(Parser, Debug)]
#[command(name = "kalman_demo")]
#[command(about = "Linear Kalman filter demo on a noisy cubic signal", long_about = None)]
struct Args {
    /// Number of samples over t in [-10, 10]
    #[arg(long, default_value_t = 100)]
    samples: usize,

    /// Measurement noise standard deviation used to generate the signal
    #[arg(long, default_value_t = 2.0)]
    noise_std: f64,

    /// Model time step
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Position/velocity process noise of the built-in model
    #[arg(long, default_value_t = 0.05)]
    process_noise: f64,

    /// Measurement variance assumed by the built-in model
    #[arg(long, default_value_t = 0.5)]
    measurement_variance: f64,

    /// RNG seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// JSON filter config to use instead of the built-in model
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn cubic(t: f64) -> f64 {
    -(t.powi(3) + 2.0 * t - 2.0)
}

fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => KalmanConfig::from_json_file(path)
            .with_context(|| format!("loading filter config {}", path.display()))?,
        None => {
            models::constant_acceleration(args.dt, args.process_noise, args.measurement_variance)?
        }
    };
    let mut kf = KalmanFilter::new(config)?;
    if kf.measurement_dim() != 1 {
        bail!(
            "demo feeds scalar measurements, config observes {} values",
            kf.measurement_dim()
        );
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let noise = Normal::new(0.0, args.noise_std).context("invalid noise_std")?;

    let truth: Vec<f64> = linspace(-10.0, 10.0, args.samples).into_iter().map(cubic).collect();
    let measurements: Vec<f64> = truth.iter().map(|v| v + noise.sample(&mut rng)).collect();

    info!(
        "Running filter: n={}, m={}, samples={}",
        kf.state_dim(),
        kf.measurement_dim(),
        measurements.len()
    );

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut sq_err = 0.0;
    for (index, (&z, &actual)) in measurements.iter().zip(&truth).enumerate() {
        let prediction = kf.step(&DVector::from_element(1, z), None)?;
        sq_err += (prediction[0] - actual).powi(2);

        let record = PredictionRecord {
            index,
            measurement: vec![z],
            prediction: prediction.iter().copied().collect(),
        };
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }
    out.flush()?;

    if !measurements.is_empty() {
        let snapshot = kf.snapshot();
        info!(
            "Done: prediction RMSE vs truth {:.3}, covariance trace {:.4}",
            (sq_err / measurements.len() as f64).sqrt(),
            snapshot.covariance_trace
        );
    }
    Ok(())
}
