//! Ready-made 1-D tracking models.
//!
//! State layouts:
//! - constant velocity:     `[position, velocity]`
//! - constant acceleration: `[position, velocity, acceleration]`
//!
//! Both observe position only.

use nalgebra::DMatrix;

use crate::config::KalmanConfig;
use crate::error::{KalmanError, KalmanResult};

fn check_positive(name: &str, value: f64) -> KalmanResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(KalmanError::Configuration(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

fn check_variance(name: &str, value: f64) -> KalmanResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(KalmanError::Configuration(format!(
            "{name} must be non-negative and finite, got {value}"
        )));
    }
    Ok(())
}

/// Constant-acceleration model with a position/velocity process noise block.
///
/// `process_noise` fills the upper-left 2×2 block of Q uniformly, so position
/// and velocity noise are fully correlated and acceleration is noise-free.
pub fn constant_acceleration(
    dt: f64,
    process_noise: f64,
    measurement_variance: f64,
) -> KalmanResult<KalmanConfig> {
    check_positive("dt", dt)?;
    check_variance("process_noise", process_noise)?;
    check_variance("measurement_variance", measurement_variance)?;

    #[rustfmt::skip]
    let f = DMatrix::from_row_slice(3, 3, &[
        1.0, dt, 0.0,
        0.0, 1.0, dt,
        0.0, 0.0, 1.0,
    ]);
    let h = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]);

    let mut q = DMatrix::<f64>::zeros(3, 3);
    q[(0, 0)] = process_noise;
    q[(0, 1)] = process_noise;
    q[(1, 0)] = process_noise;
    q[(1, 1)] = process_noise;

    let r = DMatrix::from_element(1, 1, measurement_variance);

    Ok(KalmanConfig::new(f, h)
        .with_process_noise(q)
        .with_measurement_noise(r))
}

/// Constant-velocity model driven by white acceleration noise.
pub fn constant_velocity(
    dt: f64,
    accel_variance: f64,
    measurement_variance: f64,
) -> KalmanResult<KalmanConfig> {
    check_positive("dt", dt)?;
    check_variance("accel_variance", accel_variance)?;
    check_variance("measurement_variance", measurement_variance)?;

    let f = DMatrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]);
    let h = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);

    let q_pos = 0.25 * dt.powi(4) * accel_variance;
    let q_cross = 0.5 * dt.powi(3) * accel_variance;
    let q_vel = dt.powi(2) * accel_variance;
    let q = DMatrix::from_row_slice(2, 2, &[q_pos, q_cross, q_cross, q_vel]);

    let r = DMatrix::from_element(1, 1, measurement_variance);

    Ok(KalmanConfig::new(f, h)
        .with_process_noise(q)
        .with_measurement_noise(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::KalmanFilter;
    use crate::types::linalg::asymmetry;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_acceleration_layout() {
        let dt = 1.0 / 60.0;
        let config = constant_acceleration(dt, 0.05, 0.5).unwrap();
        let f = config.f.as_ref().unwrap();
        assert_eq!(f[(0, 1)], dt);
        assert_eq!(f[(1, 2)], dt);
        assert_eq!(f[(0, 2)], 0.0);

        let q = config.q.as_ref().unwrap();
        assert_eq!(q[(0, 1)], 0.05);
        assert_eq!(q[(2, 2)], 0.0);

        let kf = KalmanFilter::new(config).unwrap();
        assert_eq!(kf.state_dim(), 3);
        assert_eq!(kf.measurement_dim(), 1);
        assert_eq!(kf.measurement_noise()[(0, 0)], 0.5);
    }

    #[test]
    fn test_constant_velocity_noise() {
        let config = constant_velocity(2.0, 0.5, 1.0).unwrap();
        let q = config.q.as_ref().unwrap();
        assert_relative_eq!(q[(0, 0)], 2.0);
        assert_relative_eq!(q[(0, 1)], 2.0);
        assert_relative_eq!(q[(1, 1)], 2.0);
        assert_eq!(asymmetry(q), 0.0);
    }

    #[test]
    fn test_bad_parameters_rejected() {
        assert!(constant_velocity(0.0, 1.0, 1.0).is_err());
        assert!(constant_velocity(f64::NAN, 1.0, 1.0).is_err());
        assert!(constant_acceleration(0.1, -1.0, 1.0).is_err());
        assert!(constant_acceleration(0.1, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_tracks_cubic_signal() {
        let config = constant_acceleration(1.0 / 60.0, 0.05, 0.5).unwrap();
        let mut kf = KalmanFilter::new(config).unwrap();
        let signal: Vec<f64> = (0..100)
            .map(|i| {
                let t = -10.0 + 20.0 * i as f64 / 99.0;
                -(t.powi(3) + 2.0 * t - 2.0)
            })
            .collect();

        let predictions = kf.filter_scalars(&signal).unwrap();
        let tail_err = (kf.state()[0] - signal[99]).abs();
        assert_eq!(predictions.len(), 100);
        assert!(tail_err < (signal[99] - signal[0]).abs() * 0.1, "tail error {tail_err}");
    }
}
