//! Discrete-time linear Kalman filter over runtime-sized nalgebra matrices.
//!
//! ```no_run
//! use linear_kalman::{models, KalmanFilter};
//!
//! let config = models::constant_velocity(0.1, 0.5, 4.0)?;
//! let mut kf = KalmanFilter::new(config)?;
//! for z in [0.1, 0.3, 0.4] {
//!     kf.predict();
//!     kf.update_scalar(z)?;
//! }
//! println!("position estimate: {}", kf.state()[0]);
//! # Ok::<(), linear_kalman::KalmanError>(())
//! ```

pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod types;

pub use config::KalmanConfig;
pub use error::{KalmanError, KalmanResult};
pub use filters::{KalmanFilter, KalmanState};
pub use types::PredictionRecord;
