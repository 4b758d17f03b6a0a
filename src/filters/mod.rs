pub mod linear_kalman;

pub use linear_kalman::{KalmanFilter, KalmanState};
