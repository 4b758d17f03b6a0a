//! Filter configuration.
//!
//! Only the transition and observation models are required. Everything else
//! is optional here and filled with its default once, when the filter is
//! built (`Q = I_n`, `R = I_m`, `P = I_n`, `x0 = 0`, no control input).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KalmanError, KalmanResult};
use crate::types::linalg::{
    serde_rows_opt, serde_vec_opt, ControlMat, MeasurementNoiseMat, ObservationMat,
    ProcessNoiseMat, StateMat, StateVec, TransitionMat,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KalmanConfig {
    /// State transition model F (n×n)
    #[serde(default, with = "serde_rows_opt")]
    pub f: Option<TransitionMat>,
    /// Observation model H (m×n)
    #[serde(default, with = "serde_rows_opt")]
    pub h: Option<ObservationMat>,
    /// Control input model B (n×p)
    #[serde(default, with = "serde_rows_opt", skip_serializing_if = "Option::is_none")]
    pub b: Option<ControlMat>,
    /// Process noise covariance Q (n×n)
    #[serde(default, with = "serde_rows_opt", skip_serializing_if = "Option::is_none")]
    pub q: Option<ProcessNoiseMat>,
    /// Observation noise covariance R (m×m)
    #[serde(default, with = "serde_rows_opt", skip_serializing_if = "Option::is_none")]
    pub r: Option<MeasurementNoiseMat>,
    /// Initial covariance P0 (n×n)
    #[serde(default, with = "serde_rows_opt", skip_serializing_if = "Option::is_none")]
    pub p: Option<StateMat>,
    /// Initial state x0 (n)
    #[serde(default, with = "serde_vec_opt", skip_serializing_if = "Option::is_none")]
    pub x0: Option<StateVec>,
}

impl KalmanConfig {
    pub fn new(f: TransitionMat, h: ObservationMat) -> Self {
        Self {
            f: Some(f),
            h: Some(h),
            ..Self::default()
        }
    }

    pub fn with_control(mut self, b: ControlMat) -> Self {
        self.b = Some(b);
        self
    }

    pub fn with_process_noise(mut self, q: ProcessNoiseMat) -> Self {
        self.q = Some(q);
        self
    }

    pub fn with_measurement_noise(mut self, r: MeasurementNoiseMat) -> Self {
        self.r = Some(r);
        self
    }

    pub fn with_covariance(mut self, p: StateMat) -> Self {
        self.p = Some(p);
        self
    }

    pub fn with_initial_state(mut self, x0: StateVec) -> Self {
        self.x0 = Some(x0);
        self
    }

    pub fn from_json_str(json: &str) -> KalmanResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| KalmanError::Configuration(format!("Failed to parse config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> KalmanResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            KalmanError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> KalmanResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KalmanError::Configuration(format!("Failed to encode config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_parse_rows() {
        let config = KalmanConfig::from_json_str(
            r#"{
                "f": [[1.0, 0.5], [0.0, 1.0]],
                "h": [[1.0, 0.0]],
                "r": [[0.25]],
                "x0": [3.0, -1.0]
            }"#,
        )
        .unwrap();

        let f = config.f.as_ref().unwrap();
        assert_eq!(f.shape(), (2, 2));
        assert_eq!(f[(0, 1)], 0.5);
        assert_eq!(config.h.as_ref().unwrap().shape(), (1, 2));
        assert_eq!(config.r.as_ref().unwrap()[(0, 0)], 0.25);
        assert_eq!(config.x0.as_ref().unwrap()[1], -1.0);
        assert!(config.q.is_none());
        assert!(config.b.is_none());
    }

    #[test]
    fn test_missing_models_parse_as_absent() {
        let config = KalmanConfig::from_json_str("{}").unwrap();
        assert!(config.f.is_none());
        assert!(config.h.is_none());
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = KalmanConfig::from_json_str(r#"{"f": [[1.0, 2.0], [3.0]], "h": [[1.0]]}"#)
            .unwrap_err();
        assert!(matches!(err, KalmanError::Configuration(_)));
    }

    #[test]
    fn test_load_demo_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/constant_velocity.json");
        let config = KalmanConfig::from_json_file(path).unwrap();
        assert_eq!(config.p.as_ref().unwrap()[(1, 1)], 100.0);
        assert_eq!(config.x0.as_ref().unwrap().len(), 2);

        let err = KalmanConfig::from_json_file("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn test_json_round_trip_keeps_layout() {
        let config = KalmanConfig::new(
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
            DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
        )
        .with_process_noise(DMatrix::identity(2, 2) * 0.1);

        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"q\""));
        assert!(!json.contains("\"b\""));
        assert_eq!(KalmanConfig::from_json_str(&json).unwrap(), config);
    }
}
