//! Linear algebra type system for the filter
//!
//! Dimensions are chosen by the caller at runtime, so everything is built on
//! nalgebra's dynamically sized storage. Matrices cross the serde boundary as
//! arrays of rows.

use nalgebra::{DMatrix, DVector};

use crate::error::{KalmanError, KalmanResult};

// ===== Filter Types =====
pub type StateVec = DVector<f64>;
pub type StateMat = DMatrix<f64>;

pub type MeasurementVec = DVector<f64>;
pub type ControlVec = DVector<f64>;

pub type TransitionMat = DMatrix<f64>; // n×n
pub type ObservationMat = DMatrix<f64>; // m×n
pub type ControlMat = DMatrix<f64>; // n×p
pub type KalmanGain = DMatrix<f64>; // n×m
pub type ProcessNoiseMat = DMatrix<f64>; // n×n
pub type MeasurementNoiseMat = DMatrix<f64>; // m×m

/// Build a matrix from row slices, rejecting ragged input.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> KalmanResult<DMatrix<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
        return Err(KalmanError::Configuration(format!(
            "row {idx} has {} columns, expected {ncols}",
            row.len()
        )));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(nrows, ncols, &flat))
}

/// Row-major copy of a matrix.
pub fn matrix_to_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Largest absolute difference between `m` and its transpose.
pub fn asymmetry(m: &DMatrix<f64>) -> f64 {
    if !m.is_square() {
        return f64::INFINITY;
    }
    (m - m.transpose()).amax()
}

/// Serde adapter: `DMatrix<f64>` as `[[row], [row], ...]`.
pub mod serde_rows {
    use nalgebra::DMatrix;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(m: &DMatrix<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        super::matrix_to_rows(m).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DMatrix<f64>, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
        super::matrix_from_rows(&rows).map_err(D::Error::custom)
    }
}

/// Serde adapter for optional matrices.
pub mod serde_rows_opt {
    use nalgebra::DMatrix;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        m: &Option<DMatrix<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        m.as_ref().map(super::matrix_to_rows).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DMatrix<f64>>, D::Error> {
        match Option::<Vec<Vec<f64>>>::deserialize(deserializer)? {
            Some(rows) => super::matrix_from_rows(&rows)
                .map(Some)
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Serde adapter for optional vectors, as a flat array.
pub mod serde_vec_opt {
    use nalgebra::DVector;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        v: &Option<DVector<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        v.as_ref()
            .map(|v| v.iter().copied().collect::<Vec<f64>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DVector<f64>>, D::Error> {
        Ok(Option::<Vec<f64>>::deserialize(deserializer)?.map(DVector::from_vec))
    }
}
