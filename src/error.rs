use thiserror::Error;

/// Kalman filter error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KalmanError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Dimension mismatch for {name}: expected {expected}, got {actual}")]
    Dimension {
        name: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Singular matrix: {name} ({rows}x{cols}) is not invertible")]
    SingularMatrix {
        name: &'static str,
        rows: usize,
        cols: usize,
    },
}

impl KalmanError {
    /// Shape mismatch on a matrix, reported as `rows x cols`.
    pub(crate) fn matrix_shape(
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        KalmanError::Dimension {
            name,
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    /// Length mismatch on a vector.
    pub(crate) fn vector_len(name: &'static str, expected: usize, actual: usize) -> Self {
        KalmanError::Dimension {
            name,
            expected: format!("length {expected}"),
            actual: format!("length {actual}"),
        }
    }
}

/// Result type for filter operations
pub type KalmanResult<T> = Result<T, KalmanError>;
