pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One step of a filtered sequence: the raw measurement and the
/// observation-space prediction made before it was applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub index: usize,
    pub measurement: Vec<f64>,
    pub prediction: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_record_json_shape() {
        let record = PredictionRecord {
            index: 3,
            measurement: vec![1.5],
            prediction: vec![1.25],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["index"], 3);
        assert_eq!(json["measurement"][0], 1.5);
        assert_eq!(json["prediction"][0], 1.25);

        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(
            line,
            r#"{"index":3,"measurement":[1.5],"prediction":[1.25]}"#
        );
        assert_eq!(serde_json::from_str::<PredictionRecord>(&line).unwrap(), record);
    }
}
