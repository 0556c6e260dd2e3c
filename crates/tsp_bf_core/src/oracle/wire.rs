//! JSON schema shared by the scoring service and the remote oracle.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct City {
    #[serde(default)]
    pub(crate) id: String,
    pub(crate) x: f64,
    pub(crate) y: f64,
}

impl City {
    pub(crate) fn coords(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoreRequest {
    pub(crate) cities: Vec<City>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ScoreResponse {
    pub(crate) total_distance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: String,
}

#[cfg(test)]
mod tests {
    use super::{ScoreRequest, ScoreResponse};

    #[test]
    fn request_requires_numeric_coordinates() {
        let ok: ScoreRequest =
            serde_json::from_str(r#"{"cities":[{"id":"A","x":0,"y":1.5}]}"#).expect("parse");
        assert_eq!(ok.cities[0].coords(), (0.0, 1.5));

        assert!(serde_json::from_str::<ScoreRequest>(r#"{"cities":[{"id":"A","x":0}]}"#).is_err());
        assert!(
            serde_json::from_str::<ScoreRequest>(r#"{"cities":[{"id":"A","x":"a","y":1}]}"#)
                .is_err()
        );
    }

    #[test]
    fn response_requires_total_distance_field() {
        assert!(serde_json::from_str::<ScoreResponse>(r#"{"distance": 3.0}"#).is_err());
        let parsed: ScoreResponse =
            serde_json::from_str(r#"{"total_distance": 3.25}"#).expect("parse");
        assert_eq!(parsed.total_distance, 3.25);
    }
}
