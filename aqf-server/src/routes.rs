//! Request and response shapes and the route handlers.

use std::sync::Arc;

use aqf_core::context::ServiceState;
use aqf_core::error::AqfError;
use aqf_core::forecast::ForecastPoint;
use aqf_core::predict::{run_prediction, LiveReading, PredictionInput};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Timestamp format used in response bodies
const RESPONSE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type SharedState = Arc<ServiceState>;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub co: Option<f64>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default = "default_n_ahead")]
    pub n_ahead: usize,
}

fn default_n_ahead() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<PredictionEntry>>,
}

#[derive(Debug, Serialize)]
pub struct PredictionEntry {
    pub timestamp: String,
    pub aqi: f64,
}

impl PredictResponse {
    fn success(points: &[ForecastPoint]) -> Self {
        PredictResponse {
            status: "success",
            message: "Prediction successful.".to_string(),
            predictions: Some(
                points
                    .iter()
                    .map(|point| PredictionEntry {
                        timestamp: point.timestamp.format(RESPONSE_TIME_FORMAT).to_string(),
                        aqi: point.aqi,
                    })
                    .collect(),
            ),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        PredictResponse {
            status: "error",
            message: message.into(),
            predictions: None,
        }
    }
}

/// What a caller sees for a failure this service is responsible for.
/// The specifics stay in the log.
fn server_error_message(error: &AqfError) -> String {
    match error {
        AqfError::FeatureContract { .. } => error.to_string(),
        AqfError::ShapeMismatch { .. } | AqfError::InvalidScaler(_) => {
            "Error processing input data for prediction (scaling).".to_string()
        }
        AqfError::Inference(_) => "Error during model prediction.".to_string(),
        AqfError::ResultProcessing(_) => {
            "Error processing prediction results (inverse transform).".to_string()
        }
        _ => "Internal server error.".to_string(),
    }
}

pub async fn predict(
    State(state): State<SharedState>,
    Json(request): Json<PredictRequest>,
) -> (StatusCode, Json<PredictResponse>) {
    let context = match state.as_ref() {
        ServiceState::Ready(context) => context,
        ServiceState::Unready { reason } => {
            log::error!("Prediction refused, service context unavailable: {reason}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PredictResponse::error(
                    "Model or scalers not loaded. Check server logs for details.",
                )),
            );
        }
    };

    let input = PredictionInput {
        latitude: request.latitude,
        longitude: request.longitude,
        live: LiveReading::from_parts(request.pm25, request.pm10, request.co, request.temp),
        n_ahead: request.n_ahead,
    };

    match run_prediction(context, &input).await {
        Ok(points) => (StatusCode::OK, Json(PredictResponse::success(&points))),
        Err(e) if e.is_upstream_data() => {
            log::warn!("Data retrieval failed: {e}");
            (
                StatusCode::OK,
                Json(PredictResponse::error(format!("Data retrieval failed: {e}"))),
            )
        }
        Err(e) => {
            log::error!("Prediction failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PredictResponse::error(server_error_message(&e))),
            )
        }
    }
}

/// Liveness probe.
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "AQI Prediction API is running." }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn request_fills_defaults() {
        let request: PredictRequest =
            serde_json::from_str(r#"{"latitude": 28.6, "longitude": 77.2}"#).unwrap();
        assert_eq!(request.n_ahead, 1);
        assert!(request.pm25.is_none());
        assert!(request.temp.is_none());
    }

    #[test]
    fn request_accepts_live_readings_and_horizon() {
        let raw = r#"{
            "latitude": 28.6,
            "longitude": 77.2,
            "pm25": 120.0,
            "pm10": 80.0,
            "co": 2.0,
            "temp": 25.0,
            "n_ahead": 3
        }"#;
        let request: PredictRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.n_ahead, 3);
        assert_eq!(request.pm25, Some(120.0));
    }

    #[test]
    fn error_response_omits_predictions() {
        let body =
            serde_json::to_value(PredictResponse::error("Data retrieval failed: x")).unwrap();
        assert_eq!(body["status"], "error");
        assert!(body.get("predictions").is_none());
    }

    #[test]
    fn success_response_formats_timestamps() {
        let points = vec![ForecastPoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap(),
            aqi: 87.5,
        }];
        let body = serde_json::to_value(PredictResponse::success(&points)).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Prediction successful.");
        assert_eq!(body["predictions"][0]["timestamp"], "2024-01-10 15:00:00");
        assert_eq!(body["predictions"][0]["aqi"], 87.5);
    }
}
