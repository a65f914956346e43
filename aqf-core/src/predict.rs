//! End-to-end prediction orchestration.

use ndarray::{Array3, Axis};

use crate::aqi;
use crate::context::ServiceContext;
use crate::error::{AqfError, Result};
use crate::forecast::{self, ForecastPoint};
use crate::observation::HourlySample;
use crate::window::{self, FeatureWindow, FEATURE_COUNT};

/// Live pollutant and temperature readings supplied with a request.
/// Exists only when every field is available, so a partial set can never
/// half-override a window row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveReading {
    pub pm25: f64,
    pub pm10: f64,
    pub co: f64,
    pub temp: f64,
}

impl LiveReading {
    /// Bundles the four optional request fields, requiring all of them
    /// to be present and finite.
    pub fn from_parts(
        pm25: Option<f64>,
        pm10: Option<f64>,
        co: Option<f64>,
        temp: Option<f64>,
    ) -> Option<Self> {
        match (pm25, pm10, co, temp) {
            (Some(pm25), Some(pm10), Some(co), Some(temp))
                if pm25.is_finite() && pm10.is_finite() && co.is_finite() && temp.is_finite() =>
            {
                Some(LiveReading {
                    pm25,
                    pm10,
                    co,
                    temp,
                })
            }
            _ => None,
        }
    }

    fn as_sample(&self) -> HourlySample {
        HourlySample {
            pm25: Some(self.pm25),
            pm10: Some(self.pm10),
            co: Some(self.co),
            temperature: Some(self.temp),
        }
    }
}

/// A validated prediction request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionInput {
    pub latitude: f64,
    pub longitude: f64,
    pub live: Option<LiveReading>,
    pub n_ahead: usize,
}

/// Confirms the loaded model consumes exactly the features the pipeline
/// produces.
pub fn check_feature_contract(context: &ServiceContext) -> Result<()> {
    let model_features = context.model.feature_count();
    if model_features != FEATURE_COUNT {
        return Err(AqfError::FeatureContract {
            model: model_features,
            pipeline: FEATURE_COUNT,
        });
    }
    Ok(())
}

/// Runs the full request pipeline: reconstruct the window from provider
/// history, apply the live override, scale, predict, post-process.
pub async fn run_prediction(
    context: &ServiceContext,
    input: &PredictionInput,
) -> Result<Vec<ForecastPoint>> {
    check_feature_contract(context)?;
    let window = window::reconstruct(
        &context.meteo,
        context.model.sequence_length(),
        input.latitude,
        input.longitude,
    )
    .await?;
    predict_from_window(context, window, input)
}

/// The synchronous tail of the pipeline, split out so tests can drive it
/// with a prepared window.
pub fn predict_from_window(
    context: &ServiceContext,
    mut window: FeatureWindow,
    input: &PredictionInput,
) -> Result<Vec<ForecastPoint>> {
    if let Some(live) = &input.live {
        match aqi::overall_aqi(&live.as_sample()) {
            Some(current_aqi) => {
                log::info!("Overriding the latest timestep with live readings (AQI {current_aqi:.1})");
                window.override_latest([current_aqi, live.temp, live.pm25, live.pm10, live.co]);
            }
            None => {
                log::warn!(
                    "No AQI is defined for the live readings, keeping the historical timestep"
                );
            }
        }
    }

    let stacked = window.values.clone().insert_axis(Axis(0)).into_dyn();
    let scaled: Array3<f64> = context
        .input_scaler
        .transform(&stacked)?
        .into_dimensionality()
        .map_err(|e| AqfError::ResultProcessing(e.to_string()))?;

    let steps = context.model.predict(&scaled)?;
    forecast::to_absolute_forecast(&window, &steps, &context.target_scaler, input.n_ahead)
}
