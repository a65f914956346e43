//! Conversion of scaled model output into absolute hourly AQI forecasts.

use chrono::{DateTime, TimeDelta, Utc};
use ndarray::Array1;

use crate::error::{AqfError, Result};
use crate::scaler::MinMaxScaler;
use crate::window::FeatureWindow;

/// One forecast step in absolute AQI units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub aqi: f64,
}

/// Number of trailing AQI hours averaged into the magnitude proxy
pub const PROXY_HOURS: usize = 5;

/// Mean of the window's trailing AQI values. The model predicts ratios
/// against this recent level; a non-finite or non-positive mean falls
/// back to 1.0 so the ratios pass through unscaled.
pub fn rolling_magnitude_proxy(window: &FeatureWindow) -> Result<f64> {
    if window.is_empty() {
        return Err(AqfError::ResultProcessing(
            "input sequence is empty".to_string(),
        ));
    }
    let aqi = window.aqi_series();
    let take = PROXY_HOURS.min(aqi.len());
    let mean = aqi[aqi.len() - take..].iter().sum::<f64>() / take as f64;
    if mean.is_finite() && mean > 0.0 {
        Ok(mean)
    } else {
        Ok(1.0)
    }
}

/// Forecast timestamps: whole-hour steps after the window's last
/// timestamp, or after the current time when the window has none.
pub fn forecast_timestamps(last: Option<DateTime<Utc>>, n_ahead: usize) -> Vec<DateTime<Utc>> {
    let base = match last {
        Some(ts) => ts,
        None => {
            log::warn!("No window timestamps available, synthesizing forecast timestamps from the current time");
            Utc::now()
        }
    };
    (1..=n_ahead as i64)
        .map(|i| base + TimeDelta::try_hours(i).unwrap())
        .collect()
}

/// Turns the model's scaled output into absolute AQI points: inverse
/// transform to ratios, then multiply by the rolling magnitude proxy.
pub fn to_absolute_forecast(
    window: &FeatureWindow,
    scaled_steps: &[f64],
    target_scaler: &MinMaxScaler,
    n_ahead: usize,
) -> Result<Vec<ForecastPoint>> {
    if scaled_steps.len() != n_ahead {
        return Err(AqfError::ResultProcessing(format!(
            "model emitted {} steps for a {n_ahead}-step request",
            scaled_steps.len()
        )));
    }
    let proxy = rolling_magnitude_proxy(window)?;
    log::info!("Magnitude proxy for inverse transform: {proxy:.2}");

    let scaled = Array1::from(scaled_steps.to_vec()).into_dyn();
    let ratios = target_scaler.inverse_transform(&scaled)?;

    Ok(forecast_timestamps(window.last_timestamp(), n_ahead)
        .into_iter()
        .zip(ratios.iter())
        .map(|(timestamp, ratio)| ForecastPoint {
            timestamp,
            aqi: ratio * proxy,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::{array, Array2};

    fn identity_scaler() -> MinMaxScaler {
        MinMaxScaler {
            min: array![0.0],
            max: array![1.0],
            scale: array![1.0],
            range: (0.0, 1.0),
        }
    }

    fn window_with_aqi(aqi: &[f64]) -> FeatureWindow {
        let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let mut values = Array2::zeros((aqi.len(), 5));
        for (r, value) in aqi.iter().enumerate() {
            values[[r, 0]] = *value;
            values[[r, 1]] = 20.0;
        }
        FeatureWindow {
            values,
            timestamps: (0..aqi.len() as i64)
                .map(|h| start + TimeDelta::try_hours(h).unwrap())
                .collect(),
        }
    }

    #[test]
    fn unit_ratios_reproduce_the_proxy_level() {
        let window = window_with_aqi(&[50.0; 24]);
        let points =
            to_absolute_forecast(&window, &[1.0, 1.0, 1.0], &identity_scaler(), 3).unwrap();
        assert_eq!(points.len(), 3);
        for point in &points {
            assert!((point.aqi - 50.0).abs() < 1e-9);
        }
        let last = window.last_timestamp().unwrap();
        assert_eq!(points[0].timestamp, last + TimeDelta::try_hours(1).unwrap());
        assert_eq!(points[2].timestamp, last + TimeDelta::try_hours(3).unwrap());
    }

    #[test]
    fn proxy_only_averages_the_trailing_hours() {
        let mut aqi = vec![10.0; 6];
        aqi[0] = 99.0;
        let proxy = rolling_magnitude_proxy(&window_with_aqi(&aqi)).unwrap();
        assert!((proxy - 10.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_proxy_falls_back_to_unity() {
        let window = window_with_aqi(&[0.0; 24]);
        let points = to_absolute_forecast(&window, &[0.7], &identity_scaler(), 1).unwrap();
        assert!((points[0].aqi - 0.7).abs() < 1e-9);
    }

    #[test]
    fn horizon_mismatch_is_an_error() {
        let window = window_with_aqi(&[50.0; 24]);
        let result = to_absolute_forecast(&window, &[1.0], &identity_scaler(), 3);
        assert!(matches!(result, Err(AqfError::ResultProcessing(_))));
    }

    #[test]
    fn empty_window_is_an_error() {
        let window = FeatureWindow {
            values: Array2::zeros((0, 5)),
            timestamps: Vec::new(),
        };
        let result = to_absolute_forecast(&window, &[1.0], &identity_scaler(), 1);
        assert!(matches!(result, Err(AqfError::ResultProcessing(_))));
    }
}
