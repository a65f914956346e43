//! Open-Meteo client for hourly air-quality and temperature history.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AqfError, Result};
use crate::observation::PollutantReading;

/// Air quality API endpoint
pub const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";

/// Weather forecast API endpoint, which also serves recent temperature history
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly timestamp format used by both APIs
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client over the two Open-Meteo endpoints. Base URLs are injectable so
/// tests can point at a local server.
#[derive(Debug, Clone)]
pub struct MeteoClient {
    client: Client,
    air_quality_url: String,
    forecast_url: String,
}

impl MeteoClient {
    pub fn new() -> Result<Self> {
        Self::with_base_urls(AIR_QUALITY_URL, FORECAST_URL)
    }

    pub fn with_base_urls(
        air_quality_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(MeteoClient {
            client,
            air_quality_url: air_quality_url.into(),
            forecast_url: forecast_url.into(),
        })
    }

    /// Fetches hourly pollutant concentrations covering the past
    /// `past_hours` hours plus the provider's forecast tail.
    pub async fn fetch_air_quality(
        &self,
        latitude: f64,
        longitude: f64,
        past_hours: u32,
    ) -> Result<Vec<(DateTime<Utc>, PollutantReading)>> {
        log::info!(
            "Fetching air quality data for ({latitude}, {longitude}), past {past_hours} hours"
        );
        let payload: HourlyResponse = self
            .client
            .get(&self.air_quality_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", "pm2_5,pm10,carbon_monoxide".to_string()),
                ("timezone", "UTC".to_string()),
                ("past_hours", past_hours.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        air_quality_series(payload)
    }

    /// Fetches hourly 2m temperature over the same window.
    pub async fn fetch_temperature(
        &self,
        latitude: f64,
        longitude: f64,
        past_hours: u32,
    ) -> Result<Vec<(DateTime<Utc>, Option<f64>)>> {
        log::info!(
            "Fetching temperature data for ({latitude}, {longitude}), past {past_hours} hours"
        );
        let payload: HourlyResponse = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("timezone", "UTC".to_string()),
                ("past_hours", past_hours.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        temperature_series(payload)
    }
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: Option<HourlyBlock>,
}

/// Parallel hourly arrays as both endpoints serialize them. Value arrays
/// the provider omits deserialize as empty, which downstream reads as an
/// all-missing column.
#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    time: Option<Vec<String>>,
    #[serde(default)]
    pm2_5: Vec<Option<f64>>,
    #[serde(default)]
    pm10: Vec<Option<f64>>,
    #[serde(default)]
    carbon_monoxide: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
}

fn parse_block(payload: HourlyResponse, provider: &str) -> Result<(Vec<DateTime<Utc>>, HourlyBlock)> {
    let block = payload.hourly.ok_or_else(|| AqfError::PayloadSchema {
        provider: provider.to_string(),
    })?;
    let raw_times = match &block.time {
        Some(times) => times,
        None => {
            return Err(AqfError::PayloadSchema {
                provider: provider.to_string(),
            })
        }
    };
    if raw_times.is_empty() {
        return Err(AqfError::EmptySeries(provider.to_string()));
    }

    let mut times = Vec::with_capacity(raw_times.len());
    for value in raw_times {
        let naive = NaiveDateTime::parse_from_str(value, TIME_FORMAT)
            .map_err(|e| AqfError::TimestampParse(format!("{value:?}: {e}")))?;
        times.push(naive.and_utc());
    }
    Ok((times, block))
}

fn air_quality_series(payload: HourlyResponse) -> Result<Vec<(DateTime<Utc>, PollutantReading)>> {
    let (times, block) = parse_block(payload, "air quality")?;
    Ok(times
        .iter()
        .enumerate()
        .map(|(idx, ts)| {
            (
                *ts,
                PollutantReading {
                    pm25: block.pm2_5.get(idx).copied().flatten(),
                    pm10: block.pm10.get(idx).copied().flatten(),
                    co: block.carbon_monoxide.get(idx).copied().flatten(),
                },
            )
        })
        .collect())
}

fn temperature_series(payload: HourlyResponse) -> Result<Vec<(DateTime<Utc>, Option<f64>)>> {
    let (times, block) = parse_block(payload, "temperature")?;
    Ok(times
        .iter()
        .enumerate()
        .map(|(idx, ts)| (*ts, block.temperature_2m.get(idx).copied().flatten()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const AIR_QUALITY_PAYLOAD: &str = r#"{
        "latitude": 28.6,
        "longitude": 77.2,
        "hourly": {
            "time": ["2024-01-10T00:00", "2024-01-10T01:00", "2024-01-10T02:00"],
            "pm2_5": [101.4, null, 98.2],
            "pm10": [180.0, 175.5, null],
            "carbon_monoxide": [1.2, 1.3, 1.1]
        }
    }"#;

    const TEMPERATURE_PAYLOAD: &str = r#"{
        "hourly": {
            "time": ["2024-01-10T00:00", "2024-01-10T01:00"],
            "temperature_2m": [14.1, null]
        }
    }"#;

    fn payload(raw: &str) -> HourlyResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn parses_air_quality_payload_with_nulls() {
        let series = air_quality_series(payload(AIR_QUALITY_PAYLOAD)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].0, Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
        assert_eq!(series[0].1.pm25, Some(101.4));
        assert_eq!(series[1].1.pm25, None);
        assert_eq!(series[2].1.pm10, None);
        assert_eq!(series[2].1.co, Some(1.1));
    }

    #[test]
    fn parses_temperature_payload() {
        let series = temperature_series(payload(TEMPERATURE_PAYLOAD)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].1, Some(14.1));
        assert_eq!(series[1].1, None);
    }

    #[test]
    fn absent_value_array_reads_as_all_missing() {
        let raw = r#"{"hourly": {"time": ["2024-01-10T00:00"], "pm2_5": [55.0]}}"#;
        let series = air_quality_series(payload(raw)).unwrap();
        assert_eq!(series[0].1.pm25, Some(55.0));
        assert_eq!(series[0].1.pm10, None);
        assert_eq!(series[0].1.co, None);
    }

    #[test]
    fn missing_hourly_key_is_a_schema_error() {
        let result = air_quality_series(payload(r#"{"latitude": 28.6}"#));
        assert!(matches!(result, Err(AqfError::PayloadSchema { .. })));

        let result = air_quality_series(payload(r#"{"hourly": {"pm2_5": [1.0]}}"#));
        assert!(matches!(result, Err(AqfError::PayloadSchema { .. })));
    }

    #[test]
    fn empty_time_array_is_an_empty_series_error() {
        let result = temperature_series(payload(r#"{"hourly": {"time": []}}"#));
        assert!(matches!(result, Err(AqfError::EmptySeries(_))));
    }

    #[test]
    fn unparseable_timestamp_is_reported() {
        let raw = r#"{"hourly": {"time": ["10/01/2024 00:00"], "temperature_2m": [10.0]}}"#;
        let result = temperature_series(payload(raw));
        assert!(matches!(result, Err(AqfError::TimestampParse(_))));
    }
}
