//! Reconstruction of the model input window from provider history.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use futures::try_join;
use ndarray::Array2;

use crate::aqi;
use crate::error::{AqfError, Result};
use crate::hour_range::floor_to_hour;
use crate::meteo::MeteoClient;
use crate::observation::{self, HourlySample, PollutantReading};

/// Feature columns in model input order
pub const FEATURE_COLUMNS: [&str; 5] = ["overall_aqi", "temperature", "pm25", "pm10", "co"];

/// Number of features the pipeline produces per timestep
pub const FEATURE_COUNT: usize = FEATURE_COLUMNS.len();

/// Extra hours fetched and considered beyond the model's sequence length,
/// so dropped rows still leave enough history to fill the window
pub const WINDOW_MARGIN_HOURS: u32 = 24;

/// A gap-free, hour-aligned model input window: `sequence_length` rows of
/// `FEATURE_COLUMNS` values plus the matching timestamps, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    pub values: Array2<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
}

impl FeatureWindow {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Overall-AQI column, oldest first.
    pub fn aqi_series(&self) -> Vec<f64> {
        self.values.column(0).to_vec()
    }

    /// Replaces the most recent row with `row` in feature-column order.
    pub fn override_latest(&mut self, row: [f64; FEATURE_COUNT]) {
        if let Some(last) = self.values.nrows().checked_sub(1) {
            for (column, value) in row.into_iter().enumerate() {
                self.values[[last, column]] = value;
            }
        }
    }
}

/// Builds the model input window from a filled hourly grid: computes the
/// overall-AQI column, restricts rows to the recent processing window
/// ending at the current hour, drops rows still missing any feature, and
/// keeps the most recent `sequence_length` rows.
pub fn assemble_window(
    grid: &BTreeMap<DateTime<Utc>, HourlySample>,
    sequence_length: usize,
    now: DateTime<Utc>,
) -> Result<FeatureWindow> {
    let window_hours = sequence_length as i64 + i64::from(WINDOW_MARGIN_HOURS);
    let window_end = floor_to_hour(now);
    let window_start = window_end - TimeDelta::try_hours(window_hours - 1).unwrap();

    let mut rows: Vec<(DateTime<Utc>, [f64; FEATURE_COUNT])> = Vec::new();
    for (&ts, sample) in grid.range(window_start..=window_end) {
        if let (Some(aqi), Some(temp), Some(pm25), Some(pm10), Some(co)) = (
            aqi::overall_aqi(sample),
            sample.temperature,
            sample.pm25,
            sample.pm10,
            sample.co,
        ) {
            rows.push((ts, [aqi, temp, pm25, pm10, co]));
        }
    }

    if rows.len() < sequence_length {
        return Err(AqfError::InsufficientData {
            needed: sequence_length,
            found: rows.len(),
        });
    }

    let tail = rows.split_off(rows.len() - sequence_length);
    let timestamps = tail.iter().map(|(ts, _)| *ts).collect();
    let mut values = Array2::zeros((sequence_length, FEATURE_COUNT));
    for (r, (_, row)) in tail.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            values[[r, c]] = *value;
        }
    }
    Ok(FeatureWindow { values, timestamps })
}

/// Joins the two raw series and produces the filled hourly grid.
fn build_grid(
    air: &[(DateTime<Utc>, PollutantReading)],
    weather: &[(DateTime<Utc>, Option<f64>)],
) -> Result<BTreeMap<DateTime<Utc>, HourlySample>> {
    let joined = observation::merge_series(air, weather);
    if joined.is_empty() {
        return Err(AqfError::NoOverlap);
    }
    let mut grid = observation::resample_hourly(&joined);
    observation::fill_gaps(&mut grid);
    log::info!(
        "Reconstructed {} hourly rows from {} joined observations",
        grid.len(),
        joined.len()
    );
    Ok(grid)
}

/// Fetches both provider series concurrently and reconstructs the model
/// input window ending at the current hour.
pub async fn reconstruct(
    client: &MeteoClient,
    sequence_length: usize,
    latitude: f64,
    longitude: f64,
) -> Result<FeatureWindow> {
    let past_hours = sequence_length as u32 + WINDOW_MARGIN_HOURS;
    let (air, weather) = try_join!(
        client.fetch_air_quality(latitude, longitude, past_hours),
        client.fetch_temperature(latitude, longitude, past_hours),
    )?;
    let grid = build_grid(&air, &weather)?;
    assemble_window(&grid, sequence_length, Utc::now())
}
