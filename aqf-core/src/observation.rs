//! Hourly observation series: joining the two provider feeds, resampling
//! onto a strict hourly grid, and filling gaps.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::hour_range::{floor_to_hour, HourRange};

/// Raw pollutant concentrations reported by the air-quality provider
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PollutantReading {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub co: Option<f64>,
}

/// One hour of joined air-quality and weather readings. `None` marks a
/// value the providers did not report for that hour.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HourlySample {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub co: Option<f64>,
    pub temperature: Option<f64>,
}

impl HourlySample {
    fn columns(&self) -> [Option<f64>; 4] {
        [self.pm25, self.pm10, self.co, self.temperature]
    }

    fn columns_mut(&mut self) -> [&mut Option<f64>; 4] {
        [
            &mut self.pm25,
            &mut self.pm10,
            &mut self.co,
            &mut self.temperature,
        ]
    }
}

/// Inner join of the two raw series on exact timestamps. Timestamps
/// present on only one side are dropped; duplicated timestamps survive
/// as one joined row per pairing and are averaged away by the resample.
pub fn merge_series(
    air: &[(DateTime<Utc>, PollutantReading)],
    weather: &[(DateTime<Utc>, Option<f64>)],
) -> Vec<(DateTime<Utc>, HourlySample)> {
    let mut temps: HashMap<DateTime<Utc>, Vec<Option<f64>>> = HashMap::new();
    for (ts, temp) in weather {
        temps.entry(*ts).or_default().push(*temp);
    }

    let mut joined = Vec::new();
    for (ts, reading) in air {
        if let Some(matched) = temps.get(ts) {
            for temp in matched {
                joined.push((
                    *ts,
                    HourlySample {
                        pm25: reading.pm25,
                        pm10: reading.pm10,
                        co: reading.co,
                        temperature: *temp,
                    },
                ));
            }
        }
    }
    joined
}

fn mean_sample(slots: &[(f64, u32); 4]) -> HourlySample {
    let mean = |(sum, n): (f64, u32)| (n > 0).then(|| sum / f64::from(n));
    HourlySample {
        pm25: mean(slots[0]),
        pm10: mean(slots[1]),
        co: mean(slots[2]),
        temperature: mean(slots[3]),
    }
}

/// Resamples joined rows onto a one-row-per-hour grid spanning the first
/// to the last observed hour. Rows sharing an hour are aggregated by
/// per-column mean over the values present; hours with no rows at all
/// become all-missing samples.
pub fn resample_hourly(
    rows: &[(DateTime<Utc>, HourlySample)],
) -> BTreeMap<DateTime<Utc>, HourlySample> {
    let mut acc: BTreeMap<DateTime<Utc>, [(f64, u32); 4]> = BTreeMap::new();
    for (ts, sample) in rows {
        let slots = acc.entry(floor_to_hour(*ts)).or_insert([(0.0, 0); 4]);
        for (slot, value) in slots.iter_mut().zip(sample.columns()) {
            if let Some(v) = value {
                slot.0 += v;
                slot.1 += 1;
            }
        }
    }

    let mut grid = BTreeMap::new();
    let (first, last) = match (acc.keys().next(), acc.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return grid,
    };
    for hour in HourRange(first, last) {
        let sample = acc.get(&hour).map(mean_sample).unwrap_or_default();
        grid.insert(hour, sample);
    }
    grid
}

fn fill_pass<'a>(samples: impl Iterator<Item = &'a mut HourlySample>) {
    let mut carried: [Option<f64>; 4] = [None; 4];
    for sample in samples {
        for (column, carry) in sample.columns_mut().into_iter().zip(carried.iter_mut()) {
            match column {
                Some(value) => *carry = Some(*value),
                None => *column = *carry,
            }
        }
    }
}

/// Forward-fills then backward-fills every column across the grid, so an
/// hour bounded by at least one real observation on either side ends up
/// fully populated.
pub fn fill_gaps(grid: &mut BTreeMap<DateTime<Utc>, HourlySample>) {
    fill_pass(grid.values_mut());
    fill_pass(grid.values_mut().rev());
}
