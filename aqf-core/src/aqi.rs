//! Piecewise-linear AQI computation over pollutant breakpoint tables.

use crate::observation::HourlySample;

/// One bracket of a pollutant breakpoint table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub index_low: f64,
    pub index_high: f64,
    pub conc_low: f64,
    pub conc_high: f64,
}

impl Breakpoint {
    pub const fn new(index_low: f64, index_high: f64, conc_low: f64, conc_high: f64) -> Self {
        Breakpoint {
            index_low,
            index_high,
            conc_low,
            conc_high,
        }
    }
}

/// PM2.5 brackets, as deployed with the trained model
pub const PM25_BREAKPOINTS: [Breakpoint; 4] = [
    Breakpoint::new(0.0, 50.0, 0.0, 50.0),
    Breakpoint::new(51.0, 100.0, 51.0, 100.0),
    Breakpoint::new(101.0, 200.0, 101.0, 200.0),
    Breakpoint::new(201.0, 300.0, 201.0, 300.0),
];

/// PM10 brackets, as deployed with the trained model
pub const PM10_BREAKPOINTS: [Breakpoint; 4] = [
    Breakpoint::new(0.0, 50.0, 0.0, 50.0),
    Breakpoint::new(51.0, 100.0, 51.0, 100.0),
    Breakpoint::new(101.0, 250.0, 101.0, 200.0),
    Breakpoint::new(251.0, 350.0, 201.0, 300.0),
];

/// CO brackets, as deployed with the trained model
pub const CO_BREAKPOINTS: [Breakpoint; 4] = [
    Breakpoint::new(0.0, 1.0, 0.0, 50.0),
    Breakpoint::new(1.1, 2.0, 51.0, 100.0),
    Breakpoint::new(2.1, 10.0, 101.0, 200.0),
    Breakpoint::new(10.1, 17.0, 201.0, 300.0),
];

/// Computes the sub-index for one pollutant concentration.
///
/// Scans the ordered brackets first; a concentration inside a bracket is
/// interpolated linearly (a zero-width bracket short-circuits to its low
/// index). Concentrations outside the table clamp to the nearest table
/// bound, while a concentration falling between two brackets has no
/// defined sub-index and yields `None`.
pub fn pollutant_sub_index(concentration: f64, breakpoints: &[Breakpoint]) -> Option<f64> {
    for bp in breakpoints {
        if bp.conc_low <= concentration && concentration <= bp.conc_high {
            if bp.conc_high == bp.conc_low {
                return Some(bp.index_low);
            }
            let slope = (bp.index_high - bp.index_low) / (bp.conc_high - bp.conc_low);
            return Some(slope * (concentration - bp.conc_low) + bp.index_low);
        }
    }
    let first = breakpoints.first()?;
    let last = breakpoints.last()?;
    if concentration < first.conc_low {
        Some(first.index_low)
    } else if concentration > last.conc_high {
        Some(last.index_high)
    } else {
        None
    }
}

/// Overall AQI for one sample: the maximum sub-index over the pollutants
/// that are present. Missing pollutants and undefined sub-indices are
/// excluded; `None` when nothing contributes.
pub fn overall_aqi(sample: &HourlySample) -> Option<f64> {
    let readings = [
        (sample.pm25, PM25_BREAKPOINTS.as_slice()),
        (sample.pm10, PM10_BREAKPOINTS.as_slice()),
        (sample.co, CO_BREAKPOINTS.as_slice()),
    ];
    readings
        .into_iter()
        .filter_map(|(value, table)| value.and_then(|c| pollutant_sub_index(c, table)))
        .reduce(f64::max)
}
