use chrono::{DateTime, TimeDelta, Utc};
use std::mem::replace;

/// An hour range iterator that yields each hour-aligned timestamp from
/// the start through the end (inclusive).
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct HourRange(pub DateTime<Utc>, pub DateTime<Utc>);

impl Iterator for HourRange {
    type Item = DateTime<Utc>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + TimeDelta::try_hours(1).unwrap();
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

/// Truncates a timestamp to the start of its hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp() - ts.timestamp().rem_euclid(3600);
    DateTime::from_timestamp(secs, 0).unwrap()
}
