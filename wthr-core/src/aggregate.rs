//! Hourly reduction of the historical series.

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};

use crate::{
    coerce::{ParseError, coerce},
    model::{BucketedRecord, Reading},
};

#[derive(Debug)]
struct HourBucket {
    sum: f64,
    count: u32,
    /// Start of the hour in ms; identical for every sample in the bucket.
    first: i64,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    hour_start: i64,
    tempf: f64,
}

/// Reduce raw historical readings to one averaged record per UTC hour.
///
/// Samples without `tempf`/`dateutc`, or whose values cannot be read as
/// numbers, are dropped. `dateutc` is milliseconds since the Unix epoch.
/// The result is ascending by `dateutc` regardless of input order.
pub fn aggregate(series: &[Reading]) -> Vec<BucketedRecord> {
    let mut buckets: BTreeMap<i64, HourBucket> = BTreeMap::new();
    let mut skipped = 0usize;

    for reading in series {
        let sample = match read_sample(reading) {
            Some(Ok(sample)) => sample,
            Some(Err(err)) => {
                tracing::trace!(error = %err, "skipping unparseable sample");
                skipped += 1;
                continue;
            }
            None => {
                skipped += 1;
                continue;
            }
        };

        let bucket = buckets.entry(sample.hour_start).or_insert_with(|| HourBucket {
            sum: 0.0,
            count: 0,
            first: sample.hour_start,
        });
        bucket.sum += sample.tempf;
        bucket.count += 1;
    }

    let records: Vec<BucketedRecord> = buckets
        .into_values()
        .filter(|bucket| bucket.count > 0)
        .map(|bucket| BucketedRecord {
            tempf: round_tenths(bucket.sum / f64::from(bucket.count)),
            dateutc: bucket.first,
        })
        .collect();

    tracing::debug!(
        original_count = series.len(),
        skipped,
        bucketed_count = records.len(),
        "aggregated samples into hourly buckets"
    );

    records
}

/// `None` when either field is absent, `Some(Err)` when present but unreadable.
fn read_sample(reading: &Reading) -> Option<Result<Sample, ParseError>> {
    let tempf = reading.get("tempf")?;
    let dateutc = reading.get("dateutc")?;

    Some(coerce::<i64>(dateutc).and_then(|ms| {
        let hour_start = floor_to_hour(ms)?;
        let tempf = coerce::<f64>(tempf)?;
        Ok(Sample { hour_start, tempf })
    }))
}

fn floor_to_hour(ms: i64) -> Result<i64, ParseError> {
    let at = DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| ParseError::out_of_range("timestamp", ms))?;
    let hour = at
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| ParseError::out_of_range("timestamp", ms))?;

    Ok(hour.timestamp_millis())
}

fn round_tenths(value: f64) -> f64 {
    // f64::round rounds half away from zero
    (value * 10.0).round() / 10.0
}
