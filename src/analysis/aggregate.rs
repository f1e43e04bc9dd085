use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::types::{Bucket, GroupMode, RawRecord, WEEKDAY_NAMES};

/// Derive the bucket label for a date under a grouping mode.
pub fn bucket_key(date: NaiveDate, mode: GroupMode) -> String {
    match mode {
        GroupMode::Month => format!("{}-{}", date.year(), date.month()),
        // Day of month only: same-numbered days of different months share a bucket
        GroupMode::Day => date.day().to_string(),
        GroupMode::Weekday => {
            WEEKDAY_NAMES[date.weekday().num_days_from_sunday() as usize].to_string()
        }
        GroupMode::Raw => date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            .unwrap_or_else(|| date.to_string()),
    }
}

/// Sum record counts into buckets keyed by `mode`.
///
/// Buckets come out in the order their key was first seen while scanning
/// `records`; nothing is sorted.
pub fn aggregate(records: &[RawRecord], mode: GroupMode) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = bucket_key(record.date, mode);
        match positions.get(&key) {
            Some(&idx) => {
                let bucket = &mut buckets[idx];
                bucket.sum = bucket.sum.saturating_add(record.count);
            }
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push(Bucket::new(key, record.count));
            }
        }
    }

    buckets
}
