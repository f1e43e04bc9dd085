use chrono::NaiveDate;
use std::collections::HashMap;

use crate::types::RawRecord;

/// Count recorded for `date`, or 0 when no record matches.
///
/// Scans linearly and returns the first match. A record with an explicit zero
/// count reads the same as a missing record.
pub fn count_for(date: NaiveDate, records: &[RawRecord]) -> u64 {
    records
        .iter()
        .find(|record| record.date == date)
        .map(|record| record.count)
        .unwrap_or(0)
}

/// Per-date counts indexed once per loaded record set.
#[derive(Debug, Clone, Default)]
pub struct DayIndex {
    counts: HashMap<NaiveDate, u64>,
    max: u64,
}

impl DayIndex {
    /// Build the index. When several records share a date the first wins,
    /// matching [`count_for`].
    pub fn build(records: &[RawRecord]) -> Self {
        let mut counts = HashMap::with_capacity(records.len());
        for record in records {
            counts.entry(record.date).or_insert(record.count);
        }
        let max = counts.values().copied().max().unwrap_or(0);
        Self { counts, max }
    }

    pub fn count_for(&self, date: NaiveDate) -> u64 {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Largest indexed count, used to scale the calendar heat-view.
    pub fn max(&self) -> u64 {
        self.max
    }
}
