use async_trait::async_trait;
use callstats::analysis::{aggregate, count_for, resolve_period, DataSource, DayIndex};
use callstats::app::{run_fetch, App};
use callstats::types::{Bucket, GroupMode, Period, RawRecord};
use callstats::{Result, StatsError};
use chrono::{Datelike, NaiveDate};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Two years of synthetic daily records: count = day of month.
fn sample_records() -> Vec<RawRecord> {
    let period = Period {
        from: ymd(2020, 1, 1),
        till: ymd(2021, 12, 31),
    };
    period
        .days()
        .map(|date| RawRecord::new(date, date.day() as u64))
        .collect()
}

/// Serves `sample_records`, holding back February 2020 until released.
struct GatedSource {
    records: Vec<RawRecord>,
    february_gate: Notify,
}

#[async_trait]
impl DataSource for GatedSource {
    async fn fetch(&self, period: &Period) -> Result<Vec<RawRecord>> {
        if period.from == ymd(2020, 2, 1) {
            self.february_gate.notified().await;
        }
        if period.from.year() > 2021 {
            return Err(StatsError::Status(404));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.date >= period.from && r.date <= period.till)
            .cloned()
            .collect())
    }
}

#[tokio::test]
async fn test_full_workflow() {
    let source = Arc::new(GatedSource {
        records: sample_records(),
        february_gate: Notify::new(),
    });
    let app = Arc::new(Mutex::new(App::default()));

    // Initial whole-year load groups by month
    let request = app.lock().unwrap().request_current().unwrap();
    assert!(run_fetch(app.clone(), source.clone(), request).await);
    {
        let app = app.lock().unwrap();
        assert_eq!(app.buckets.len(), 12);
        assert_eq!(app.buckets[0], Bucket::new("2020-1", (1..=31).sum()));
        assert_eq!(app.buckets[1], Bucket::new("2020-2", (1..=29).sum()));
    }

    // February is requested, then March before February resolves
    let february = app.lock().unwrap().select_month("2").unwrap();
    let slow = tokio::spawn(run_fetch(app.clone(), source.clone(), february));
    tokio::task::yield_now().await;

    let march = app.lock().unwrap().select_month("3").unwrap();
    assert!(run_fetch(app.clone(), source.clone(), march).await);

    source.february_gate.notify_one();
    assert!(!slow.await.unwrap());

    {
        let app = app.lock().unwrap();
        assert_eq!(app.selection.month.as_deref(), Some("3"));
        assert_eq!(app.buckets.len(), 31);
        assert_eq!(app.buckets[0], Bucket::new("1", 1));
        assert_eq!(app.day_index.count_for(ymd(2020, 3, 15)), 15);
        assert_eq!(app.day_index.count_for(ymd(2020, 2, 15)), 0);
    }

    // Weekday grouping of March 2020: five Sundays, Mondays and Tuesdays
    {
        let mut app = app.lock().unwrap();
        assert!(app.select_group(GroupMode::Weekday).is_none());
        assert_eq!(app.buckets.len(), 7);
        assert_eq!(app.buckets[0].label, "日曜日");
        assert_eq!(app.total_count(), (1..=31).sum::<u64>());
    }

    // The stale February response was memoized
    {
        let mut app = app.lock().unwrap();
        assert!(app.select_month("2").is_none());
        assert_eq!(app.total_count(), (1..=29).sum::<u64>());
    }
}

#[tokio::test]
async fn test_fetch_failure_recovers_to_empty_state() {
    let source = Arc::new(GatedSource {
        records: sample_records(),
        february_gate: Notify::new(),
    });
    let app = Arc::new(Mutex::new(App::default()));

    let request = app.lock().unwrap().select_year("2022").unwrap();
    assert!(run_fetch(app.clone(), source.clone(), request).await);

    let app = app.lock().unwrap();
    assert!(app.buckets.is_empty());
    assert!(app.error_message.is_some());
    assert!(!app.is_loading);
}

#[test]
fn test_pipeline_properties() {
    let records = sample_records();
    let total: u64 = records.iter().map(|r| r.count).sum();

    for mode in [GroupMode::Month, GroupMode::Day, GroupMode::Weekday, GroupMode::Raw] {
        let buckets = aggregate(&records, mode);
        assert_eq!(buckets, aggregate(&records, mode));
        assert_eq!(buckets.iter().map(|b| b.sum).sum::<u64>(), total);
    }

    // Day grouping across two years merges same-numbered days
    let by_day = aggregate(&records, GroupMode::Day);
    assert_eq!(by_day.len(), 31);
    assert_eq!(by_day[30], Bucket::new("31", 31 * 14));

    let period = resolve_period("2021", Some("2")).unwrap();
    assert_eq!(period.till, ymd(2021, 2, 28));

    let index = DayIndex::build(&records);
    for date in period.days() {
        assert_eq!(index.count_for(date), count_for(date, &records));
    }
    assert_eq!(count_for(ymd(2020, 3, 15), &[]), 0);
}
