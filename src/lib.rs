//! # Call Center Statistics Viewer
//!
//! `callstats` fetches the Tokyo COVID-19 call-center statistics from the
//! metropolitan open-data API and turns the daily records into chart-ready
//! series: a line chart, a pie chart and a calendar heat-view, driven by
//! year, month and grouping selectors.
//!
//! ## Features
//!
//! - Resolve the inclusive date range for a year or a single month
//! - Aggregate daily counts by month, day of month, weekday or timestamp
//! - Per-day lookups for calendar cells
//! - Memoized fetches keyed by year and month, last request wins
//! - Cached chart rendering with PNG export
//!
//! ## Example
//!
//! ```
//! use callstats::analysis::{aggregate, resolve_period};
//! use callstats::types::{GroupMode, RawRecord};
//! use chrono::NaiveDate;
//!
//! let period = resolve_period("2020", Some("2")).unwrap();
//! assert_eq!(period.till_param(), "2020-02-29");
//!
//! let records = vec![
//!     RawRecord::new(NaiveDate::from_ymd_opt(2020, 2, 5).unwrap(), 1),
//!     RawRecord::new(NaiveDate::from_ymd_opt(2020, 2, 3).unwrap(), 2),
//!     RawRecord::new(NaiveDate::from_ymd_opt(2020, 3, 5).unwrap(), 3),
//! ];
//! let buckets = aggregate(&records, GroupMode::Day);
//! assert_eq!(buckets[0].label, "5");
//! assert_eq!(buckets[0].sum, 4);
//! ```

pub mod analysis;
pub mod app;
pub mod config;
pub mod error;
pub mod plotting;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use app::App as CallStatsApp;
pub use error::{Result, StatsError};
pub use types::{Bucket, CacheKey, GroupMode, Period, RawRecord, Selection};
