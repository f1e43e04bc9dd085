//! # Common Types
//!
//! This module contains the common types used throughout the application for
//! representing call-center records, aggregation buckets, query periods and
//! the current selection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Weekday labels indexed by `num_days_from_sunday` (0 = Sunday).
pub const WEEKDAY_NAMES: [&str; 7] = [
    "日曜日", "月曜日", "火曜日", "水曜日", "木曜日", "金曜日", "土曜日",
];

/// One daily observation as supplied by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Calendar date the consultations were received on
    pub date: NaiveDate,
    /// Number of consultations recorded on `date`
    pub count: u64,
    /// Local government code, carried but unused by aggregation
    pub region_code: Option<String>,
    /// Prefecture name, carried but unused by aggregation
    pub prefecture: Option<String>,
    /// Municipality name, carried but unused by aggregation
    pub municipality: Option<String>,
}

impl RawRecord {
    /// Build a record with no region metadata.
    pub fn new(date: NaiveDate, count: u64) -> Self {
        Self {
            date,
            count,
            region_code: None,
            prefecture: None,
            municipality: None,
        }
    }
}

/// An aggregation output slot: a derived label and its running sum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Bucket {
    pub label: String,
    pub sum: u64,
}

impl Bucket {
    pub fn new(label: impl Into<String>, sum: u64) -> Self {
        Self {
            label: label.into(),
            sum,
        }
    }
}

/// An inclusive `[from, till]` date range used to query the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub from: NaiveDate,
    pub till: NaiveDate,
}

impl Period {
    /// `from` formatted as `YYYY-MM-DD`.
    pub fn from_param(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// `till` formatted as `YYYY-MM-DD`.
    pub fn till_param(&self) -> String {
        self.till.format("%Y-%m-%d").to_string()
    }

    /// Every date of the period in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.from.iter_days().take_while(move |d| *d <= self.till)
    }
}

/// The dimension along which daily records are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GroupMode {
    /// `"<year>-<month>"`, month not zero padded
    Month,
    /// Day of month, `"1"`..`"31"`
    #[default]
    Day,
    /// Weekday label from [`WEEKDAY_NAMES`]
    Weekday,
    /// Full ISO-8601 timestamp, effectively ungrouped
    Raw,
}

impl GroupMode {
    /// Modes offered by the group selector while a month is selected.
    pub const SELECTABLE: [GroupMode; 2] = [GroupMode::Day, GroupMode::Weekday];

    /// Parse a selector value. Unknown values select [`GroupMode::Raw`].
    pub fn parse(value: &str) -> Self {
        match value {
            "month" => GroupMode::Month,
            "day" => GroupMode::Day,
            "weekday" => GroupMode::Weekday,
            _ => GroupMode::Raw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupMode::Month => "month",
            GroupMode::Day => "day",
            GroupMode::Weekday => "weekday",
            GroupMode::Raw => "raw",
        }
    }
}

/// A key used for memoizing fetched records by requested year and month.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    /// The requested year, e.g. `"2020"`
    pub year: String,
    /// The requested month, `"1"`..`"12"`, or `None` for the whole year
    pub month: Option<String>,
}

/// The user's current choice of year, month and grouping.
///
/// Selections are immutable values: every selector change produces a new
/// `Selection` which drives the resolve → fetch → aggregate pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub year: String,
    pub month: Option<String>,
    pub group: GroupMode,
}

impl Selection {
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            month: None,
            group: GroupMode::Day,
        }
    }

    /// Selecting a year clears the month.
    pub fn with_year(&self, year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            month: None,
            group: self.group,
        }
    }

    pub fn with_month(&self, month: impl Into<String>) -> Self {
        Self {
            year: self.year.clone(),
            month: Some(month.into()),
            group: self.group,
        }
    }

    /// The same year with the month cleared.
    pub fn whole_year(&self) -> Self {
        Self {
            year: self.year.clone(),
            month: None,
            group: self.group,
        }
    }

    pub fn with_group(&self, group: GroupMode) -> Self {
        Self {
            year: self.year.clone(),
            month: self.month.clone(),
            group,
        }
    }

    /// Whole-year selections are always grouped by month.
    pub fn effective_mode(&self) -> GroupMode {
        if self.month.is_some() {
            self.group
        } else {
            GroupMode::Month
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            year: self.year.clone(),
            month: self.month.clone(),
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new("2020")
    }
}

/// The rendering sink currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartKind {
    #[default]
    Line,
    Pie,
    Calendar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Line, ChartKind::Pie, ChartKind::Calendar];

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Line => "Line Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Calendar => "Calendar",
        }
    }
}
