use egui::TextureHandle;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::analysis::{aggregate, CacheManager, DataSource, DayIndex};
use crate::config::Config;
use crate::error::Result;
use crate::plotting::{ChartRequest, RenderedChart};
use crate::types::{Bucket, CacheKey, ChartKind, GroupMode, Period, RawRecord, Selection};

/// A fetch the app is waiting on: the selection key it belongs to and the
/// period to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: CacheKey,
    pub period: Period,
}

/// Main application state
pub struct App {
    pub config: Config,
    pub selection: Selection,
    pub view: ChartKind,
    pub records: Arc<Vec<RawRecord>>,
    pub buckets: Vec<Bucket>,
    pub day_index: DayIndex,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub update_needed: bool,
    pub chart: Option<Arc<RenderedChart>>,
    pub chart_texture: Option<TextureHandle>,
    pub export_path: String,
    cache: CacheManager,
    // Keys with a fetch outstanding; at most one request per key
    pending: HashSet<CacheKey>,
}

impl App {
    pub fn with_config(config: Config) -> Self {
        let selection = Selection::new(config.default_year.clone());
        Self {
            config,
            selection,
            view: ChartKind::default(),
            records: Arc::new(Vec::new()),
            buckets: Vec::new(),
            day_index: DayIndex::default(),
            is_loading: false,
            error_message: None,
            update_needed: false,
            chart: None,
            chart_texture: None,
            export_path: "callstats_chart.png".to_string(),
            cache: CacheManager::new(),
            pending: HashSet::new(),
        }
    }

    pub fn period(&self) -> Option<Period> {
        Period::for_selection(&self.selection)
    }

    pub fn select_year(&mut self, year: &str) -> Option<FetchRequest> {
        let next = self.selection.with_year(year);
        self.apply_selection(next)
    }

    pub fn select_month(&mut self, month: &str) -> Option<FetchRequest> {
        let next = self.selection.with_month(month);
        self.apply_selection(next)
    }

    /// Clear the month and show the whole selected year.
    pub fn select_whole_year(&mut self) -> Option<FetchRequest> {
        let next = self.selection.whole_year();
        self.apply_selection(next)
    }

    pub fn select_group(&mut self, group: GroupMode) -> Option<FetchRequest> {
        let next = self.selection.with_group(group);
        self.apply_selection(next)
    }

    pub fn select_view(&mut self, view: ChartKind) {
        if self.view != view {
            self.view = view;
            self.update_needed = true;
        }
    }

    /// Replace the selection. Returns the fetch to start when the records for
    /// the new year and month are neither current nor cached.
    pub fn apply_selection(&mut self, selection: Selection) -> Option<FetchRequest> {
        if selection == self.selection {
            return None;
        }

        let same_records = selection.cache_key() == self.selection.cache_key();
        self.selection = selection;

        if same_records {
            self.recompute();
            return None;
        }
        self.request_current()
    }

    /// Load the current selection's records from the cache, or describe the
    /// fetch needed to get them. No request is issued while one for the same
    /// key is still outstanding; its result will be displayed instead.
    pub fn request_current(&mut self) -> Option<FetchRequest> {
        let key = self.selection.cache_key();

        if let Some(records) = self.cache.get(&key) {
            debug!(year = %key.year, month = ?key.month, "using cached records");
            self.is_loading = false;
            self.error_message = None;
            self.records = records;
            self.recompute();
            return None;
        }

        if self.pending.contains(&key) {
            debug!(year = %key.year, month = ?key.month, "fetch already in flight");
            self.is_loading = true;
            self.error_message = None;
            return None;
        }

        match self.period() {
            Some(period) => {
                self.is_loading = true;
                self.pending.insert(key.clone());
                Some(FetchRequest { key, period })
            }
            None => {
                self.is_loading = false;
                self.error_message = Some(format!(
                    "Invalid selection: {} {}",
                    key.year,
                    key.month.as_deref().unwrap_or("")
                ));
                self.records = Arc::new(Vec::new());
                self.recompute();
                None
            }
        }
    }

    /// Whole-year fetches for configured years neither cached nor in flight.
    /// The returned requests are marked outstanding.
    pub fn prefetch_requests(&mut self) -> Vec<FetchRequest> {
        let requests: Vec<FetchRequest> = self
            .config
            .years
            .iter()
            .map(|year| Selection::new(year.clone()))
            .filter(|selection| {
                let key = selection.cache_key();
                !self.cache.contains(&key) && !self.pending.contains(&key)
            })
            .filter_map(|selection| {
                Period::for_selection(&selection).map(|period| FetchRequest {
                    key: selection.cache_key(),
                    period,
                })
            })
            .collect();

        for request in &requests {
            self.pending.insert(request.key.clone());
        }
        requests
    }

    /// Commit a completed fetch.
    ///
    /// Successful results are memoized for their key. The displayed data is
    /// only replaced when `key` still matches the current selection; a late
    /// response for an earlier selection is dropped, and a failure never
    /// replaces records already cached for the key. Returns whether the
    /// displayed data changed.
    pub fn commit_fetch(&mut self, key: CacheKey, result: Result<Vec<RawRecord>>) -> bool {
        self.pending.remove(&key);
        let is_current = key == self.selection.cache_key();

        if let Err(e) = &result {
            if self.cache.contains(&key) {
                warn!(year = %key.year, month = ?key.month, error = %e, "fetch failed; keeping cached records");
                return false;
            }
        }

        let (records, error) = match result {
            Ok(records) => {
                let records = Arc::new(records);
                self.cache.store(key.clone(), records.clone());
                (records, None)
            }
            Err(e) => {
                warn!(year = %key.year, month = ?key.month, error = %e, "fetch failed");
                (Arc::new(Vec::new()), Some(format!("Failed to load data: {}", e)))
            }
        };

        if !is_current {
            debug!(year = %key.year, month = ?key.month, "discarding stale response");
            return false;
        }

        self.is_loading = false;
        self.error_message = error;
        self.records = records;
        self.recompute();
        true
    }

    /// Re-aggregate the current records for the current selection
    pub fn recompute(&mut self) {
        self.buckets = aggregate(&self.records, self.selection.effective_mode());
        self.day_index = DayIndex::build(&self.records);
        self.update_needed = true;
    }

    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.sum).fold(0, u64::saturating_add)
    }

    pub fn chart_title(&self) -> String {
        match &self.selection.month {
            Some(month) => format!("相談件数 {}年{}月", self.selection.year, month),
            None => format!("相談件数 {}年", self.selection.year),
        }
    }

    pub fn chart_request(&self) -> ChartRequest {
        ChartRequest::new(
            self.view,
            self.chart_title(),
            &self.buckets,
            self.period(),
            &self.day_index,
        )
    }

    /// Store a rendered chart if it still matches what the app shows.
    pub fn commit_chart(&mut self, request: &ChartRequest, chart: Arc<RenderedChart>) -> bool {
        if *request != self.chart_request() {
            return false;
        }
        self.chart = Some(chart);
        self.chart_texture = None;
        true
    }

    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    pub fn is_pending(&self, key: &CacheKey) -> bool {
        self.pending.contains(key)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

/// Run a fetch and commit its result to the shared app state.
pub async fn run_fetch(
    app: Arc<Mutex<App>>,
    source: Arc<dyn DataSource>,
    request: FetchRequest,
) -> bool {
    let result = source.fetch(&request.period).await;
    match app.lock() {
        Ok(mut app) => app.commit_fetch(request.key, result),
        Err(_) => {
            warn!("app state lock poisoned; dropping fetch result");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_selection_needs_fetch() {
        let mut app = App::default();
        let request = app.request_current().unwrap();

        assert_eq!(request.key, Selection::new("2020").cache_key());
        assert_eq!(request.period.from, ymd(2020, 1, 1));
        assert_eq!(request.period.till, ymd(2020, 12, 31));
        assert!(app.is_loading);
    }

    #[test]
    fn test_year_view_groups_by_month() {
        let mut app = App::default();
        let request = app.request_current().unwrap();
        let records = vec![
            RawRecord::new(ymd(2020, 1, 5), 3),
            RawRecord::new(ymd(2020, 1, 9), 4),
            RawRecord::new(ymd(2020, 2, 1), 5),
        ];

        assert!(app.commit_fetch(request.key, Ok(records)));
        assert_eq!(
            app.buckets,
            vec![Bucket::new("2020-1", 7), Bucket::new("2020-2", 5)]
        );
        assert_eq!(app.total_count(), 12);
        assert!(!app.is_loading);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut app = App::default();
        let february = app.select_month("2").unwrap();
        let march = app.select_month("3").unwrap();

        // February resolves after March was selected
        let changed = app.commit_fetch(
            february.key.clone(),
            Ok(vec![RawRecord::new(ymd(2020, 2, 3), 11)]),
        );
        assert!(!changed);
        assert!(app.records.is_empty());
        assert!(app.is_loading);
        // ...but it is still memoized for later
        assert!(app.is_cached(&february.key));

        assert!(app.commit_fetch(march.key, Ok(vec![RawRecord::new(ymd(2020, 3, 3), 2)])));
        assert_eq!(app.buckets, vec![Bucket::new("3", 2)]);

        // Going back to February needs no fetch
        assert!(app.select_month("2").is_none());
        assert_eq!(app.buckets, vec![Bucket::new("3", 11)]);
    }

    #[test]
    fn test_reselecting_in_flight_month_waits_for_first_request() {
        let mut app = App::default();
        let february = app.select_month("2").unwrap();
        let march = app.select_month("3").unwrap();

        // Back to February before its first fetch resolved
        assert!(app.select_month("2").is_none());
        assert!(app.is_loading);
        assert!(app.is_pending(&february.key));

        assert!(!app.commit_fetch(march.key, Ok(vec![RawRecord::new(ymd(2020, 3, 3), 2)])));
        assert!(app.commit_fetch(
            february.key.clone(),
            Ok(vec![RawRecord::new(ymd(2020, 2, 3), 11)])
        ));
        assert_eq!(app.buckets, vec![Bucket::new("3", 11)]);
        assert!(!app.is_loading);
        assert!(!app.is_pending(&february.key));
    }

    #[test]
    fn test_failure_keeps_cached_records_on_display() {
        let mut app = App::default();
        let february = app.select_month("2").unwrap();
        assert!(app.commit_fetch(
            february.key.clone(),
            Ok(vec![RawRecord::new(ymd(2020, 2, 3), 11)])
        ));

        // A failing response for a key that already has data
        assert!(!app.commit_fetch(february.key.clone(), Err(StatsError::Status(503))));
        assert_eq!(app.buckets, vec![Bucket::new("3", 11)]);
        assert_eq!(app.error_message, None);
        assert!(app.is_cached(&february.key));
    }

    #[test]
    fn test_selecting_prefetched_year_does_not_refetch() {
        let mut app = App::default();
        let current = app.request_current().unwrap();
        let prefetch = app.prefetch_requests();
        let years: Vec<&str> = prefetch.iter().map(|r| r.key.year.as_str()).collect();
        assert_eq!(years, vec!["2021", "2022"]);
        assert!(app.prefetch_requests().is_empty());

        app.commit_fetch(current.key, Ok(Vec::new()));
        assert!(app.select_year("2021").is_none());
        assert!(app.is_loading);

        let year_2021 = prefetch[0].clone();
        assert!(app.commit_fetch(
            year_2021.key,
            Ok(vec![RawRecord::new(ymd(2021, 5, 1), 4)])
        ));
        assert_eq!(app.buckets, vec![Bucket::new("2021-5", 4)]);
    }

    #[test]
    fn test_whole_year_after_month() {
        let mut app = App::default();
        let year = app.request_current().unwrap();
        app.commit_fetch(
            year.key,
            Ok(vec![
                RawRecord::new(ymd(2020, 1, 5), 3),
                RawRecord::new(ymd(2020, 4, 9), 4),
            ]),
        );
        app.select_month("4");

        assert!(app.select_whole_year().is_none());
        assert_eq!(app.selection.month, None);
        assert_eq!(
            app.buckets,
            vec![Bucket::new("2020-1", 3), Bucket::new("2020-4", 4)]
        );
    }

    #[test]
    fn test_total_count_saturates() {
        let mut app = App::default();
        let request = app.select_month("1").unwrap();
        app.commit_fetch(
            request.key,
            Ok(vec![
                RawRecord::new(ymd(2020, 1, 1), u64::MAX),
                RawRecord::new(ymd(2020, 1, 2), 5),
            ]),
        );
        assert_eq!(app.total_count(), u64::MAX);
    }

    #[test]
    fn test_group_change_reaggregates_without_fetch() {
        let mut app = App::default();
        let request = app.select_month("1").unwrap();
        app.commit_fetch(
            request.key,
            Ok(vec![
                RawRecord::new(ymd(2020, 1, 1), 1),
                RawRecord::new(ymd(2020, 1, 8), 2),
                RawRecord::new(ymd(2020, 1, 2), 4),
            ]),
        );
        assert_eq!(app.buckets.len(), 3);

        assert!(app.select_group(GroupMode::Weekday).is_none());
        assert_eq!(
            app.buckets,
            vec![Bucket::new("水曜日", 3), Bucket::new("木曜日", 4)]
        );
    }

    #[test]
    fn test_fetch_failure_shows_empty_state() {
        let mut app = App::default();
        let request = app.request_current().unwrap();

        assert!(app.commit_fetch(request.key.clone(), Err(StatsError::Status(500))));
        assert!(app.buckets.is_empty());
        assert!(app.error_message.is_some());
        assert!(!app.is_loading);
        // Failures are not memoized
        assert!(!app.is_cached(&request.key));
        assert!(app.request_current().is_some());
    }

    #[test]
    fn test_selecting_year_clears_month_and_refetches() {
        let mut app = App::default();
        app.select_month("6");
        let request = app.select_year("2021").unwrap();

        assert_eq!(app.selection.month, None);
        assert_eq!(request.period.till, ymd(2021, 12, 31));
    }

    #[test]
    fn test_prefetch_skips_cached_years() {
        let mut app = App::default();
        let request = app.request_current().unwrap();
        app.commit_fetch(request.key, Ok(Vec::new()));

        let years: Vec<String> = app
            .prefetch_requests()
            .into_iter()
            .map(|r| r.key.year)
            .collect();
        assert_eq!(years, vec!["2021".to_string(), "2022".to_string()]);
    }

    #[test]
    fn test_chart_title() {
        let mut app = App::default();
        assert_eq!(app.chart_title(), "相談件数 2020年");
        app.select_month("4");
        assert_eq!(app.chart_title(), "相談件数 2020年4月");
    }
}
