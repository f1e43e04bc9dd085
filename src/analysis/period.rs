use chrono::{Datelike, NaiveDate};

use crate::types::{Period, Selection};

/// Resolve the inclusive date range to request for a year and optional month.
///
/// Without a month the whole calendar year is covered. With a month the range
/// ends on that month's last day, found as the day before the first of the
/// following month, so leap years come out right.
///
/// Callers pass a numeric year and a month in `"1"..="12"`. Anything else is
/// outside the contract and yields `None`.
pub fn resolve_period(year: &str, month: Option<&str>) -> Option<Period> {
    let year: i32 = year.trim().parse().ok()?;

    match month {
        None => Some(Period {
            from: NaiveDate::from_ymd_opt(year, 1, 1)?,
            till: NaiveDate::from_ymd_opt(year, 12, 31)?,
        }),
        Some(month) => {
            let month: u32 = month.trim().parse().ok()?;
            let from = NaiveDate::from_ymd_opt(year, month, 1)?;
            Some(Period {
                from,
                till: last_day_of_month(from)?,
            })
        }
    }
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    let (next_year, next_month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

impl Period {
    /// Resolve the period for a selection.
    pub fn for_selection(selection: &Selection) -> Option<Period> {
        resolve_period(&selection.year, selection.month.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_whole_year() {
        let period = resolve_period("2021", None).unwrap();
        assert_eq!(period.from_param(), "2021-01-01");
        assert_eq!(period.till_param(), "2021-12-31");
    }

    #[test]
    fn test_leap_february() {
        let period = resolve_period("2020", Some("2")).unwrap();
        assert_eq!(period.from_param(), "2020-02-01");
        assert_eq!(period.till_param(), "2020-02-29");
    }

    #[test]
    fn test_common_february() {
        let period = resolve_period("2021", Some("2")).unwrap();
        assert_eq!(period.till, ymd(2021, 2, 28));
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(resolve_period("2022", Some("4")).unwrap().till, ymd(2022, 4, 30));
        assert_eq!(resolve_period("2022", Some("7")).unwrap().till, ymd(2022, 7, 31));
        assert_eq!(resolve_period("2022", Some("12")).unwrap().till, ymd(2022, 12, 31));
        assert_eq!(resolve_period("1900", Some("2")).unwrap().till, ymd(1900, 2, 28));
        assert_eq!(resolve_period("2000", Some("2")).unwrap().till, ymd(2000, 2, 29));
    }

    #[test]
    fn test_single_digit_month_is_zero_padded() {
        let period = resolve_period("2020", Some("3")).unwrap();
        assert_eq!(period.from_param(), "2020-03-01");
        assert_eq!(period.till_param(), "2020-03-31");
    }

    #[test]
    fn test_outside_contract() {
        assert!(resolve_period("twenty", None).is_none());
        assert!(resolve_period("2020", Some("13")).is_none());
        assert!(resolve_period("2020", Some("0")).is_none());
    }

    #[test]
    fn test_for_selection() {
        let selection = Selection::new("2020").with_month("11");
        let period = Period::for_selection(&selection).unwrap();
        assert_eq!(period.from, ymd(2020, 11, 1));
        assert_eq!(period.till, ymd(2020, 11, 30));
    }
}
