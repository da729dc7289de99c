//! Calendar-date helpers shared by every view.
//!
//! Dates travel as `YYYY-MM-DD` strings on the wire and as
//! [`NaiveDate`] everywhere else. Display strings use the Italian short
//! forms the app is written in (`04 mar`, `lun 04 mar 2024`).

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Deserializer};

const MONTHS_SHORT: [&str; 12] = [
    "gen", "feb", "mar", "apr", "mag", "giu", "lug", "ago", "set", "ott", "nov", "dic",
];

const WEEKDAYS_SHORT: [&str; 7] = ["lun", "mar", "mer", "gio", "ven", "sab", "dom"];

/// Number of cells in a month page of the date picker (6 rows of 7 days).
pub const MONTH_GRID_CELLS: usize = 42;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    pub with_year: bool,
    pub with_weekday: bool,
}

impl DisplayOptions {
    pub fn with_year() -> Self {
        Self { with_year: true, with_weekday: false }
    }

    pub fn with_weekday() -> Self {
        Self { with_year: false, with_weekday: true }
    }
}

/// Parses a strict `YYYY-MM-DD` string.
///
/// Anything else (missing padding, trailing time, impossible calendar dates
/// such as `2024-02-30`, year zero) yields `None`.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let year: i32 = value[0..4].parse().ok()?;
    let month: u32 = value[5..7].parse().ok()?;
    let day: u32 = value[8..10].parse().ok()?;
    if year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_field<E: serde::de::Error>(value: &str) -> Result<NaiveDate, E> {
    parse_iso_date(value)
        .ok_or_else(|| E::custom(format!("invalid date {:?}, expected YYYY-MM-DD", value)))
}

/// `deserialize_with` helper: a strict `YYYY-MM-DD` date.
pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_field(&raw)
}

/// Like [`deserialize_date`]; `null` is `None`. Pair with `#[serde(default)]`.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_field(&raw).map(Some),
        None => Ok(None),
    }
}

/// A list of strict dates; `null` reads as empty. Pair with `#[serde(default)]`.
pub fn deserialize_date_list<'de, D>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer)?
        .unwrap_or_default()
        .iter()
        .map(|raw| parse_field(raw))
        .collect()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn today_iso() -> String {
    format_iso_date(today())
}

/// Monday of the week containing `date`. Weeks run Monday to Sunday.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as i64;
    add_days(date, -offset)
}

/// Like [`start_of_week`] but for a timestamp; the result is at midnight.
pub fn start_of_week_at(moment: NaiveDateTime) -> NaiveDateTime {
    start_of_week(moment.date()).and_time(NaiveTime::MIN)
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + TimeDelta::days(days)
}

fn month_short(date: NaiveDate) -> &'static str {
    MONTHS_SHORT[date.month0() as usize]
}

fn weekday_short(date: NaiveDate) -> &'static str {
    WEEKDAYS_SHORT[date.weekday().num_days_from_monday() as usize]
}

pub fn display_date(date: NaiveDate, options: DisplayOptions) -> String {
    let mut out = String::new();
    if options.with_weekday {
        out.push_str(weekday_short(date));
        out.push(' ');
    }
    out.push_str(&format!("{:02} {}", date.day(), month_short(date)));
    if options.with_year {
        out.push_str(&format!(" {}", date.year()));
    }
    out
}

/// Formats an ISO date for display, handing back the input untouched when it
/// does not parse.
pub fn format_display_date(value: &str, options: DisplayOptions) -> String {
    match parse_iso_date(value) {
        Some(date) => display_date(date, options),
        None => value.to_string(),
    }
}

/// Compact label for a set of work days, e.g. `04-06 mar` for a run of
/// consecutive days or `04 mar, 20 mar +2` for a scattered set.
pub fn format_work_days_summary(days: &[NaiveDate]) -> String {
    let mut sorted = days.to_vec();
    sorted.sort();
    sorted.dedup();

    if sorted.is_empty() {
        return String::new();
    }

    let consecutive = sorted
        .windows(2)
        .all(|pair| pair[1] - pair[0] == TimeDelta::days(1));

    let plain = |date: &NaiveDate| display_date(*date, DisplayOptions::default());

    if consecutive && sorted.len() > 1 {
        let start = sorted[0];
        let end = sorted[sorted.len() - 1];
        if start.year() == end.year() && start.month() == end.month() {
            return format!("{:02}-{:02} {}", start.day(), end.day(), month_short(end));
        }
        return format!("{} - {}", plain(&start), plain(&end));
    }

    if sorted.len() <= 2 {
        return sorted.iter().map(plain).collect::<Vec<_>>().join(", ");
    }

    let first_two = sorted[..2].iter().map(plain).collect::<Vec<_>>().join(", ");
    format!("{} +{}", first_two, sorted.len() - 2)
}

/// The 42 dates of a Monday-first calendar page showing the month of `date`.
pub fn month_grid(date: NaiveDate) -> Vec<NaiveDate> {
    let first = date.with_day(1).unwrap_or(date);
    let grid_start = start_of_week(first);
    (0..MONTH_GRID_CELLS as i64)
        .map(|offset| add_days(grid_start, offset))
        .collect()
}

/// Multi-select toggle used by the work-day picker.
pub fn toggle_day(days: &[NaiveDate], day: NaiveDate) -> Vec<NaiveDate> {
    let mut next = days.to_vec();
    if next.contains(&day) {
        next.retain(|d| *d != day);
    } else {
        next.push(day);
    }
    next.sort();
    next.dedup();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date(s).expect("valid date")
    }

    #[test]
    fn test_parse_roundtrips_valid_dates() {
        for s in ["2024-03-04", "2024-02-29", "1999-12-31", "2030-01-01"] {
            let parsed = parse_iso_date(s).expect("should parse");
            assert_eq!(format_iso_date(parsed), s);
        }
    }

    #[test]
    fn test_parse_rejects_malformed_and_impossible() {
        for s in [
            "",
            "2024-02-30",
            "2023-02-29",
            "2024-13-01",
            "2024-00-10",
            "0000-01-01",
            "2024-3-04",
            "2024/03/04",
            "2024-03-04T10:00:00",
            " 2024-03-04",
            "abcd-ef-gh",
        ] {
            assert_eq!(parse_iso_date(s), None, "{s:?} should not parse");
        }
    }

    #[test]
    fn test_start_of_week_wednesday_and_sunday() {
        let wednesday = d("2024-03-06");
        assert_eq!(wednesday.weekday(), Weekday::Wed);
        assert_eq!(start_of_week(wednesday), d("2024-03-04"));

        let sunday = d("2024-03-10");
        assert_eq!(sunday.weekday(), Weekday::Sun);
        assert_eq!(start_of_week(sunday), d("2024-03-04"));

        let monday = d("2024-03-04");
        assert_eq!(start_of_week(monday), monday);
    }

    #[test]
    fn test_start_of_week_at_zeroes_time() {
        let moment = d("2024-03-06").and_hms_opt(17, 45, 12).expect("valid time");
        let start = start_of_week_at(moment);
        assert_eq!(start.date(), d("2024-03-04"));
        assert_eq!(start.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_add_days_rolls_over_months_and_years() {
        assert_eq!(add_days(d("2024-02-28"), 1), d("2024-02-29"));
        assert_eq!(add_days(d("2024-02-29"), 1), d("2024-03-01"));
        assert_eq!(add_days(d("2024-12-31"), 1), d("2025-01-01"));
        assert_eq!(add_days(d("2025-01-01"), -1), d("2024-12-31"));
        assert_eq!(add_days(d("2024-03-04"), -7), d("2024-02-26"));
    }

    #[test]
    fn test_format_display_date_variants() {
        assert_eq!(format_display_date("2024-03-04", DisplayOptions::default()), "04 mar");
        assert_eq!(format_display_date("2024-03-04", DisplayOptions::with_year()), "04 mar 2024");
        assert_eq!(format_display_date("2024-03-04", DisplayOptions::with_weekday()), "lun 04 mar");
        let both = DisplayOptions { with_year: true, with_weekday: true };
        assert_eq!(format_display_date("2024-12-25", both), "mer 25 dic 2024");
    }

    #[test]
    fn test_format_display_date_falls_back_to_input() {
        assert_eq!(format_display_date("not a date", DisplayOptions::default()), "not a date");
        assert_eq!(format_display_date("2024-02-30", DisplayOptions::with_year()), "2024-02-30");
    }

    #[test]
    fn test_work_days_summary_consecutive_same_month() {
        let days = [d("2024-03-04"), d("2024-03-05"), d("2024-03-06")];
        assert_eq!(format_work_days_summary(&days), "04-06 mar");
    }

    #[test]
    fn test_work_days_summary_consecutive_across_months() {
        let days = [d("2024-03-31"), d("2024-04-01")];
        assert_eq!(format_work_days_summary(&days), "31 mar - 01 apr");
    }

    #[test]
    fn test_work_days_summary_scattered() {
        assert_eq!(format_work_days_summary(&[]), "");
        assert_eq!(format_work_days_summary(&[d("2024-03-04")]), "04 mar");
        assert_eq!(
            format_work_days_summary(&[d("2024-03-20"), d("2024-03-04")]),
            "04 mar, 20 mar"
        );
        let four = [d("2024-03-04"), d("2024-03-08"), d("2024-03-12"), d("2024-03-20")];
        assert_eq!(format_work_days_summary(&four), "04 mar, 08 mar +2");
    }

    #[test]
    fn test_work_days_summary_ignores_duplicates() {
        let days = [d("2024-03-05"), d("2024-03-04"), d("2024-03-05")];
        assert_eq!(format_work_days_summary(&days), "04-05 mar");
    }

    #[test]
    fn test_month_grid_starts_on_monday_before_first() {
        // March 2024 starts on a Friday.
        let grid = month_grid(d("2024-03-17"));
        assert_eq!(grid.len(), MONTH_GRID_CELLS);
        assert_eq!(grid[0], d("2024-02-26"));
        assert_eq!(grid[4], d("2024-03-01"));
        assert_eq!(grid[41], d("2024-04-07"));
    }

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(deserialize_with = "deserialize_date")]
        day: NaiveDate,
        #[serde(default, deserialize_with = "deserialize_optional_date")]
        due: Option<NaiveDate>,
        #[serde(default, deserialize_with = "deserialize_date_list")]
        days: Vec<NaiveDate>,
    }

    #[test]
    fn test_date_fields_use_strict_format() {
        let form: Form = serde_json::from_str(
            r#"{"day":"2024-03-05","due":null,"days":["2024-03-07","2024-03-06"]}"#,
        )
        .expect("valid form");
        assert_eq!(form.day, d("2024-03-05"));
        assert_eq!(form.due, None);
        assert_eq!(form.days, vec![d("2024-03-07"), d("2024-03-06")]);

        let form: Form = serde_json::from_str(r#"{"day":"2024-03-05"}"#).expect("defaults");
        assert!(form.days.is_empty());

        for bad in [
            r#"{"day":"2024-3-5"}"#,
            r#"{"day":"+2024-03-05"}"#,
            r#"{"day":"2024-03-05","due":"2024-03-5"}"#,
            r#"{"day":"2024-03-05","days":["2024-02-30"]}"#,
        ] {
            assert!(serde_json::from_str::<Form>(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_toggle_day_adds_and_removes() {
        let days = vec![d("2024-03-06"), d("2024-03-04")];
        let added = toggle_day(&days, d("2024-03-05"));
        assert_eq!(added, vec![d("2024-03-04"), d("2024-03-05"), d("2024-03-06")]);
        let removed = toggle_day(&added, d("2024-03-04"));
        assert_eq!(removed, vec![d("2024-03-05"), d("2024-03-06")]);
    }
}
