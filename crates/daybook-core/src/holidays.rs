use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::datetime::{format_date, parse_date};

const BUILTIN_HOLIDAYS: &[(&str, &str)] = &[
    ("2024-01-01", "신정"),
    ("2024-02-09", "설날"),
    ("2024-02-10", "설날"),
    ("2024-02-11", "설날"),
    ("2024-03-01", "삼일절"),
    ("2024-05-05", "어린이날"),
    ("2024-06-06", "현충일"),
    ("2024-08-15", "광복절"),
    ("2024-09-16", "추석"),
    ("2024-09-17", "추석"),
    ("2024-09-18", "추석"),
    ("2024-10-03", "개천절"),
    ("2024-10-09", "한글날"),
    ("2024-12-25", "크리스마스"),
    ("2025-01-01", "신정"),
    ("2025-01-28", "설날"),
    ("2025-01-29", "설날"),
    ("2025-01-30", "설날"),
    ("2025-03-01", "삼일절"),
    ("2025-05-05", "어린이날"),
    ("2025-06-06", "현충일"),
    ("2025-08-15", "광복절"),
    ("2025-10-03", "개천절"),
    ("2025-10-05", "추석"),
    ("2025-10-06", "추석"),
    ("2025-10-07", "추석"),
    ("2025-10-09", "한글날"),
    ("2025-12-25", "크리스마스"),
];

#[derive(Debug, Deserialize)]
struct HolidayFile {
    #[serde(default)]
    holidays: BTreeMap<String, String>,
}

/// Read-only date → holiday-name table handed to the calendar views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    entries: BTreeMap<NaiveDate, String>,
}

impl HolidayCalendar {
    /// Korean public holidays for 2024 and 2025.
    pub fn builtin() -> Self {
        let entries = BUILTIN_HOLIDAYS
            .iter()
            .filter_map(|(date, name)| parse_date(date).map(|d| (d, (*name).to_string())))
            .collect();
        Self { entries }
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, String)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Parses a table of the form
    ///
    /// ```toml
    /// [holidays]
    /// "2024-01-01" = "신정"
    /// ```
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let parsed: HolidayFile = toml::from_str(raw).context("invalid holiday table")?;
        let mut entries = BTreeMap::new();
        for (key, name) in parsed.holidays {
            let date = parse_date(&key)
                .ok_or_else(|| anyhow!("invalid holiday date {key:?} (expected YYYY-MM-DD)"))?;
            entries.insert(date, name);
        }
        Ok(Self { entries })
    }

    #[tracing::instrument(skip(path), fields(file = %path.display()))]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!("holiday file does not exist; using an empty table");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let calendar = Self::from_toml_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!(count = calendar.len(), "loaded holiday table");
        Ok(calendar)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name_on(&self, date: NaiveDate) -> Option<&str> {
        self.entries.get(&date).map(String::as_str)
    }

    /// Holidays falling in the same year and month as `reference`, keyed by
    /// `YYYY-MM-DD`.
    pub fn for_month(&self, reference: NaiveDate) -> BTreeMap<String, String> {
        let month: BTreeMap<String, String> = self
            .entries
            .iter()
            .filter(|(date, _)| date.year() == reference.year() && date.month() == reference.month())
            .map(|(date, name)| (format_date(*date), name.clone()))
            .collect();
        debug!(
            year = reference.year(),
            month = reference.month(),
            count = month.len(),
            "resolved holidays for month"
        );
        month
    }
}

/// Built-in holidays for the month of `reference`.
pub fn fetch_holidays(reference: NaiveDate) -> BTreeMap<String, String> {
    HolidayCalendar::builtin().for_month(reference)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::{HolidayCalendar, fetch_holidays};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn table(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn returns_only_requested_month() {
        assert_eq!(
            fetch_holidays(ymd(2024, 2, 1)),
            table(&[
                ("2024-02-09", "설날"),
                ("2024-02-10", "설날"),
                ("2024-02-11", "설날"),
            ])
        );
    }

    #[test]
    fn month_without_holidays_is_empty() {
        assert!(fetch_holidays(ymd(2024, 4, 1)).is_empty());
    }

    #[test]
    fn returns_every_holiday_in_month() {
        assert_eq!(
            fetch_holidays(ymd(2024, 10, 1)),
            table(&[("2024-10-03", "개천절"), ("2024-10-09", "한글날")])
        );
    }

    #[test]
    fn single_digit_month() {
        assert_eq!(fetch_holidays(ymd(2024, 1, 1)), table(&[("2024-01-01", "신정")]));
    }

    #[test]
    fn other_year_same_month_is_empty() {
        assert!(fetch_holidays(ymd(2023, 1, 1)).is_empty());
    }

    #[test]
    fn loads_custom_table() {
        let calendar = HolidayCalendar::from_toml_str(
            r#"
            [holidays]
            "2023-01-01" = "New Year"
            "2023-01-22" = "Lunar New Year"
            "#,
        )
        .expect("parse table");
        assert_eq!(calendar.len(), 2);
        assert_eq!(calendar.name_on(ymd(2023, 1, 22)), Some("Lunar New Year"));
        assert_eq!(calendar.for_month(ymd(2023, 1, 15)).len(), 2);
        assert!(calendar.for_month(ymd(2024, 1, 1)).is_empty());
    }

    #[test]
    fn rejects_bad_dates() {
        let err = HolidayCalendar::from_toml_str("[holidays]\n\"2023-13-01\" = \"x\"\n")
            .expect_err("bad date");
        assert!(err.to_string().contains("2023-13-01"));
    }
}
