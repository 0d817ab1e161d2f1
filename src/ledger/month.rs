use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar month bucket, persisted as `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthKey(String);

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self(format!("{:04}-{:02}", year, month))
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The month before this one, rolling over year boundaries.  Keys that don't parse as
    /// `YYYY-MM` have no predecessor.
    pub fn previous(&self) -> Option<Self> {
        let (year, month) = self.0.split_once('-')?;
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;

        match month {
            1 => Some(Self::new(year - 1, 12)),
            2..=12 => Some(Self::new(year, month - 1)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of "now" for month bucketing.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Local wall-clock time of the bot host.
    System,
    /// Pinned date, for tests and replays.
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }

    pub fn current_month(&self) -> MonthKey {
        MonthKey::of(self.today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fixed_width() {
        assert_eq!(MonthKey::new(2025, 3).as_str(), "2025-03");
        assert_eq!(MonthKey::new(987, 11).as_str(), "0987-11");
    }

    #[test]
    fn previous_rolls_year() {
        assert_eq!(
            MonthKey::new(2025, 1).previous(),
            Some(MonthKey::new(2024, 12))
        );
        assert_eq!(
            MonthKey::new(2025, 7).previous(),
            Some(MonthKey::new(2025, 6))
        );
    }

    #[test]
    fn previous_of_garbage_is_none() {
        assert_eq!(MonthKey("2025-13".into()).previous(), None);
        assert_eq!(MonthKey("soon".into()).previous(), None);
    }

    #[test]
    fn fixed_clock_drives_current_month() {
        let clock = Clock::Fixed(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(clock.current_month(), MonthKey::new(2024, 2));
    }
}
