//! Sampling frequency and value-kind tags.
//!
//! A frequency knows how to label the period a date falls into (the period
//! end, on a business day) and how to step to the next period end. Labels
//! follow business-day conventions: weekends never appear as labels.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sampling frequency of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Every business day (Monday–Friday).
    #[serde(rename = "B")]
    BusinessDay,
    /// Weekly, labelled on Friday.
    #[serde(rename = "W-FRI", alias = "W-Fri")]
    WeeklyFriday,
    /// Monthly, labelled on the last business day of the month.
    #[serde(rename = "BM")]
    BusinessMonthEnd,
    /// Yearly, labelled on the last business day of the year.
    #[serde(rename = "BY")]
    BusinessYearEnd,
}

/// Whether a table holds price levels or period returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Level,
    Return,
}

#[derive(Debug, Error)]
#[error("unknown frequency '{0}' (expected B, W-FRI, BM or BY)")]
pub struct UnknownFrequency(pub String);

#[derive(Debug, Error)]
#[error("unknown value kind '{0}' (expected level or return)")]
pub struct UnknownValueKind(pub String);

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::BusinessDay,
        Frequency::WeeklyFriday,
        Frequency::BusinessMonthEnd,
        Frequency::BusinessYearEnd,
    ];

    /// Short code used in config files and CSV headers.
    pub fn code(self) -> &'static str {
        match self {
            Frequency::BusinessDay => "B",
            Frequency::WeeklyFriday => "W-FRI",
            Frequency::BusinessMonthEnd => "BM",
            Frequency::BusinessYearEnd => "BY",
        }
    }

    /// Label of the period containing `date`.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::BusinessDay => roll_back_to_weekday(date),
            Frequency::WeeklyFriday => {
                let from_monday = date.weekday().num_days_from_monday() as i64;
                let ahead = (4 - from_monday).rem_euclid(7);
                date + Duration::days(ahead)
            }
            Frequency::BusinessMonthEnd => last_business_day_of_month(date.year(), date.month()),
            Frequency::BusinessYearEnd => last_business_day_of_month(date.year(), 12),
        }
    }

    /// First period end strictly after `date`.
    pub fn next_period_end(self, date: NaiveDate) -> NaiveDate {
        let current = self.period_end(date);
        if current > date {
            return current;
        }
        match self {
            Frequency::BusinessDay => {
                let mut next = date + Duration::days(1);
                while is_weekend(next) {
                    next += Duration::days(1);
                }
                next
            }
            Frequency::WeeklyFriday => current + Duration::days(7),
            Frequency::BusinessMonthEnd => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                last_business_day_of_month(year, month)
            }
            Frequency::BusinessYearEnd => last_business_day_of_month(date.year() + 1, 12),
        }
    }

    /// Period end `periods` steps after `date`.
    pub fn advance(self, date: NaiveDate, periods: usize) -> NaiveDate {
        (0..periods).fold(date, |d, _| self.next_period_end(d))
    }

    /// Guess the frequency from the median spacing of `dates`.
    ///
    /// Returns `None` with fewer than two dates.
    pub fn infer(dates: &[NaiveDate]) -> Option<Frequency> {
        if dates.len() < 2 {
            return None;
        }
        let mut gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];
        Some(match median {
            i64::MIN..=4 => Frequency::BusinessDay,
            5..=10 => Frequency::WeeklyFriday,
            11..=45 => Frequency::BusinessMonthEnd,
            _ => Frequency::BusinessYearEnd,
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B" | "D" | "DAILY" => Ok(Frequency::BusinessDay),
            "W" | "W-FRI" | "WEEKLY" => Ok(Frequency::WeeklyFriday),
            "BM" | "M" | "MONTHLY" => Ok(Frequency::BusinessMonthEnd),
            "BY" | "Y" | "YEARLY" => Ok(Frequency::BusinessYearEnd),
            _ => Err(UnknownFrequency(s.to_string())),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Level => f.write_str("level"),
            ValueKind::Return => f.write_str("return"),
        }
    }
}

impl FromStr for ValueKind {
    type Err = UnknownValueKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "level" | "price" => Ok(ValueKind::Level),
            "return" | "returns" => Ok(ValueKind::Return),
            _ => Err(UnknownValueKind(s.to_string())),
        }
    }
}

pub(crate) fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn roll_back_to_weekday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date - Duration::days(2),
        _ => date,
    }
}

fn last_business_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // Day 1 always exists, so the fallback is unreachable for valid months.
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap_or(NaiveDate::MAX);
    roll_back_to_weekday(first_of_next - Duration::days(1))
}
