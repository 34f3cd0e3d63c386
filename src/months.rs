use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BursarError, Result};

/// Calendar month. `Ord` follows the calendar (January first); academic
/// ordering always goes through [`AcademicYear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AcademicMonth {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

pub const CALENDAR: [AcademicMonth; 12] = [
    AcademicMonth::January,
    AcademicMonth::February,
    AcademicMonth::March,
    AcademicMonth::April,
    AcademicMonth::May,
    AcademicMonth::June,
    AcademicMonth::July,
    AcademicMonth::August,
    AcademicMonth::September,
    AcademicMonth::October,
    AcademicMonth::November,
    AcademicMonth::December,
];

impl AcademicMonth {
    /// 0-based, January = 0, April = 3.
    pub fn calendar_index(self) -> u32 {
        self as u32
    }

    pub fn from_calendar_index(idx: u32) -> Option<Self> {
        CALENDAR.get(idx as usize).copied()
    }

    pub fn of_date(date: NaiveDate) -> Self {
        CALENDAR[date.month0() as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::January => "January",
            Self::February => "February",
            Self::March => "March",
            Self::April => "April",
            Self::May => "May",
            Self::June => "June",
            Self::July => "July",
            Self::August => "August",
            Self::September => "September",
            Self::October => "October",
            Self::November => "November",
            Self::December => "December",
        }
    }
}

impl fmt::Display for AcademicMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AcademicMonth {
    type Err = BursarError;

    /// Accepts full names and three-letter abbreviations, any case.
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        if needle.len() >= 3 {
            for m in CALENDAR {
                let name = m.name().to_lowercase();
                if name == needle || (needle.len() == 3 && name.starts_with(&needle)) {
                    return Ok(m);
                }
            }
        }
        Err(BursarError::UnknownMonth(s.to_string()))
    }
}

/// The twelve-month fee year, starting at a configurable month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcademicYear {
    pub start: AcademicMonth,
}

impl Default for AcademicYear {
    fn default() -> Self {
        Self {
            start: AcademicMonth::April,
        }
    }
}

impl AcademicYear {
    /// Build from the settings form: a two-digit month number such as "04".
    pub fn from_setting(start_month: &str) -> Result<Self> {
        let n: u32 = start_month
            .trim()
            .parse()
            .map_err(|_| BursarError::Settings(format!("bad session_start_month {start_month:?}")))?;
        let start = n
            .checked_sub(1)
            .and_then(AcademicMonth::from_calendar_index)
            .ok_or_else(|| BursarError::Settings(format!("bad session_start_month {start_month:?}")))?;
        Ok(Self { start })
    }

    pub fn start_index(&self) -> u32 {
        self.start.calendar_index()
    }

    /// All twelve months in academic order.
    pub fn months(&self) -> [AcademicMonth; 12] {
        let offset = self.start_index() as usize;
        std::array::from_fn(|i| CALENDAR[(offset + i) % 12])
    }

    /// Position within the academic year, 0 for the start month.
    pub fn position(&self, month: AcademicMonth) -> usize {
        ((month.calendar_index() + 12 - self.start_index()) % 12) as usize
    }

    pub fn sorted<'a, I>(&self, months: I) -> Vec<AcademicMonth>
    where
        I: IntoIterator<Item = &'a AcademicMonth>,
    {
        let mut out: Vec<AcademicMonth> = months.into_iter().copied().collect();
        out.sort_by_key(|m| self.position(*m));
        out.dedup();
        out
    }

    /// Session label ("2024-25") of the academic year containing `date`.
    pub fn session_for(&self, date: NaiveDate) -> String {
        let first_year = if date.month0() >= self.start_index() {
            date.year()
        } else {
            date.year() - 1
        };
        session_label(first_year)
    }
}

pub fn session_label(first_year: i32) -> String {
    format!("{first_year}-{:02}", (first_year + 1).rem_euclid(100))
}

/// Check a session label has the `YYYY-YY` shape with consecutive years.
pub fn validate_session(session: &str) -> Result<()> {
    let re = Regex::new(r"^(\d{4})-(\d{2})$").map_err(|e| BursarError::Other(e.to_string()))?;
    let caps = re
        .captures(session)
        .ok_or_else(|| BursarError::InvalidSession(session.to_string()))?;
    let first: i32 = caps[1]
        .parse()
        .map_err(|_| BursarError::InvalidSession(session.to_string()))?;
    if session_label(first) != session {
        return Err(BursarError::InvalidSession(session.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_index_matches_january_first() {
        assert_eq!(AcademicMonth::January.calendar_index(), 0);
        assert_eq!(AcademicMonth::April.calendar_index(), 3);
        assert_eq!(AcademicMonth::December.calendar_index(), 11);
    }

    #[test]
    fn test_parse_names_and_abbreviations() {
        assert_eq!("April".parse::<AcademicMonth>().unwrap(), AcademicMonth::April);
        assert_eq!("sep".parse::<AcademicMonth>().unwrap(), AcademicMonth::September);
        assert_eq!(" MARCH ".parse::<AcademicMonth>().unwrap(), AcademicMonth::March);
        assert!("Ap".parse::<AcademicMonth>().is_err());
        assert!("Smarch".parse::<AcademicMonth>().is_err());
        assert!("".parse::<AcademicMonth>().is_err());
    }

    #[test]
    fn test_academic_order_starts_in_april() {
        let year = AcademicYear::default();
        let months = year.months();
        assert_eq!(months[0], AcademicMonth::April);
        assert_eq!(months[8], AcademicMonth::December);
        assert_eq!(months[9], AcademicMonth::January);
        assert_eq!(months[11], AcademicMonth::March);
    }

    #[test]
    fn test_order_follows_configured_start() {
        let year = AcademicYear::from_setting("07").unwrap();
        assert_eq!(year.start, AcademicMonth::July);
        assert_eq!(year.position(AcademicMonth::July), 0);
        assert_eq!(year.position(AcademicMonth::June), 11);
    }

    #[test]
    fn test_bad_start_setting() {
        assert!(AcademicYear::from_setting("00").is_err());
        assert!(AcademicYear::from_setting("13").is_err());
        assert!(AcademicYear::from_setting("april").is_err());
    }

    #[test]
    fn test_sorted_uses_academic_order() {
        let year = AcademicYear::default();
        let sorted = year.sorted(&[
            AcademicMonth::February,
            AcademicMonth::April,
            AcademicMonth::November,
        ]);
        assert_eq!(
            sorted,
            vec![AcademicMonth::April, AcademicMonth::November, AcademicMonth::February]
        );
    }

    #[test]
    fn test_session_for_wraps_at_start_month() {
        let year = AcademicYear::default();
        assert_eq!(year.session_for(date(2024, 4, 1)), "2024-25");
        assert_eq!(year.session_for(date(2024, 12, 31)), "2024-25");
        assert_eq!(year.session_for(date(2025, 3, 31)), "2024-25");
        assert_eq!(year.session_for(date(2099, 6, 1)), "2099-00");
    }

    #[test]
    fn test_validate_session() {
        assert!(validate_session("2024-25").is_ok());
        assert!(validate_session("2024-26").is_err());
        assert!(validate_session("24-25").is_err());
        assert!(validate_session("2024/25").is_err());
    }
}
