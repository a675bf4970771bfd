// ABOUTME: Start-date resolution for cold and warm ocean-model runs
// ABOUTME: Parses YYYYMMDDHH timestamps into the coupler's current_date form

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::namelist::{NmlValue, Scalar};

use super::error::{ParamError, Result};

/// How a run starts: from initial conditions or from a restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Cold,
    Warm,
}

impl RunMode {
    /// Environment key holding this mode's timestamp
    pub fn timestamp_key(&self) -> &'static str {
        match self {
            RunMode::Cold => "start",
            RunMode::Warm => "restart",
        }
    }
}

impl FromStr for RunMode {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cold" => Ok(RunMode::Cold),
            "warm" => Ok(RunMode::Warm),
            _ => Err(ParamError::InvalidRunMode(s.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Cold => write!(f, "cold"),
            RunMode::Warm => write!(f, "warm"),
        }
    }
}

/// Model start instant, hour resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartDate(NaiveDateTime);

impl StartDate {
    /// Parse a `YYYYMMDDHH` timestamp
    pub fn parse(timestamp: &str) -> Result<Self> {
        let invalid = |reason: &str| ParamError::DateFormatError {
            value: timestamp.to_string(),
            reason: reason.to_string(),
        };

        let digits = timestamp.trim();
        if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected exactly 10 digits"));
        }

        let field = |range: std::ops::Range<usize>| -> Result<u32> {
            digits[range].parse().map_err(|_| invalid("not a number"))
        };
        let date = NaiveDate::from_ymd_opt(field(0..4)? as i32, field(4..6)?, field(6..8)?)
            .ok_or_else(|| invalid("not a calendar date"))?;
        let hour = field(8..10)?;
        let instant = date
            .and_hms_opt(hour, 0, 0)
            .ok_or_else(|| invalid("hour out of range"))?;

        Ok(StartDate(instant))
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// `year, month, day, hour, 0, 0` as an integer list
    pub fn to_nml(&self) -> NmlValue {
        let d = self.0;
        NmlValue::List(vec![
            Scalar::Int(d.year() as i64),
            Scalar::Int(d.month() as i64),
            Scalar::Int(d.day() as i64),
            Scalar::Int(d.hour() as i64),
            Scalar::Int(0),
            Scalar::Int(0),
        ])
    }
}

impl fmt::Display for StartDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y, %m, %d, %H, 0, 0"))
    }
}

/// Resolve the start date for a run: `start` for cold runs, `restart` for warm
/// runs. The timestamp for the other mode is ignored.
pub fn start_date(mode: RunMode, start: Option<&str>, restart: Option<&str>) -> Result<StartDate> {
    let selected = match mode {
        RunMode::Cold => start,
        RunMode::Warm => restart,
    };
    match selected {
        Some(timestamp) => StartDate::parse(timestamp),
        None => Err(ParamError::DateFormatError {
            value: String::new(),
            reason: format!("no '{}' timestamp for a {} run", mode.timestamp_key(), mode),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_date_examples() {
        let warm = start_date(RunMode::Warm, None, Some("2001010100")).unwrap();
        assert_eq!(warm.to_string(), "2001, 01, 01, 00, 0, 0");

        let cold = start_date(RunMode::Cold, Some("1999123112"), Some("garbage")).unwrap();
        assert_eq!(cold.to_string(), "1999, 12, 31, 12, 0, 0");
    }

    #[test]
    fn test_to_nml() {
        let date = StartDate::parse("1999123112").unwrap();
        assert_eq!(
            date.to_nml(),
            NmlValue::List(vec![
                Scalar::Int(1999),
                Scalar::Int(12),
                Scalar::Int(31),
                Scalar::Int(12),
                Scalar::Int(0),
                Scalar::Int(0),
            ])
        );
    }

    #[test]
    fn test_malformed_timestamps() {
        for bad in ["", "20010101", "200101010000", "2001-01-01", "2001023100", "2001010124", "abcdefghij"] {
            assert!(
                matches!(StartDate::parse(bad), Err(ParamError::DateFormatError { .. })),
                "accepted {:?}",
                bad
            );
        }
        assert!(matches!(
            start_date(RunMode::Warm, Some("2001010100"), None),
            Err(ParamError::DateFormatError { .. })
        ));
    }

    #[test]
    fn test_run_mode() {
        assert_eq!("cold".parse::<RunMode>().unwrap(), RunMode::Cold);
        assert_eq!("WARM".parse::<RunMode>().unwrap(), RunMode::Warm);
        assert_eq!(
            "hot".parse::<RunMode>().unwrap_err(),
            ParamError::InvalidRunMode("hot".to_string())
        );
        assert_eq!(RunMode::Warm.timestamp_key(), "restart");
    }
}
