// ABOUTME: Exclusive run-length resolution between days and months
// ABOUTME: Rewrites the coupler group so it carries exactly one duration key

use crate::namelist::{Document, NamelistError, NmlValue};

use super::error::{ParamError, Result};

const DAYS: &str = "days";
const MONTHS: &str = "months";

/// Run duration, given in exactly one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLength {
    Days(i64),
    Months(i64),
}

impl RunLength {
    pub fn key(&self) -> &'static str {
        match self {
            RunLength::Days(_) => DAYS,
            RunLength::Months(_) => MONTHS,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            RunLength::Days(n) | RunLength::Months(n) => *n,
        }
    }

    /// Replace any `days`/`months` in `group` with this run length.
    ///
    /// The key lands where the first removed duration key stood, or at the end
    /// of the group if there was none.
    pub fn apply(&self, document: &mut Document, group: &str) -> Result<()> {
        let target = document
            .group_mut(group)
            .ok_or_else(|| NamelistError::MissingGroup {
                group: group.to_string(),
            })?;

        let position = [DAYS, MONTHS]
            .iter()
            .filter_map(|key| target.get_index_of(*key))
            .min();
        target.shift_remove(DAYS);
        target.shift_remove(MONTHS);

        let value = NmlValue::from(self.amount());
        match position {
            Some(index) => {
                target.shift_insert(index, self.key().to_string(), value);
            }
            None => {
                target.insert(self.key().to_string(), value);
            }
        }
        Ok(())
    }
}

/// Pick the run length; exactly one of `days` and `months` must be given
pub fn run_length(days: Option<i64>, months: Option<i64>) -> Result<RunLength> {
    match (days, months) {
        (Some(days), None) => Ok(RunLength::Days(days)),
        (None, Some(months)) => Ok(RunLength::Months(months)),
        (Some(_), Some(_)) => Err(conflict("both are set")),
        (None, None) => Err(conflict("neither is set")),
    }
}

fn conflict(found: &'static str) -> ParamError {
    ParamError::ExclusiveOptionConflict {
        first: DAYS,
        second: MONTHS,
        found,
    }
}
