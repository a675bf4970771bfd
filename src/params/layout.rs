// ABOUTME: Domain-decomposition layout for a given process count
// ABOUTME: Picks the factor pair closest to square so that rows times cols equals the count

use std::fmt;

use crate::namelist::{NmlValue, Scalar};

use super::error::{ParamError, Result};

/// A `rows x cols` process grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub rows: u64,
    pub cols: u64,
}

impl Layout {
    pub fn processes(&self) -> u64 {
        self.rows * self.cols
    }

    /// Namelist form, `rows, cols`
    pub fn to_nml(&self) -> NmlValue {
        NmlValue::List(vec![
            Scalar::Int(self.rows as i64),
            Scalar::Int(self.cols as i64),
        ])
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.rows, self.cols)
    }
}

/// Split `npes` processes into the most square grid that uses all of them.
///
/// `rows` is the largest divisor not above the square root, so `rows <= cols`.
/// Primes degrade to `1 x npes`.
pub fn layout(npes: i64) -> Result<Layout> {
    if npes < 1 {
        return Err(ParamError::InvalidProcessCount(npes));
    }
    let n = npes as u64;

    let mut rows = isqrt(n);
    while n % rows != 0 {
        rows -= 1;
    }

    Ok(Layout { rows, cols: n / rows })
}

fn isqrt(n: u64) -> u64 {
    let mut root = (n as f64).sqrt() as u64;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root.max(1)
}
