// crates/fairshare-core/src/token.rs
//
// FAIR amounts. The ledger counts in integer micros (10^6 per FAIR);
// `Fair` exists for configuration input, balance reports, and log output.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MICROS_PER_FAIR: u64 = 1_000_000;

/// Integer ledger unit.
pub type Micros = u64;

/// An amount as shown to people.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fair {
    pub micros: Micros,
}

impl Fair {
    /// Convert a configured decimal amount. Anything that is not a positive
    /// finite number is zero.
    ///
    /// ```
    /// use fairshare_core::token::Fair;
    /// assert_eq!(Fair::from_fair(1000.0).micros, 1_000_000_000);
    /// ```
    pub fn from_fair(amount: f64) -> Self {
        let micros = if amount.is_finite() && amount > 0.0 {
            (amount * MICROS_PER_FAIR as f64).round() as Micros
        } else {
            0
        };
        Self { micros }
    }

    pub fn from_micros(micros: Micros) -> Self {
        Self { micros }
    }
}

impl fmt::Display for Fair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.micros / MICROS_PER_FAIR;
        let mut frac = self.micros % MICROS_PER_FAIR;
        if frac == 0 {
            return write!(f, "{} FAIR", whole);
        }
        let mut digits = 6;
        while frac % 10 == 0 {
            frac /= 10;
            digits -= 1;
        }
        write!(f, "{}.{:0width$} FAIR", whole, frac, width = digits)
    }
}
