//! Balance invariant checker
//!
//! Pure decision function over one transaction header's current line set.
//! A header with entries is valid iff it has at least two lines and the
//! signed amounts sum to exactly zero (debits = credits). Equality is
//! exact: amounts are fixed-point decimals, so no epsilon is tolerated.
//!
//! Two lines minimum ensures every recorded event has a distinguishable
//! source and destination account. There is no upper bound on line count:
//! multi-leg splits are legal as long as the total sum is zero.

use rust_decimal::Decimal;
use std::fmt;

/// Why a line set fails the double-entry invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Fewer than two entry lines
    TooFewLines,
    /// Lines do not sum to zero; carries the offending sum
    Unbalanced(Decimal),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TooFewLines => write!(f, "fewer than two entry lines"),
            Violation::Unbalanced(sum) => write!(f, "lines sum to {} instead of zero", sum),
        }
    }
}

/// Check one header's aggregate against the double-entry invariant.
///
/// A count of zero passes: the rule only fires once any entry exists, so a
/// header may legitimately hold no lines (e.g. between creation and the
/// insert of its line set in a later transaction).
pub fn check(count: u64, sum: Decimal) -> Result<(), Violation> {
    if count == 0 {
        return Ok(());
    }
    if count < 2 {
        return Err(Violation::TooFewLines);
    }
    if !sum.is_zero() {
        return Err(Violation::Unbalanced(sum));
    }
    Ok(())
}

/// Convenience wrapper over a slice of signed amounts.
pub fn check_amounts(amounts: &[Decimal]) -> Result<(), Violation> {
    let sum: Decimal = amounts.iter().sum();
    check(amounts.len() as u64, sum)
}
