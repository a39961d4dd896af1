//! Fixed-point money.
//!
//! All amounts are integer cents (smallest currency unit). Floating point is
//! never used for money anywhere in this workspace.

use crate::error::{DomainError, DomainResult};

/// Amount in cents. Negative amounts never appear in valid data; the signed
/// type matches what relational BIGINT columns hand back.
pub type Cents = i64;

/// `quantity * unit_price`, overflow-checked.
pub fn line_total(quantity: i64, unit_price: Cents) -> DomainResult<Cents> {
    quantity
        .checked_mul(unit_price)
        .ok_or_else(|| DomainError::validation("line total overflows"))
}

/// Sum of line totals, overflow-checked.
pub fn sum_totals<I: IntoIterator<Item = Cents>>(totals: I) -> DomainResult<Cents> {
    totals.into_iter().try_fold(0i64, |acc, t| {
        acc.checked_add(t)
            .ok_or_else(|| DomainError::validation("order total overflows"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies() {
        assert_eq!(line_total(3, 250).unwrap(), 750);
    }

    #[test]
    fn line_total_detects_overflow() {
        assert!(line_total(i64::MAX, 2).is_err());
    }

    #[test]
    fn sum_totals_adds_and_detects_overflow() {
        assert_eq!(sum_totals([100, 200, 300]).unwrap(), 600);
        assert!(sum_totals([i64::MAX, 1]).is_err());
    }
}
