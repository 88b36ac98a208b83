//! Pro-rata allocation of a repayment across investment stakes.
//!
//! Every share is floored to the currency scale, then the minor units left over
//! are handed out one at a time by largest fractional remainder. Ties go to the
//! larger stake, then to the earlier stake (input order). The shares always sum
//! to exactly `total`.

use crate::domain::Decimal;
use crate::error::LedgerError;

/// Split `total` across `stakes` in proportion to each stake.
///
/// `stakes` must be in a stable order (creation order) so repeated runs
/// produce identical shares.
pub fn allocate_pro_rata(
    stakes: &[Decimal],
    total: Decimal,
    scale: u32,
) -> Result<Vec<Decimal>, LedgerError> {
    if total.is_negative() {
        return Err(LedgerError::InvalidAmount(format!(
            "repayment total must not be negative, got {}",
            total
        )));
    }
    if total.fractional_digits() > scale {
        return Err(LedgerError::InvalidAmount(format!(
            "repayment total {} has more than {} decimal places",
            total, scale
        )));
    }
    if stakes.iter().any(|s| !s.is_positive()) {
        return Err(LedgerError::InvalidAmount(
            "every stake must be positive".into(),
        ));
    }
    if stakes.is_empty() {
        return Ok(Vec::new());
    }

    let invested = Decimal::checked_sum(stakes)
        .ok_or_else(|| LedgerError::InvalidAmount("sum of stakes overflows".into()))?;
    let mut shares = Vec::with_capacity(stakes.len());
    let mut remainders = Vec::with_capacity(stakes.len());
    for stake in stakes {
        let exact = stake
            .checked_mul(total)
            .and_then(|product| product.checked_div(invested))
            .ok_or_else(|| {
                LedgerError::InvalidAmount(format!(
                    "share of {} in a repayment of {} is out of range",
                    stake, total
                ))
            })?;
        let floored = exact.truncate_to(scale);
        shares.push(floored);
        remainders.push(exact - floored);
    }

    let unit = Decimal::minor_unit(scale);
    let mut leftover = total - shares.iter().sum::<Decimal>();

    let mut order: Vec<usize> = (0..stakes.len()).collect();
    order.sort_by(|&a, &b| {
        remainders[b]
            .cmp(&remainders[a])
            .then(stakes[b].cmp(&stakes[a]))
            .then(a.cmp(&b))
    });

    let mut cursor = 0;
    while leftover >= unit {
        shares[order[cursor % order.len()]] += unit;
        leftover = leftover - unit;
        cursor += 1;
    }

    Ok(shares)
}
