//! Bill splitting
//!
//! A split divides the total of one or more orders into shares that are paid
//! independently. Amounts are handled in whole cents so shares always add up
//! to the total exactly.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorCode};

pub const MAX_SHARES: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitMode {
    #[default]
    Equal,
    Custom,
}

impl SplitMode {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Custom => "CUSTOM",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "EQUAL" => Some(Self::Equal),
            "CUSTOM" => Some(Self::Custom),
            _ => None,
        }
    }
}

text_codec!(SplitMode);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStatus {
    #[default]
    Open,
    Settled,
}

impl SplitStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Settled => "SETTLED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(Self::Open),
            "SETTLED" => Some(Self::Settled),
            _ => None,
        }
    }
}

text_codec!(SplitStatus);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("A bill can be split into 1 to 20 shares, got {0}")]
    InvalidParts(usize),

    #[error("Amount to split must be positive")]
    NonPositiveTotal,

    #[error("Share amounts must be positive")]
    NonPositiveShare,

    #[error("Shares add up to {sum}, expected {total}")]
    AmountMismatch { sum: Decimal, total: Decimal },

    #[error("Share {0} does not belong to this split")]
    ShareNotFound(i64),

    #[error("Share {0} has already been paid")]
    ShareAlreadyPaid(i64),
}

impl From<SplitError> for AppError {
    fn from(err: SplitError) -> Self {
        let code = match &err {
            SplitError::InvalidParts(_)
            | SplitError::NonPositiveTotal
            | SplitError::NonPositiveShare => ErrorCode::ValueOutOfRange,
            SplitError::AmountMismatch { .. } => ErrorCode::SplitAmountMismatch,
            SplitError::ShareNotFound(_) => ErrorCode::SplitNotFound,
            SplitError::ShareAlreadyPaid(_) => ErrorCode::ShareAlreadyPaid,
        };
        AppError::with_message(code, err.to_string())
    }
}

fn to_cents(amount: Decimal) -> i64 {
    (amount.round_dp(2) * Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(0)
}

fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Split `total` into `parts` shares that differ by at most one cent.
///
/// Leftover cents go to the first shares: 10.00 / 3 = [3.34, 3.33, 3.33].
pub fn split_equal(total: Decimal, parts: usize) -> Result<Vec<Decimal>, SplitError> {
    if parts == 0 || parts > MAX_SHARES {
        return Err(SplitError::InvalidParts(parts));
    }
    let cents = to_cents(total);
    if cents <= 0 {
        return Err(SplitError::NonPositiveTotal);
    }
    let n = parts as i64;
    if cents < n {
        return Err(SplitError::NonPositiveShare);
    }
    let (base, remainder) = (cents / n, cents % n);
    Ok((0..n)
        .map(|i| from_cents(base + i64::from(i < remainder)))
        .collect())
}

/// Validate caller-chosen share amounts against `total`.
pub fn split_custom(total: Decimal, amounts: &[Decimal]) -> Result<Vec<Decimal>, SplitError> {
    if amounts.is_empty() || amounts.len() > MAX_SHARES {
        return Err(SplitError::InvalidParts(amounts.len()));
    }
    if to_cents(total) <= 0 {
        return Err(SplitError::NonPositiveTotal);
    }
    if amounts.iter().any(|a| to_cents(*a) <= 0) {
        return Err(SplitError::NonPositiveShare);
    }
    let sum: i64 = amounts.iter().map(|a| to_cents(*a)).sum();
    if sum != to_cents(total) {
        return Err(SplitError::AmountMismatch {
            sum: from_cents(sum),
            total: total.round_dp(2),
        });
    }
    Ok(amounts.iter().map(|a| a.round_dp(2)).collect())
}

/// Validate paying one share; returns `true` when it was the last unpaid one.
///
/// `shares` is `(share_id, paid)` for every share of the split.
pub fn settle_share(shares: &[(i64, bool)], share_id: i64) -> Result<bool, SplitError> {
    match shares.iter().find(|(id, _)| *id == share_id) {
        None => Err(SplitError::ShareNotFound(share_id)),
        Some((_, true)) => Err(SplitError::ShareAlreadyPaid(share_id)),
        Some(_) => Ok(shares
            .iter()
            .filter(|(id, _)| *id != share_id)
            .all(|(_, paid)| *paid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn equal_split_puts_remainder_first() {
        assert_eq!(split_equal(d(1000), 3), Ok(vec![d(334), d(333), d(333)]));
        assert_eq!(split_equal(d(1001), 4), Ok(vec![d(251), d(250), d(250), d(250)]));
        assert_eq!(split_equal(d(4200), 1), Ok(vec![d(4200)]));
    }

    #[test]
    fn equal_split_always_sums_to_total() {
        for cents in [1_i64, 99, 1000, 12345, 99999] {
            for parts in 1..=MAX_SHARES {
                if (cents as usize) < parts {
                    continue;
                }
                let shares = split_equal(d(cents), parts).unwrap();
                assert_eq!(shares.len(), parts);
                assert_eq!(shares.iter().copied().sum::<Decimal>(), d(cents));
            }
        }
    }

    #[test]
    fn equal_split_rejects_bad_input() {
        assert_eq!(split_equal(d(1000), 0), Err(SplitError::InvalidParts(0)));
        assert_eq!(split_equal(d(1000), 21), Err(SplitError::InvalidParts(21)));
        assert_eq!(split_equal(d(0), 2), Err(SplitError::NonPositiveTotal));
        assert_eq!(split_equal(d(1), 2), Err(SplitError::NonPositiveShare));
    }

    #[test]
    fn custom_split_must_match_total() {
        assert_eq!(
            split_custom(d(3000), &[d(1000), d(2000)]),
            Ok(vec![d(1000), d(2000)])
        );
        assert_eq!(
            split_custom(d(3000), &[d(1000), d(1000)]),
            Err(SplitError::AmountMismatch {
                sum: d(2000),
                total: d(3000)
            })
        );
        assert_eq!(
            split_custom(d(3000), &[d(3100), d(-100)]),
            Err(SplitError::NonPositiveShare)
        );
        assert_eq!(split_custom(d(3000), &[]), Err(SplitError::InvalidParts(0)));
        let err: AppError = SplitError::AmountMismatch {
            sum: d(2000),
            total: d(3000),
        }
        .into();
        assert_eq!(err.code, ErrorCode::SplitAmountMismatch);
    }

    #[test]
    fn last_share_settles_the_split() {
        let shares = [(1, true), (2, false), (3, false)];
        assert_eq!(settle_share(&shares, 2), Ok(false));
        assert_eq!(settle_share(&[(1, true), (2, false)], 2), Ok(true));
        assert_eq!(settle_share(&shares, 1), Err(SplitError::ShareAlreadyPaid(1)));
        assert_eq!(settle_share(&shares, 9), Err(SplitError::ShareNotFound(9)));
    }
}
