//! The money split calculator.
//!
//! Pure integer arithmetic. The provider and referrer shares are percentages of the charged
//! total, rounded half-up; the platform share is the exact remainder, so the three shares always
//! sum to the total regardless of rounding direction.
use spg_common::Cents;
use thiserror::Error;

/// Basis points in a whole (100%).
const BPS_SCALE: i128 = 10_000;

#[derive(Debug, Clone, Error)]
pub enum SplitError {
    #[error("Configured shares sum to {0} bps, which exceeds 100%")]
    SharesExceedWhole(u64),
    #[error("Cannot split a negative total: {0}")]
    NegativeTotal(Cents),
    #[error("Split of {total} produced a negative platform share ({platform})")]
    NegativePlatformShare { total: Cents, platform: Cents },
}

/// Fixed percentage shares for the provider and referrer, in basis points (1 bps = 0.01%).
///
/// Basis points keep the configuration integral: 70% is 7000 bps. The platform's share is
/// whatever remains and is never configured directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    provider_bps: u32,
    referrer_bps: u32,
}

impl SplitConfig {
    /// Create a split configuration. Fails if the configured shares exceed 100%.
    pub fn new(provider_bps: u32, referrer_bps: u32) -> Result<Self, SplitError> {
        // Summed in u64 so degenerate configurations near u32::MAX cannot overflow
        let sum = u64::from(provider_bps) + u64::from(referrer_bps);
        if i128::from(sum) > BPS_SCALE {
            return Err(SplitError::SharesExceedWhole(sum));
        }
        Ok(Self { provider_bps, referrer_bps })
    }

    pub fn provider_bps(&self) -> u32 {
        self.provider_bps
    }

    pub fn referrer_bps(&self) -> u32 {
        self.referrer_bps
    }
}

impl Default for SplitConfig {
    /// 70% to the provider, 10% to the referrer, remainder to the platform.
    fn default() -> Self {
        Self { provider_bps: 7000, referrer_bps: 1000 }
    }
}

/// Split `total` into `(provider, referrer, platform)` shares.
///
/// The provider and referrer shares are each `total * bps / 10_000`, rounded half-up. The
/// platform share is computed as `total - provider - referrer` rather than from its own
/// percentage, which guarantees that the three shares sum to `total` exactly. A negative platform
/// share cannot occur when the configured shares sum to under 100%, but the check remains as a
/// safety net against misconfiguration.
pub fn money_split(total: Cents, config: &SplitConfig) -> Result<crate::db_types::SplitAmounts, SplitError> {
    if total.is_negative() {
        return Err(SplitError::NegativeTotal(total));
    }
    let provider = rounded_share(total, config.provider_bps);
    let referrer = rounded_share(total, config.referrer_bps);
    let platform = total - provider - referrer;
    if platform.is_negative() {
        return Err(SplitError::NegativePlatformShare { total, platform });
    }
    Ok(crate::db_types::SplitAmounts { provider, referrer, platform })
}

/// `total * bps / 10_000`, rounded half-up, computed in i128 so intermediate products cannot
/// overflow.
fn rounded_share(total: Cents, bps: u32) -> Cents {
    let share = (i128::from(total.value()) * i128::from(bps) + BPS_SCALE / 2) / BPS_SCALE;
    #[allow(clippy::cast_possible_truncation)]
    Cents::from(share as i64)
}

#[cfg(test)]
mod test {
    use spg_common::Cents;

    use super::{money_split, SplitConfig, SplitError};

    #[test]
    fn shares_sum_to_total_for_all_inputs() {
        let config = SplitConfig::default();
        for total in (0..25_000).chain([i64::MAX - 1, 999_999_999_999]) {
            let total = Cents::from(total);
            let split = money_split(total, &config).expect("split failed");
            assert_eq!(split.provider + split.referrer + split.platform, total, "sum mismatch for {total}");
            assert!(!split.provider.is_negative());
            assert!(!split.referrer.is_negative());
            assert!(!split.platform.is_negative());
        }
    }

    #[test]
    fn split_is_deterministic() {
        let config = SplitConfig::new(7000, 1000).unwrap();
        let total = Cents::from(33_333);
        assert_eq!(money_split(total, &config).unwrap(), money_split(total, &config).unwrap());
    }

    #[test]
    fn reference_split() {
        // 70% / 10% of 10 000 cents
        let config = SplitConfig::new(7000, 1000).unwrap();
        let split = money_split(Cents::from(10_000), &config).unwrap();
        assert_eq!(split.provider, Cents::from(7_000));
        assert_eq!(split.referrer, Cents::from(1_000));
        assert_eq!(split.platform, Cents::from(2_000));
    }

    #[test]
    fn rounds_half_up() {
        // 15 * 0.70 = 10.5 -> 11, 15 * 0.10 = 1.5 -> 2
        let config = SplitConfig::new(7000, 1000).unwrap();
        let split = money_split(Cents::from(15), &config).unwrap();
        assert_eq!(split.provider, Cents::from(11));
        assert_eq!(split.referrer, Cents::from(2));
        assert_eq!(split.platform, Cents::from(2));
    }

    #[test]
    fn zero_total() {
        let split = money_split(Cents::from(0), &SplitConfig::default()).unwrap();
        assert_eq!(split.total(), Cents::from(0));
    }

    #[test]
    fn negative_total_is_rejected() {
        let err = money_split(Cents::from(-1), &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, SplitError::NegativeTotal(_)));
    }

    #[test]
    fn oversubscribed_config_is_rejected() {
        let err = SplitConfig::new(9000, 2000).unwrap_err();
        assert!(matches!(err, SplitError::SharesExceedWhole(11_000)));
    }

    #[test]
    fn absurd_share_values_are_rejected_without_overflow() {
        let err = SplitConfig::new(u32::MAX, u32::MAX).unwrap_err();
        let SplitError::SharesExceedWhole(sum) = err else { panic!("expected SharesExceedWhole, got {err}") };
        assert_eq!(sum, 2 * u64::from(u32::MAX));
    }

    #[test]
    fn full_allocation_leaves_zero_platform_share() {
        let config = SplitConfig::new(9000, 1000).unwrap();
        let split = money_split(Cents::from(10_000), &config).unwrap();
        assert_eq!(split.platform, Cents::from(0));
    }
}
