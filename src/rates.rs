//! Danish tax-free mileage reimbursement ("kørselsgodtgørelse") rates.
//!
//! The rate is tiered: every kilometre up to the yearly threshold is paid at
//! the high rate, everything above it at the low rate.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTier {
    pub high: f64,
    pub low: f64,
    pub threshold_km: f64,
}

const RATES: &[(i32, RateTier)] = &[
    (
        2023,
        RateTier {
            high: 3.73,
            low: 2.19,
            threshold_km: 20_000.0,
        },
    ),
    (
        2024,
        RateTier {
            high: 3.79,
            low: 2.23,
            threshold_km: 20_000.0,
        },
    ),
    (
        2025,
        RateTier {
            high: 3.94,
            low: 2.28,
            threshold_km: 20_000.0,
        },
    ),
    // 2026 repeats 2025 until the official rates are published.
    (
        2026,
        RateTier {
            high: 3.94,
            low: 2.28,
            threshold_km: 20_000.0,
        },
    ),
];

/// Rates for `year`, or the latest known rates for years outside the table.
pub fn rates_for(year: i32) -> RateTier {
    RATES
        .iter()
        .find(|(y, _)| *y == year)
        .or_else(|| RATES.last())
        .map(|(_, tier)| *tier)
        .unwrap_or(RateTier {
            high: 0.0,
            low: 0.0,
            threshold_km: 0.0,
        })
}

pub fn reimbursement(total_km: f64, year: i32) -> f64 {
    let tier = rates_for(year);
    if total_km <= tier.threshold_km {
        total_km * tier.high
    } else {
        tier.threshold_km * tier.high + (total_km - tier.threshold_km) * tier.low
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_year_uses_its_own_rates() {
        let tier = rates_for(2024);
        assert_eq!(tier.high, 3.79);
        assert_eq!(tier.low, 2.23);
    }

    #[test]
    fn unknown_year_falls_back_to_latest() {
        assert_eq!(rates_for(1999), rates_for(2026));
        assert_eq!(rates_for(2040), rates_for(2026));
    }

    #[test]
    fn below_threshold_pays_high_rate_only() {
        let value = reimbursement(100.0, 2025);
        assert!((value - 394.0).abs() < 1e-9);
    }

    #[test]
    fn at_threshold_pays_high_rate_only() {
        let value = reimbursement(20_000.0, 2023);
        assert!((value - 74_600.0).abs() < 1e-6);
    }

    #[test]
    fn above_threshold_splits_between_tiers() {
        let value = reimbursement(21_000.0, 2025);
        let expected = 20_000.0 * 3.94 + 1_000.0 * 2.28;
        assert!((value - expected).abs() < 1e-6);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(12.35, 0), 12.0);
        assert_eq!(round_to(7.25, 1), 7.3);
        assert_eq!(round_to(0.0, 2), 0.0);
    }
}
