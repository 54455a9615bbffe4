//! Tiered margin-of-error lookup

use crate::config::ToleranceConfig;

/// Margin of error applicable to `value`.
///
/// With `always_use_default` the tiers are not consulted at all. Otherwise the
/// first tier whose `(min, max]` interval holds the value wins, and values
/// outside every tier fall back to the default margin.
pub fn resolve_margin(value: f64, config: &ToleranceConfig) -> f64 {
    if config.always_use_default {
        return config.default_margin;
    }

    config
        .tiers
        .iter()
        .find(|tier| tier.contains(value))
        .map_or(config.default_margin, |tier| tier.margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    fn two_tiers(always_use_default: bool) -> ToleranceConfig {
        ToleranceConfig {
            default_margin: 5.0,
            always_use_default,
            tiers: vec![Tier::new(0.0, 200.0, 0.8), Tier::new(200.0, 800.0, 1.5)],
        }
    }

    #[test]
    fn test_upper_bound_is_inclusive() {
        let config = two_tiers(false);
        assert_eq!(resolve_margin(200.0, &config), 0.8);
        assert_eq!(resolve_margin(200.0001, &config), 1.5);
    }

    #[test]
    fn test_lower_bound_is_exclusive() {
        let config = two_tiers(false);
        assert_eq!(resolve_margin(0.0, &config), 5.0);
        assert_eq!(resolve_margin(0.5, &config), 0.8);
    }

    #[test]
    fn test_out_of_tier_falls_back_to_default() {
        let config = two_tiers(false);
        assert_eq!(resolve_margin(801.0, &config), 5.0);
        assert_eq!(resolve_margin(-3.0, &config), 5.0);
    }

    #[test]
    fn test_always_use_default_ignores_tiers() {
        let config = two_tiers(true);
        for value in [-10.0, 0.0, 100.0, 200.0, 500.0, 1e9] {
            assert_eq!(resolve_margin(value, &config), 5.0);
        }
    }

    #[test]
    fn test_first_declared_tier_wins_on_overlap() {
        let config = ToleranceConfig::tiered(
            9.0,
            vec![Tier::new(0.0, 100.0, 0.1), Tier::new(50.0, 150.0, 0.2)],
        );
        assert_eq!(resolve_margin(75.0, &config), 0.1);
        assert_eq!(resolve_margin(125.0, &config), 0.2);
    }

    #[test]
    fn test_malformed_tiers_unused_with_default() {
        let config = ToleranceConfig {
            default_margin: 0.8,
            always_use_default: true,
            tiers: vec![Tier::new(f64::NAN, -1.0, -7.0)],
        };
        assert_eq!(resolve_margin(1.0, &config), 0.8);
    }
}
