//! Detector threshold configuration.
//!
//! Every tunable the heuristics use lives here, with documented defaults.
//! There is no global tuning state; callers construct or deserialize one
//! `HeuristicConfig` and pass it to every detector. Invalid values are
//! rejected at startup, never clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A threshold or weight outside its valid range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("{field} must lie in (0, 1], got {value}")]
    UnitRange { field: &'static str, value: Decimal },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },
    #[error("snipe signal weights must sum to at most 1, got {sum}")]
    WeightSum { sum: Decimal },
    #[error("cluster_min_count must be at least 1")]
    ZeroClusterCount,
    #[error("wash_price_delta_threshold must be positive, got {value}")]
    NonPositivePriceDelta { value: Decimal },
}

/// Named thresholds for all four heuristics.
///
/// Deserializable from JSON; missing fields fall back to the defaults
/// below, which are calibration starting points rather than contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicConfig {
    /// Minimum victim price impact, as a fraction, before the sandwich
    /// detector credits the impact signal. Default 0.5%.
    pub min_price_impact_threshold: Decimal,
    /// Blocks after launch that count as the snipe window.
    pub snipe_window_blocks: u64,
    /// Fraction of the supply proxy a single buy must exceed to trip the
    /// snipe supply signal.
    pub snipe_supply_threshold: Decimal,
    /// Other buys required in the snipe window to trip the cluster signal.
    pub cluster_min_count: usize,
    /// Snipe confidence weight of the supply signal.
    pub snipe_supply_weight: Decimal,
    /// Snipe confidence weight of the contract-origin signal.
    pub snipe_contract_weight: Decimal,
    /// Snipe confidence weight of the cluster signal.
    pub snipe_cluster_weight: Decimal,
    /// Width of the arbitrage comparison window in blocks.
    pub arb_window_blocks: u64,
    /// Relative cross-exchange price spread that counts as arbitrage.
    pub arb_price_diff_threshold: Decimal,
    /// Maximum blocks between the two legs of a wash pair.
    pub wash_max_block_gap: u64,
    /// Absolute price delta (quote units) below which a round trip counts
    /// as having no genuine price risk.
    pub wash_price_delta_threshold: Decimal,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            min_price_impact_threshold: Decimal::new(5, 3),
            snipe_window_blocks: 5,
            snipe_supply_threshold: Decimal::new(5, 2),
            cluster_min_count: 3,
            snipe_supply_weight: Decimal::new(40, 2),
            snipe_contract_weight: Decimal::new(35, 2),
            snipe_cluster_weight: Decimal::new(25, 2),
            arb_window_blocks: 2,
            arb_price_diff_threshold: Decimal::new(3, 2),
            wash_max_block_gap: 10,
            wash_price_delta_threshold: Decimal::ONE,
        }
    }
}

impl HeuristicConfig {
    /// Check every threshold against its valid range.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        unit_range(
            "min_price_impact_threshold",
            self.min_price_impact_threshold,
        )?;
        unit_range("snipe_supply_threshold", self.snipe_supply_threshold)?;
        unit_range("arb_price_diff_threshold", self.arb_price_diff_threshold)?;

        non_negative("snipe_supply_weight", self.snipe_supply_weight)?;
        non_negative("snipe_contract_weight", self.snipe_contract_weight)?;
        non_negative("snipe_cluster_weight", self.snipe_cluster_weight)?;
        let weight_sum =
            self.snipe_supply_weight + self.snipe_contract_weight + self.snipe_cluster_weight;
        if weight_sum > Decimal::ONE {
            return Err(ConfigValidationError::WeightSum { sum: weight_sum });
        }

        if self.cluster_min_count == 0 {
            return Err(ConfigValidationError::ZeroClusterCount);
        }
        if self.wash_price_delta_threshold <= Decimal::ZERO {
            return Err(ConfigValidationError::NonPositivePriceDelta {
                value: self.wash_price_delta_threshold,
            });
        }
        Ok(())
    }
}

fn unit_range(field: &'static str, value: Decimal) -> Result<(), ConfigValidationError> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigValidationError::UnitRange { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), ConfigValidationError> {
    if value < Decimal::ZERO {
        return Err(ConfigValidationError::Negative { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HeuristicConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_threshold_above_one() {
        let config = HeuristicConfig {
            arb_price_diff_threshold: Decimal::new(15, 1),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::UnitRange {
                field: "arb_price_diff_threshold",
                ..
            })
        ));
    }

    #[test]
    fn rejects_negative_threshold() {
        let config = HeuristicConfig {
            min_price_impact_threshold: Decimal::new(-1, 2),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_overweighted_snipe_signals() {
        let config = HeuristicConfig {
            snipe_supply_weight: Decimal::new(60, 2),
            snipe_contract_weight: Decimal::new(60, 2),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::WeightSum { .. })
        ));
    }

    #[test]
    fn missing_json_fields_fall_back_to_defaults() {
        let config: HeuristicConfig =
            serde_json::from_str(r#"{"snipe_window_blocks": 8}"#).unwrap();
        assert_eq!(config.snipe_window_blocks, 8);
        assert_eq!(
            config.arb_price_diff_threshold,
            HeuristicConfig::default().arb_price_diff_threshold
        );
    }
}
