// src/config.rs

//! # Pricing Configuration
//!
//! Deployment-specific pricing parameters. The whitelist, thresholds,
//! reference token and stablecoin pair addresses differ per chain deployment,
//! so none of them are compiled into the engine; a deployment loads its
//! `PricingConfig` from a JSON file (or constructs one directly) and injects
//! it into the pricing components.

use ethers::types::Address;
use eyre::{ensure, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pricing parameters for one exchange deployment.
///
/// ```json
/// {
///   "reference_token": "0x760afe86e5de5fa0ee542fc7b7b713e1c5425701",
///   "whitelist": [
///     "0x760afe86e5de5fa0ee542fc7b7b713e1c5425701",
///     "0x7d5d0ba109a6b9f6dde7d2a89a8150b589d49504"
///   ],
///   "stable_reference_pairs": ["0x10ab4430394c9bdbdcac6b4b7b33a707ce2cee2b"],
///   "min_liquidity_threshold_reference": "2",
///   "min_usd_threshold_new_pairs": "50000"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// The wrapped native asset used as the pricing anchor.
    pub reference_token: Address,
    /// Tokens trusted as USD-price anchors, in priority order. Order is
    /// significant: the price oracle takes the first qualifying match, not the
    /// best one.
    pub whitelist: Vec<Address>,
    /// The designated stablecoin/reference-currency pairs feeding the
    /// reference USD price. Deployments configure up to two.
    pub stable_reference_pairs: Vec<Address>,
    /// Minimum pair liquidity, in reference-currency units, for a whitelist
    /// pair to be usable as a price relay.
    pub min_liquidity_threshold_reference: Decimal,
    /// Minimum combined USD reserves before volume on a pair with fewer than
    /// [`NEW_PAIR_LP_THRESHOLD`] liquidity providers counts as tracked.
    pub min_usd_threshold_new_pairs: Decimal,
}

/// Pairs with fewer liquidity providers than this are subject to the
/// minimum-reserve volume guard.
pub const NEW_PAIR_LP_THRESHOLD: u64 = 5;

impl PricingConfig {
    /// Load and validate a configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pricing config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse pricing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that catch a misassembled deployment before any event is
    /// processed.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.whitelist.is_empty(), "whitelist must not be empty");
        ensure!(
            self.whitelist.contains(&self.reference_token),
            "whitelist must include the reference token {:#x}",
            self.reference_token
        );
        ensure!(
            self.stable_reference_pairs.len() <= 2,
            "at most two stable reference pairs are supported, got {}",
            self.stable_reference_pairs.len()
        );
        ensure!(
            self.min_liquidity_threshold_reference >= Decimal::ZERO,
            "min_liquidity_threshold_reference must not be negative"
        );
        ensure!(
            self.min_usd_threshold_new_pairs >= Decimal::ZERO,
            "min_usd_threshold_new_pairs must not be negative"
        );
        Ok(())
    }

    /// Whether `token` is trusted as a USD-price anchor.
    pub fn is_whitelisted(&self, token: Address) -> bool {
        self.whitelist.contains(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(val: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = val;
        Address::from(bytes)
    }

    fn sample_config() -> PricingConfig {
        PricingConfig {
            reference_token: addr(1),
            whitelist: vec![addr(1), addr(2), addr(3)],
            stable_reference_pairs: vec![addr(10), addr(11)],
            min_liquidity_threshold_reference: Decimal::TWO,
            min_usd_threshold_new_pairs: Decimal::from(50_000),
        }
    }

    #[test]
    fn valid_config_passes() {
        sample_config().validate().unwrap();
    }

    #[test]
    fn rejects_reference_token_outside_whitelist() {
        let mut config = sample_config();
        config.reference_token = addr(9);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_more_than_two_stable_pairs() {
        let mut config = sample_config();
        config.stable_reference_pairs = vec![addr(10), addr(11), addr(12)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "reference_token": "0x0000000000000000000000000000000000000001",
            "whitelist": [
                "0x0000000000000000000000000000000000000001",
                "0x0000000000000000000000000000000000000002"
            ],
            "stable_reference_pairs": ["0x000000000000000000000000000000000000000a"],
            "min_liquidity_threshold_reference": "2",
            "min_usd_threshold_new_pairs": "50000"
        }"#;
        let config: PricingConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.whitelist.len(), 2);
        assert_eq!(
            config.min_usd_threshold_new_pairs,
            Decimal::from_str("50000").unwrap()
        );
    }
}
