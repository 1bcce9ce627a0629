// src/pricing.rs

//! # Price & Volume Engine
//!
//! Three stateless components, all pure functions of store state plus their
//! arguments:
//!
//! - [`PriceOracle`] derives a token's value in reference-currency units by a
//!   single-hop search through the whitelist's trading pairs.
//! - [`ReferencePriceFeed`] derives the reference currency's USD price from
//!   the configured stablecoin pairs.
//! - [`VolumeAttributor`] converts trade/mint/burn amounts into tracked USD
//!   volume and liquidity, applying the whitelist and anti-manipulation rules.
//!
//! Zero is a pervasive, valid sentinel here: it means "no confidence price
//! yet", and every dependent figure silently computes to zero until a
//! whitelist path with enough liquidity exists.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::{PricingConfig, NEW_PAIR_LP_THRESHOLD};
use crate::errors::PriceError;
use crate::pair_graph::PairGraph;
use crate::store::EntityStore;
use crate::types::{Bundle, Pair, PairSide, Token};

/// Derives a token's reference-currency price via the whitelist pair graph.
#[derive(Debug, Clone)]
pub struct PriceOracle {
    config: Arc<PricingConfig>,
}

impl PriceOracle {
    pub fn new(config: Arc<PricingConfig>) -> Self {
        Self { config }
    }

    /// The token's value in reference-currency units.
    ///
    /// Walks the whitelist in declared order and relays through the first
    /// pair that is indexed and holds at least the configured minimum
    /// reference-currency liquidity; the counterparty's own derived price is
    /// assumed current (it converges over repeated event processing rather
    /// than being solved as a fixed point). Returns zero when no whitelist
    /// pair qualifies.
    pub fn derived_reference_price(
        &self,
        token: &Token,
        store: &dyn EntityStore,
        graph: &dyn PairGraph,
    ) -> Result<Decimal, PriceError> {
        if token.address == self.config.reference_token {
            return Ok(Decimal::ONE);
        }

        for &anchor in &self.config.whitelist {
            let Some(pair_address) = graph.pair_for(token.address, anchor) else {
                continue;
            };
            let Some(pair) = store.pair(pair_address)? else {
                trace!(
                    target: "pricing",
                    pair = ?pair_address,
                    "whitelist pair not yet indexed, skipping"
                );
                continue;
            };
            // Thin pairs can quote an arbitrarily skewed price.
            if pair.reserve_reference < self.config.min_liquidity_threshold_reference {
                debug!(
                    target: "pricing",
                    pair = ?pair_address,
                    reserve = %pair.reserve_reference,
                    "whitelist pair below liquidity threshold, skipping"
                );
                continue;
            }
            let (counterparty_address, spot_price) = match pair.side_of(token.address) {
                Some(PairSide::Token0) => (pair.token1, pair.token1_price),
                Some(PairSide::Token1) => (pair.token0, pair.token0_price),
                None => continue,
            };
            let Some(counterparty) = store.token(counterparty_address)? else {
                continue;
            };
            return Ok(spot_price * counterparty.derived_reference_price);
        }

        Ok(Decimal::ZERO)
    }
}

/// Derives the reference currency's USD price from the configured
/// stablecoin/reference pairs.
#[derive(Debug, Clone)]
pub struct ReferencePriceFeed {
    config: Arc<PricingConfig>,
}

impl ReferencePriceFeed {
    pub fn new(config: Arc<PricingConfig>) -> Self {
        Self { config }
    }

    /// Reserve-weighted average of the stablecoin pairs' quotes, weighted by
    /// each pair's reference-currency reserve. With a single indexed pair its
    /// quote is used directly; with none (or a degenerate zero total reserve)
    /// the feed is not yet bootstrapped and reports zero.
    pub fn reference_price_usd(&self, store: &dyn EntityStore) -> Result<Decimal, PriceError> {
        let mut quotes: Vec<(Decimal, Decimal)> = Vec::new();

        for &pair_address in &self.config.stable_reference_pairs {
            let Some(pair) = store.pair(pair_address)? else {
                continue;
            };
            let (price, reference_reserve) = match pair.side_of(self.config.reference_token) {
                Some(PairSide::Token0) => (pair.token1_price, pair.reserve0),
                Some(PairSide::Token1) => (pair.token0_price, pair.reserve1),
                None => {
                    warn!(
                        target: "pricing",
                        pair = ?pair_address,
                        "configured stable pair does not contain the reference token"
                    );
                    continue;
                }
            };
            quotes.push((price, reference_reserve));
        }

        match quotes.as_slice() {
            [] => Ok(Decimal::ZERO),
            [(price, _)] => Ok(*price),
            quotes => {
                let total_reference: Decimal = quotes.iter().map(|(_, reserve)| *reserve).sum();
                if total_reference.is_zero() {
                    return Ok(Decimal::ZERO);
                }
                let mut weighted = Decimal::ZERO;
                for &(price, reserve) in quotes {
                    weighted += price * (reserve / total_reference);
                }
                Ok(weighted)
            }
        }
    }
}

/// Attributes USD volume and liquidity to trades based on whitelist
/// membership.
#[derive(Debug, Clone)]
pub struct VolumeAttributor {
    config: Arc<PricingConfig>,
}

impl VolumeAttributor {
    pub fn new(config: Arc<PricingConfig>) -> Self {
        Self { config }
    }

    fn usd_price(&self, token: &Token, bundle: &Bundle) -> Decimal {
        token.derived_reference_price * bundle.reference_price_usd
    }

    /// USD volume the engine is confident in.
    ///
    /// Both sides whitelisted: the average of the two USD-converted amounts.
    /// One side: that side's full USD value. Neither: zero. Pairs with fewer
    /// than [`NEW_PAIR_LP_THRESHOLD`] liquidity providers must additionally
    /// hold the configured minimum USD reserves, since a nearly-empty pair is
    /// cheap to wash-trade.
    pub fn tracked_volume_usd(
        &self,
        amount0: Decimal,
        token0: &Token,
        amount1: Decimal,
        token1: &Token,
        pair: &Pair,
        bundle: &Bundle,
    ) -> Decimal {
        let price0 = self.usd_price(token0, bundle);
        let price1 = self.usd_price(token1, bundle);
        let whitelisted0 = self.config.is_whitelisted(token0.address);
        let whitelisted1 = self.config.is_whitelisted(token1.address);

        if pair.liquidity_provider_count < NEW_PAIR_LP_THRESHOLD {
            let reserve0_usd = pair.reserve0 * price0;
            let reserve1_usd = pair.reserve1 * price1;
            let floor = self.config.min_usd_threshold_new_pairs;
            let passes = match (whitelisted0, whitelisted1) {
                (true, true) => reserve0_usd + reserve1_usd >= floor,
                (true, false) => reserve0_usd * Decimal::TWO >= floor,
                (false, true) => reserve1_usd * Decimal::TWO >= floor,
                // Unpriceable either way; the branch below reports zero.
                (false, false) => true,
            };
            if !passes {
                debug!(
                    target: "pricing",
                    pair = ?pair.address,
                    providers = pair.liquidity_provider_count,
                    "new pair below reserve floor, volume not tracked"
                );
                return Decimal::ZERO;
            }
        }

        match (whitelisted0, whitelisted1) {
            (true, true) => (amount0 * price0 + amount1 * price1) / Decimal::TWO,
            (true, false) => amount0 * price0,
            (false, true) => amount1 * price1,
            (false, false) => Decimal::ZERO,
        }
    }

    /// USD liquidity the engine is confident in. Mirrors the volume
    /// branching, without the new-pair guard: both sides whitelisted sums
    /// them; a single whitelisted side is doubled to approximate the whole
    /// pool under balanced reserves.
    pub fn tracked_liquidity_usd(
        &self,
        amount0: Decimal,
        token0: &Token,
        amount1: Decimal,
        token1: &Token,
        bundle: &Bundle,
    ) -> Decimal {
        let price0 = self.usd_price(token0, bundle);
        let price1 = self.usd_price(token1, bundle);
        let whitelisted0 = self.config.is_whitelisted(token0.address);
        let whitelisted1 = self.config.is_whitelisted(token1.address);

        match (whitelisted0, whitelisted1) {
            (true, true) => amount0 * price0 + amount1 * price1,
            (true, false) => amount0 * price0 * Decimal::TWO,
            (false, true) => amount1 * price1 * Decimal::TWO,
            (false, false) => Decimal::ZERO,
        }
    }
}

/// Spot prices from fresh reserves, with the empty-side guard: a pair with an
/// empty reserve quotes zero on both sides rather than dividing by zero.
pub fn spot_prices(reserve0: Decimal, reserve1: Decimal) -> (Decimal, Decimal) {
    if reserve0.is_zero() || reserve1.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    (reserve0 / reserve1, reserve1 / reserve0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair_graph::StaticPairGraph;
    use crate::store::InMemoryEntityStore;
    use ethers::types::Address;
    use std::str::FromStr;

    fn sample_address(val: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = val;
        Address::from(bytes)
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn config() -> Arc<PricingConfig> {
        Arc::new(PricingConfig {
            reference_token: sample_address(1),
            whitelist: vec![sample_address(1), sample_address(2), sample_address(3)],
            stable_reference_pairs: vec![sample_address(20), sample_address(21)],
            min_liquidity_threshold_reference: dec("2"),
            min_usd_threshold_new_pairs: dec("50000"),
        })
    }

    fn token(address: Address, derived: &str) -> Token {
        let mut token = Token::new(address, "TKN".into(), "Token".into(), 18);
        token.derived_reference_price = dec(derived);
        token
    }

    fn pair_with_reserves(
        address: Address,
        token0: Address,
        token1: Address,
        reserve0: &str,
        reserve1: &str,
    ) -> Pair {
        let mut pair = Pair::new(address, token0, token1, 0);
        pair.reserve0 = dec(reserve0);
        pair.reserve1 = dec(reserve1);
        let (price0, price1) = spot_prices(pair.reserve0, pair.reserve1);
        pair.token0_price = price0;
        pair.token1_price = price1;
        pair
    }

    #[test]
    fn reference_token_is_the_unit() {
        let oracle = PriceOracle::new(config());
        let store = InMemoryEntityStore::new();
        let graph = StaticPairGraph::new();
        let reference = token(sample_address(1), "0");

        let price = oracle
            .derived_reference_price(&reference, &store, &graph)
            .unwrap();
        assert_eq!(price, Decimal::ONE);
    }

    #[test]
    fn unpriceable_token_reports_zero() {
        let oracle = PriceOracle::new(config());
        let store = InMemoryEntityStore::new();
        let graph = StaticPairGraph::new();
        let unknown = token(sample_address(99), "0");

        let price = oracle
            .derived_reference_price(&unknown, &store, &graph)
            .unwrap();
        assert_eq!(price, Decimal::ZERO);
    }

    #[test]
    fn first_qualifying_whitelist_pair_wins_over_earlier_thin_pair() {
        // Token 99 trades against whitelist entries 2 and 3. The pair with
        // entry 2 (earlier in whitelist order) is below the liquidity
        // threshold; the pair with entry 3 qualifies.
        let subject = sample_address(99);
        let anchor_thin = sample_address(2);
        let anchor_deep = sample_address(3);

        let mut store = InMemoryEntityStore::new();
        let mut graph = StaticPairGraph::new();

        let thin_pair_address = sample_address(30);
        let mut thin_pair =
            pair_with_reserves(thin_pair_address, subject, anchor_thin, "1000", "10");
        thin_pair.reserve_reference = dec("1"); // below threshold of 2
        graph.insert(subject, anchor_thin, thin_pair_address);
        store.save_pair(thin_pair).unwrap();

        let deep_pair_address = sample_address(31);
        let mut deep_pair =
            pair_with_reserves(deep_pair_address, subject, anchor_deep, "100", "5000");
        deep_pair.reserve_reference = dec("40");
        graph.insert(subject, anchor_deep, deep_pair_address);
        store.save_pair(deep_pair).unwrap();

        store.save_token(token(anchor_thin, "1")).unwrap();
        store.save_token(token(anchor_deep, "0.5")).unwrap();

        let oracle = PriceOracle::new(config());
        let price = oracle
            .derived_reference_price(&token(subject, "0"), &store, &graph)
            .unwrap();

        // token1_price of the deep pair is 5000/100 = 50 anchors per token,
        // times the anchor's derived price of 0.5.
        assert_eq!(price, dec("25"));
    }

    #[test]
    fn pair_exactly_at_liquidity_threshold_qualifies() {
        let subject = sample_address(99);
        let anchor = sample_address(2);
        let pair_address = sample_address(30);

        let mut store = InMemoryEntityStore::new();
        let mut graph = StaticPairGraph::new();

        let mut pair = pair_with_reserves(pair_address, subject, anchor, "10", "10");
        pair.reserve_reference = dec("2"); // exactly at the threshold
        graph.insert(subject, anchor, pair_address);
        store.save_pair(pair).unwrap();
        store.save_token(token(anchor, "1")).unwrap();

        let oracle = PriceOracle::new(config());
        let price = oracle
            .derived_reference_price(&token(subject, "0"), &store, &graph)
            .unwrap();
        assert_eq!(price, Decimal::ONE);
    }

    #[test]
    fn counterparty_side_is_resolved_for_token1_subjects() {
        let subject = sample_address(99);
        let anchor = sample_address(2);
        let pair_address = sample_address(30);

        let mut store = InMemoryEntityStore::new();
        let mut graph = StaticPairGraph::new();

        // Subject sits on side 1 here, so the relay uses token0_price.
        let mut pair = pair_with_reserves(pair_address, anchor, subject, "300", "100");
        pair.reserve_reference = dec("10");
        graph.insert(subject, anchor, pair_address);
        store.save_pair(pair).unwrap();
        store.save_token(token(anchor, "2")).unwrap();

        let oracle = PriceOracle::new(config());
        let price = oracle
            .derived_reference_price(&token(subject, "0"), &store, &graph)
            .unwrap();

        // token0_price = 300/100 = 3 anchors per subject, times derived 2.
        assert_eq!(price, dec("6"));
    }

    #[test]
    fn feed_weights_quotes_by_reference_reserve() {
        let reference = sample_address(1);
        let stable_a = sample_address(5);
        let stable_b = sample_address(6);

        let mut store = InMemoryEntityStore::new();

        // Reference on side 0 of both pairs: quote is token1_price, the
        // reference reserve is reserve0.
        let mut pair_a = pair_with_reserves(sample_address(20), reference, stable_a, "100", "100");
        pair_a.token1_price = dec("1.00");
        pair_a.reserve0 = dec("100");
        store.save_pair(pair_a).unwrap();

        let mut pair_b = pair_with_reserves(sample_address(21), reference, stable_b, "300", "297");
        pair_b.token1_price = dec("0.99");
        pair_b.reserve0 = dec("300");
        store.save_pair(pair_b).unwrap();

        let feed = ReferencePriceFeed::new(config());
        let price = feed.reference_price_usd(&store).unwrap();
        assert_eq!(price, dec("0.9925"));
    }

    #[test]
    fn feed_uses_single_pair_directly() {
        let reference = sample_address(1);
        let stable = sample_address(5);

        let mut store = InMemoryEntityStore::new();
        let mut pair = pair_with_reserves(sample_address(20), stable, reference, "4200", "2");
        pair.token0_price = dec("2100");
        store.save_pair(pair).unwrap();

        let feed = ReferencePriceFeed::new(config());
        assert_eq!(feed.reference_price_usd(&store).unwrap(), dec("2100"));
    }

    #[test]
    fn feed_without_pairs_reports_zero() {
        let feed = ReferencePriceFeed::new(config());
        let store = InMemoryEntityStore::new();
        assert_eq!(feed.reference_price_usd(&store).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn feed_with_zero_total_reserve_reports_zero() {
        let reference = sample_address(1);
        let stable = sample_address(5);

        let mut store = InMemoryEntityStore::new();
        for pair_address in [sample_address(20), sample_address(21)] {
            let mut pair = pair_with_reserves(pair_address, reference, stable, "0", "0");
            pair.token1_price = dec("1");
            store.save_pair(pair).unwrap();
        }

        let feed = ReferencePriceFeed::new(config());
        assert_eq!(feed.reference_price_usd(&store).unwrap(), Decimal::ZERO);
    }

    fn seasoned_pair(token0: Address, token1: Address) -> Pair {
        let mut pair = pair_with_reserves(sample_address(40), token0, token1, "1000", "1000");
        pair.liquidity_provider_count = NEW_PAIR_LP_THRESHOLD;
        pair
    }

    #[test]
    fn volume_is_averaged_and_symmetric_when_both_whitelisted() {
        let bundle = Bundle {
            reference_price_usd: dec("10"),
        };
        let token_a = token(sample_address(2), "1");
        let token_b = token(sample_address(3), "0.5");
        let attributor = VolumeAttributor::new(config());

        let pair_ab = seasoned_pair(token_a.address, token_b.address);
        let forward = attributor.tracked_volume_usd(
            dec("4"),
            &token_a,
            dec("10"),
            &token_b,
            &pair_ab,
            &bundle,
        );
        // (4 * 10 + 10 * 5) / 2
        assert_eq!(forward, dec("45"));

        let pair_ba = seasoned_pair(token_b.address, token_a.address);
        let reversed = attributor.tracked_volume_usd(
            dec("10"),
            &token_b,
            dec("4"),
            &token_a,
            &pair_ba,
            &bundle,
        );
        assert_eq!(forward, reversed);
    }

    #[test]
    fn volume_counts_only_the_whitelisted_side() {
        let bundle = Bundle {
            reference_price_usd: dec("10"),
        };
        let anchor = token(sample_address(2), "1");
        let exotic = token(sample_address(99), "3"); // derived price is untrusted
        let attributor = VolumeAttributor::new(config());

        let pair = seasoned_pair(anchor.address, exotic.address);
        let tracked =
            attributor.tracked_volume_usd(dec("7"), &anchor, dec("1"), &exotic, &pair, &bundle);
        assert_eq!(tracked, dec("70"));
    }

    #[test]
    fn volume_without_whitelisted_side_is_zero() {
        let bundle = Bundle {
            reference_price_usd: dec("10"),
        };
        let exotic_a = token(sample_address(98), "1");
        let exotic_b = token(sample_address(99), "1");
        let attributor = VolumeAttributor::new(config());

        let pair = seasoned_pair(exotic_a.address, exotic_b.address);
        let tracked =
            attributor.tracked_volume_usd(dec("7"), &exotic_a, dec("7"), &exotic_b, &pair, &bundle);
        assert_eq!(tracked, Decimal::ZERO);
    }

    #[test]
    fn new_pair_at_exact_reserve_floor_is_not_excluded() {
        let bundle = Bundle {
            reference_price_usd: dec("1"),
        };
        let token_a = token(sample_address(2), "1");
        let token_b = token(sample_address(3), "1");
        let attributor = VolumeAttributor::new(config());

        let mut pair = pair_with_reserves(
            sample_address(40),
            token_a.address,
            token_b.address,
            "25000",
            "25000",
        );
        pair.liquidity_provider_count = 4;

        // reserve0USD + reserve1USD == 50000, exactly the configured floor.
        let tracked = attributor.tracked_volume_usd(
            dec("10"),
            &token_a,
            dec("10"),
            &token_b,
            &pair,
            &bundle,
        );
        assert_eq!(tracked, dec("10"));
    }

    #[test]
    fn new_pair_below_reserve_floor_is_excluded() {
        let bundle = Bundle {
            reference_price_usd: dec("1"),
        };
        let token_a = token(sample_address(2), "1");
        let token_b = token(sample_address(3), "1");
        let attributor = VolumeAttributor::new(config());

        let mut pair = pair_with_reserves(
            sample_address(40),
            token_a.address,
            token_b.address,
            "25000",
            "24999",
        );
        pair.liquidity_provider_count = 4;

        let tracked = attributor.tracked_volume_usd(
            dec("10"),
            &token_a,
            dec("10"),
            &token_b,
            &pair,
            &bundle,
        );
        assert_eq!(tracked, Decimal::ZERO);
    }

    #[test]
    fn guard_doubles_a_single_whitelisted_side() {
        let bundle = Bundle {
            reference_price_usd: dec("1"),
        };
        let anchor = token(sample_address(2), "1");
        let exotic = token(sample_address(99), "0");
        let attributor = VolumeAttributor::new(config());

        let mut pair = pair_with_reserves(
            sample_address(40),
            anchor.address,
            exotic.address,
            "25000",
            "1",
        );
        pair.liquidity_provider_count = 1;

        // 25000 * 2 == 50000 passes the floor.
        let tracked =
            attributor.tracked_volume_usd(dec("3"), &anchor, dec("1"), &exotic, &pair, &bundle);
        assert_eq!(tracked, dec("3"));

        pair.reserve0 = dec("24999");
        let tracked =
            attributor.tracked_volume_usd(dec("3"), &anchor, dec("1"), &exotic, &pair, &bundle);
        assert_eq!(tracked, Decimal::ZERO);
    }

    #[test]
    fn enough_liquidity_providers_bypass_the_guard() {
        let bundle = Bundle {
            reference_price_usd: dec("1"),
        };
        let token_a = token(sample_address(2), "1");
        let token_b = token(sample_address(3), "1");
        let attributor = VolumeAttributor::new(config());

        // Nearly empty reserves, but 5 providers: the guard does not apply.
        let mut pair =
            pair_with_reserves(sample_address(40), token_a.address, token_b.address, "1", "1");
        pair.liquidity_provider_count = NEW_PAIR_LP_THRESHOLD;

        let tracked = attributor.tracked_volume_usd(
            dec("10"),
            &token_a,
            dec("10"),
            &token_b,
            &pair,
            &bundle,
        );
        assert_eq!(tracked, dec("10"));
    }

    #[test]
    fn liquidity_sums_both_whitelisted_sides() {
        let bundle = Bundle {
            reference_price_usd: dec("10"),
        };
        let token_a = token(sample_address(2), "1");
        let token_b = token(sample_address(3), "0.5");
        let attributor = VolumeAttributor::new(config());

        let liquidity =
            attributor.tracked_liquidity_usd(dec("4"), &token_a, dec("10"), &token_b, &bundle);
        assert_eq!(liquidity, dec("90"));
    }

    #[test]
    fn liquidity_doubles_a_single_whitelisted_side() {
        let bundle = Bundle {
            reference_price_usd: dec("10"),
        };
        let anchor = token(sample_address(2), "1");
        let exotic = token(sample_address(99), "5");
        let attributor = VolumeAttributor::new(config());

        let liquidity =
            attributor.tracked_liquidity_usd(dec("4"), &anchor, dec("10"), &exotic, &bundle);
        assert_eq!(liquidity, dec("80"));

        let neither = attributor.tracked_liquidity_usd(
            dec("4"),
            &token(sample_address(98), "1"),
            dec("10"),
            &exotic,
            &bundle,
        );
        assert_eq!(neither, Decimal::ZERO);
    }

    #[test]
    fn spot_prices_are_reciprocal_and_zero_guarded() {
        let (price0, price1) = spot_prices(dec("300"), dec("100"));
        assert_eq!(price0, dec("3"));
        assert_eq!(price1, Decimal::ONE / dec("3"));
        assert_eq!(spot_prices(Decimal::ZERO, dec("100")), (Decimal::ZERO, Decimal::ZERO));
    }
}
