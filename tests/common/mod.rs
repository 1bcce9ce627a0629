//! Shared fixtures for integration tests.
#![allow(dead_code)]

use dexmetrics::{
    Bundle, Exchange, InMemoryEntityStore, MetricsEngine, Pair, PricingConfig, StaticPairGraph,
    Token,
};
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

pub const REFERENCE: u8 = 1;
pub const STABLECOIN: u8 = 2;
pub const FACTORY: u8 = 100;

pub fn addr(val: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = val;
    Address::from(bytes)
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Raw amount of `units` whole tokens at the given decimals.
pub fn raw(units: u64, decimals: u8) -> U256 {
    U256::from(units) * U256::exp10(decimals as usize)
}

pub fn pricing_config(stable_reference_pairs: Vec<Address>) -> Arc<PricingConfig> {
    Arc::new(PricingConfig {
        reference_token: addr(REFERENCE),
        whitelist: vec![addr(REFERENCE), addr(STABLECOIN)],
        stable_reference_pairs,
        min_liquidity_threshold_reference: dec("2"),
        min_usd_threshold_new_pairs: dec("50000"),
    })
}

pub fn reference_token() -> Token {
    Token::new(addr(REFERENCE), "WREF".into(), "Wrapped Reference".into(), 18)
}

pub fn stablecoin_token() -> Token {
    Token::new(addr(STABLECOIN), "USDs".into(), "Stable USD".into(), 6)
}

/// Engine over fresh in-memory state with the exchange and bundle singletons
/// created.
pub fn fresh_engine(
    config: Arc<PricingConfig>,
) -> MetricsEngine<InMemoryEntityStore, StaticPairGraph> {
    let mut engine = MetricsEngine::new(config, InMemoryEntityStore::new(), StaticPairGraph::new());
    engine.initialize(addr(FACTORY)).unwrap();
    engine
}

/// Register a pair plus both token entities and its graph edge.
pub fn index_pair(
    engine: &mut MetricsEngine<InMemoryEntityStore, StaticPairGraph>,
    pair_address: Address,
    token0: Token,
    token1: Token,
    created_at: u64,
) {
    engine
        .graph_mut()
        .insert(token0.address, token1.address, pair_address);
    let pair = Pair::new(pair_address, token0.address, token1.address, created_at);
    engine.register_pair(pair, token0, token1).unwrap();
}

pub fn seeded_bundle(price: &str) -> Bundle {
    Bundle {
        reference_price_usd: dec(price),
    }
}

pub fn seeded_exchange() -> Exchange {
    Exchange::new(addr(FACTORY))
}
