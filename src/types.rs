// src/types.rs

//! Persisted entity types: live entities (token, pair, bundle, exchange
//! aggregate) and the bucketed snapshot records derived from them.
//!
//! All economic figures use exact base-10 `Decimal` so that independent
//! re-processing of the same event stream reproduces byte-identical state.
//! Counters are plain `u64` and only ever increase within a bucket.

use ethers::types::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An ERC-20 token known to the exchange.
///
/// `derived_reference_price` is the token's value in reference-currency units
/// as last computed by the price oracle; zero means "no confidence price yet",
/// not a zero valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub derived_reference_price: Decimal,
    pub total_liquidity: Decimal,
    pub trade_volume: Decimal,
    pub trade_volume_usd: Decimal,
    pub untracked_volume_usd: Decimal,
    pub tx_count: u64,
}

impl Token {
    pub fn new(address: Address, symbol: String, name: String, decimals: u8) -> Self {
        Self {
            address,
            symbol,
            name,
            decimals,
            derived_reference_price: Decimal::ZERO,
            total_liquidity: Decimal::ZERO,
            trade_volume: Decimal::ZERO,
            trade_volume_usd: Decimal::ZERO,
            untracked_volume_usd: Decimal::ZERO,
            tx_count: 0,
        }
    }
}

/// A two-token trading pair.
///
/// Spot prices follow the reserve convention `token0_price = reserve0 /
/// reserve1` and `token1_price = reserve1 / reserve0` (both zero when the
/// opposite reserve is empty), so `token0_price * token1_price ≈ 1` whenever
/// both reserves are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    /// LP-share supply.
    pub total_supply: Decimal,
    /// Total pair liquidity denominated in the reference currency.
    pub reserve_reference: Decimal,
    /// The whitelist-tracked share of `reserve_reference`. Kept on the pair so
    /// exchange-wide liquidity can be rebalanced incrementally on each sync.
    pub tracked_reserve_reference: Decimal,
    pub reserve_usd: Decimal,
    pub token0_price: Decimal,
    pub token1_price: Decimal,
    pub volume_token0: Decimal,
    pub volume_token1: Decimal,
    pub volume_usd: Decimal,
    pub untracked_volume_usd: Decimal,
    pub tx_count: u64,
    pub liquidity_provider_count: u64,
    pub created_at_timestamp: u64,
}

impl Pair {
    pub fn new(address: Address, token0: Address, token1: Address, created_at_timestamp: u64) -> Self {
        Self {
            address,
            token0,
            token1,
            reserve0: Decimal::ZERO,
            reserve1: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            reserve_reference: Decimal::ZERO,
            tracked_reserve_reference: Decimal::ZERO,
            reserve_usd: Decimal::ZERO,
            token0_price: Decimal::ZERO,
            token1_price: Decimal::ZERO,
            volume_token0: Decimal::ZERO,
            volume_token1: Decimal::ZERO,
            volume_usd: Decimal::ZERO,
            untracked_volume_usd: Decimal::ZERO,
            tx_count: 0,
            liquidity_provider_count: 0,
            created_at_timestamp,
        }
    }

    /// Which side of the pair `token` occupies, if any.
    pub fn side_of(&self, token: Address) -> Option<PairSide> {
        if self.token0 == token {
            Some(PairSide::Token0)
        } else if self.token1 == token {
            Some(PairSide::Token1)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    Token0,
    Token1,
}

/// Singleton holding the only piece of global pricing state: the reference
/// currency's USD price.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    pub reference_price_usd: Decimal,
}

/// Singleton exchange-wide (factory) aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub address: Address,
    pub pair_count: u32,
    pub total_volume_usd: Decimal,
    pub total_volume_reference: Decimal,
    pub untracked_volume_usd: Decimal,
    pub total_liquidity_usd: Decimal,
    pub total_liquidity_reference: Decimal,
    pub tx_count: u64,
}

impl Exchange {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pair_count: 0,
            total_volume_usd: Decimal::ZERO,
            total_volume_reference: Decimal::ZERO,
            untracked_volume_usd: Decimal::ZERO,
            total_liquidity_usd: Decimal::ZERO,
            total_liquidity_reference: Decimal::ZERO,
            tx_count: 0,
        }
    }
}

/// A wallet that has interacted with the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub address: Address,
    pub usd_swapped: Decimal,
}

impl User {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            usd_swapped: Decimal::ZERO,
        }
    }
}

/// Marker that `user` holds (or has held) LP shares of `pair`. First-time
/// creation is what increments the pair's `liquidity_provider_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub id: String,
    pub pair: Address,
    pub user: Address,
}

impl LiquidityPosition {
    pub fn id_for(pair: Address, user: Address) -> String {
        format!("{pair:#x}-{user:#x}")
    }

    pub fn new(pair: Address, user: Address) -> Self {
        Self {
            id: Self::id_for(pair, user),
            pair,
            user,
        }
    }
}

//================================================================================================//
//                                     Snapshot records                                           //
//================================================================================================//

/// Exchange-wide daily snapshot, keyed by day index alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeDayData {
    pub id: String,
    /// Bucket start timestamp (inclusive).
    pub date: u64,
    pub daily_volume_usd: Decimal,
    pub daily_volume_reference: Decimal,
    pub daily_volume_untracked: Decimal,
    pub total_volume_usd: Decimal,
    pub total_volume_reference: Decimal,
    pub total_liquidity_usd: Decimal,
    pub total_liquidity_reference: Decimal,
    pub tx_count: u64,
}

/// Per-pair daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDayData {
    pub id: String,
    pub date: u64,
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    pub total_supply: Decimal,
    pub reserve_usd: Decimal,
    pub daily_volume_token0: Decimal,
    pub daily_volume_token1: Decimal,
    pub daily_volume_usd: Decimal,
    pub daily_txns: u64,
}

/// Per-pair hourly snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairHourData {
    pub id: String,
    pub hour_start_unix: u64,
    pub pair_address: Address,
    pub reserve0: Decimal,
    pub reserve1: Decimal,
    pub total_supply: Decimal,
    pub reserve_usd: Decimal,
    pub hourly_volume_token0: Decimal,
    pub hourly_volume_token1: Decimal,
    pub hourly_volume_usd: Decimal,
    pub hourly_txns: u64,
}

/// Per-token daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDayData {
    pub id: String,
    pub date: u64,
    pub token_address: Address,
    pub price_usd: Decimal,
    pub daily_volume_token: Decimal,
    pub daily_volume_reference: Decimal,
    pub daily_volume_usd: Decimal,
    pub daily_txns: u64,
    pub total_liquidity_token: Decimal,
    pub total_liquidity_reference: Decimal,
    pub total_liquidity_usd: Decimal,
}
