// src/rollups.rs

//! # Time-Bucket Rollup Aggregator
//!
//! Idempotent upserts of day/hour snapshot records at exchange-wide,
//! per-pair and per-token granularity. All four operations follow one
//! template: derive the bucket index from the event timestamp, load or
//! create the record under its composite id, copy the owning entity's
//! current state onto it (last write within a bucket wins), bump the
//! record's event counter by exactly one, persist.
//!
//! Buckets are closed-open `[index * duration, (index + 1) * duration)`.
//! Records are never deleted, and a late-arriving event for a past bucket
//! simply mutates that bucket again — required for ordered backfills.
//!
//! The owning entities (exchange aggregate, pair, bundle) are assumed to be
//! created by upstream handlers before anything rolls up against them;
//! their absence is a hard error rather than a fabricated zero record.

use ethers::types::Address;
use rust_decimal::Decimal;
use tracing::trace;

use crate::errors::{EntityKind, RollupError};
use crate::store::EntityStore;
use crate::types::{ExchangeDayData, PairDayData, PairHourData, Token, TokenDayData};

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_HOUR: u64 = 3_600;

/// Day bucket index for a unix timestamp.
pub fn day_index(timestamp: u64) -> u64 {
    timestamp / SECONDS_PER_DAY
}

/// Hour bucket index for a unix timestamp.
pub fn hour_index(timestamp: u64) -> u64 {
    timestamp / SECONDS_PER_HOUR
}

/// Inclusive start of the day bucket containing `timestamp`.
pub fn day_start(timestamp: u64) -> u64 {
    day_index(timestamp) * SECONDS_PER_DAY
}

/// Inclusive start of the hour bucket containing `timestamp`.
pub fn hour_start(timestamp: u64) -> u64 {
    hour_index(timestamp) * SECONDS_PER_HOUR
}

/// Composite record id for a scoped snapshot.
pub fn scoped_id(scope: Address, bucket_index: u64) -> String {
    format!("{scope:#x}-{bucket_index}")
}

/// Upsert the exchange-wide day snapshot.
pub fn update_exchange_day_data<S: EntityStore + ?Sized>(
    store: &mut S,
    timestamp: u64,
) -> Result<ExchangeDayData, RollupError> {
    let exchange = store
        .exchange()?
        .ok_or_else(|| RollupError::MissingEntity {
            kind: EntityKind::Exchange,
            id: "singleton".into(),
        })?;

    let id = day_index(timestamp).to_string();
    let mut record = match store.exchange_day_data(&id)? {
        Some(record) => record,
        None => {
            trace!(target: "rollups", id = %id, "opening exchange day bucket");
            ExchangeDayData {
                id: id.clone(),
                date: day_start(timestamp),
                daily_volume_usd: Decimal::ZERO,
                daily_volume_reference: Decimal::ZERO,
                daily_volume_untracked: Decimal::ZERO,
                total_volume_usd: Decimal::ZERO,
                total_volume_reference: Decimal::ZERO,
                total_liquidity_usd: Decimal::ZERO,
                total_liquidity_reference: Decimal::ZERO,
                tx_count: 0,
            }
        }
    };

    record.total_volume_usd = exchange.total_volume_usd;
    record.total_volume_reference = exchange.total_volume_reference;
    record.total_liquidity_usd = exchange.total_liquidity_usd;
    record.total_liquidity_reference = exchange.total_liquidity_reference;
    record.tx_count += 1;
    store.save_exchange_day_data(record.clone())?;

    Ok(record)
}

/// Upsert a pair's day snapshot.
pub fn update_pair_day_data<S: EntityStore + ?Sized>(
    store: &mut S,
    pair_address: Address,
    timestamp: u64,
) -> Result<PairDayData, RollupError> {
    let pair = store
        .pair(pair_address)?
        .ok_or_else(|| RollupError::MissingEntity {
            kind: EntityKind::Pair,
            id: format!("{pair_address:#x}"),
        })?;

    let id = scoped_id(pair_address, day_index(timestamp));
    let mut record = match store.pair_day_data(&id)? {
        Some(record) => record,
        None => PairDayData {
            id: id.clone(),
            date: day_start(timestamp),
            pair_address,
            token0: pair.token0,
            token1: pair.token1,
            reserve0: Decimal::ZERO,
            reserve1: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            reserve_usd: Decimal::ZERO,
            daily_volume_token0: Decimal::ZERO,
            daily_volume_token1: Decimal::ZERO,
            daily_volume_usd: Decimal::ZERO,
            daily_txns: 0,
        },
    };

    record.reserve0 = pair.reserve0;
    record.reserve1 = pair.reserve1;
    record.total_supply = pair.total_supply;
    record.reserve_usd = pair.reserve_usd;
    record.daily_txns += 1;
    store.save_pair_day_data(record.clone())?;

    Ok(record)
}

/// Upsert a pair's hour snapshot.
pub fn update_pair_hour_data<S: EntityStore + ?Sized>(
    store: &mut S,
    pair_address: Address,
    timestamp: u64,
) -> Result<PairHourData, RollupError> {
    let pair = store
        .pair(pair_address)?
        .ok_or_else(|| RollupError::MissingEntity {
            kind: EntityKind::Pair,
            id: format!("{pair_address:#x}"),
        })?;

    let id = scoped_id(pair_address, hour_index(timestamp));
    let mut record = match store.pair_hour_data(&id)? {
        Some(record) => record,
        None => PairHourData {
            id: id.clone(),
            hour_start_unix: hour_start(timestamp),
            pair_address,
            reserve0: Decimal::ZERO,
            reserve1: Decimal::ZERO,
            total_supply: Decimal::ZERO,
            reserve_usd: Decimal::ZERO,
            hourly_volume_token0: Decimal::ZERO,
            hourly_volume_token1: Decimal::ZERO,
            hourly_volume_usd: Decimal::ZERO,
            hourly_txns: 0,
        },
    };

    record.reserve0 = pair.reserve0;
    record.reserve1 = pair.reserve1;
    record.total_supply = pair.total_supply;
    record.reserve_usd = pair.reserve_usd;
    record.hourly_txns += 1;
    store.save_pair_hour_data(record.clone())?;

    Ok(record)
}

/// Upsert a token's day snapshot. The caller passes the freshly updated
/// token so the snapshot reflects this event's state, not a stale read.
pub fn update_token_day_data<S: EntityStore + ?Sized>(
    store: &mut S,
    token: &Token,
    timestamp: u64,
) -> Result<TokenDayData, RollupError> {
    let bundle = store
        .bundle()?
        .ok_or_else(|| RollupError::MissingEntity {
            kind: EntityKind::Bundle,
            id: "singleton".into(),
        })?;

    let price_usd = token.derived_reference_price * bundle.reference_price_usd;
    let id = scoped_id(token.address, day_index(timestamp));
    let mut record = match store.token_day_data(&id)? {
        Some(record) => record,
        None => TokenDayData {
            id: id.clone(),
            date: day_start(timestamp),
            token_address: token.address,
            price_usd,
            daily_volume_token: Decimal::ZERO,
            daily_volume_reference: Decimal::ZERO,
            daily_volume_usd: Decimal::ZERO,
            daily_txns: 0,
            total_liquidity_token: Decimal::ZERO,
            total_liquidity_reference: Decimal::ZERO,
            total_liquidity_usd: Decimal::ZERO,
        },
    };

    record.price_usd = price_usd;
    record.total_liquidity_token = token.total_liquidity;
    record.total_liquidity_reference = token.total_liquidity * token.derived_reference_price;
    record.total_liquidity_usd = record.total_liquidity_reference * bundle.reference_price_usd;
    record.daily_txns += 1;
    store.save_token_day_data(record.clone())?;

    Ok(record)
}
