// src/handlers.rs

//! Per-event entry points.
//!
//! The delivery layer decodes raw logs into the typed events below and feeds
//! them to [`MetricsEngine`] in canonical chain order. Each handler runs the
//! same shape to completion: load current entity state, compute derived
//! figures, upsert entities and snapshots. Handlers never hold state across
//! events, so replaying a handler against identical store state reproduces
//! identical non-counter output.

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::amounts::convert_token_to_decimal;
use crate::config::PricingConfig;
use crate::errors::{EntityKind, EventError};
use crate::pair_graph::PairGraph;
use crate::pricing::{spot_prices, PriceOracle, ReferencePriceFeed, VolumeAttributor};
use crate::rollups::{
    update_exchange_day_data, update_pair_day_data, update_pair_hour_data, update_token_day_data,
};
use crate::store::EntityStore;
use crate::types::{Bundle, Exchange, LiquidityPosition, Pair, Token, User};

/// LP shares use the standard 18-decimal scale regardless of the underlying
/// tokens.
pub const LP_SHARE_DECIMALS: u8 = 18;

/// Reserve update emitted after every state-changing pair interaction.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub pair: Address,
    pub timestamp: u64,
    pub reserve0: U256,
    pub reserve1: U256,
}

/// A trade against a pair. Per-side totals are `in + out`; exactly one of the
/// two is zero for each side in a normal swap.
#[derive(Debug, Clone)]
pub struct SwapEvent {
    pub pair: Address,
    pub timestamp: u64,
    /// The account the trade is attributed to.
    pub sender: Address,
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
}

/// Liquidity added to a pair.
#[derive(Debug, Clone)]
pub struct MintEvent {
    pub pair: Address,
    pub timestamp: u64,
    pub provider: Address,
    pub amount0: U256,
    pub amount1: U256,
    /// LP shares issued for the deposit.
    pub liquidity: U256,
}

/// Liquidity removed from a pair.
#[derive(Debug, Clone)]
pub struct BurnEvent {
    pub pair: Address,
    pub timestamp: u64,
    pub amount0: U256,
    pub amount1: U256,
    /// LP shares destroyed by the withdrawal.
    pub liquidity: U256,
}

/// Synchronous event processor over an injected store and pair registry.
///
/// All handlers follow the single-writer model: one event is processed to
/// completion before the next begins, so read-modify-write sequences need no
/// locking.
pub struct MetricsEngine<S, G> {
    store: S,
    graph: G,
    oracle: PriceOracle,
    feed: ReferencePriceFeed,
    attributor: VolumeAttributor,
}

impl<S: EntityStore, G: PairGraph> MetricsEngine<S, G> {
    pub fn new(config: Arc<PricingConfig>, store: S, graph: G) -> Self {
        Self {
            store,
            graph,
            oracle: PriceOracle::new(config.clone()),
            feed: ReferencePriceFeed::new(config.clone()),
            attributor: VolumeAttributor::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// Create the exchange aggregate and bundle singletons if this is a fresh
    /// store. Idempotent.
    pub fn initialize(&mut self, factory: Address) -> Result<(), EventError> {
        if self.store.exchange()?.is_none() {
            debug!(target: "handlers", factory = ?factory, "creating exchange aggregate");
            self.store.save_exchange(Exchange::new(factory))?;
        }
        if self.store.bundle()?.is_none() {
            self.store.save_bundle(Bundle::default())?;
        }
        Ok(())
    }

    /// Register a newly created pair and its tokens. The injected
    /// [`PairGraph`] is maintained by the embedder; this only covers entity
    /// state.
    pub fn register_pair(
        &mut self,
        pair: Pair,
        token0: Token,
        token1: Token,
    ) -> Result<(), EventError> {
        let mut exchange = self.require_exchange()?;
        exchange.pair_count += 1;
        if self.store.token(token0.address)?.is_none() {
            self.store.save_token(token0)?;
        }
        if self.store.token(token1.address)?.is_none() {
            self.store.save_token(token1)?;
        }
        self.store.save_pair(pair)?;
        self.store.save_exchange(exchange)?;
        Ok(())
    }

    /// Reserve update: recompute spot prices, the reference USD price, both
    /// tokens' derived prices and all liquidity aggregates.
    pub fn handle_sync(&mut self, event: &SyncEvent) -> Result<(), EventError> {
        let mut pair = self.require_pair(event.pair)?;
        let mut token0 = self.require_token(pair.token0)?;
        let mut token1 = self.require_token(pair.token1)?;
        let mut exchange = self.require_exchange()?;

        // Retire this pair's previous contribution before recomputing it.
        exchange.total_liquidity_reference -= pair.tracked_reserve_reference;
        token0.total_liquidity -= pair.reserve0;
        token1.total_liquidity -= pair.reserve1;

        pair.reserve0 = convert_token_to_decimal(event.reserve0, token0.decimals)?;
        pair.reserve1 = convert_token_to_decimal(event.reserve1, token1.decimals)?;
        let (price0, price1) = spot_prices(pair.reserve0, pair.reserve1);
        pair.token0_price = price0;
        pair.token1_price = price1;
        // The reference feed and the oracle read pairs from the store, and
        // one of them may be this very pair: persist the new reserves first.
        self.store.save_pair(pair.clone())?;

        let mut bundle = self.require_bundle()?;
        bundle.reference_price_usd = self.feed.reference_price_usd(&self.store)?;
        self.store.save_bundle(bundle.clone())?;

        token0.derived_reference_price =
            self.oracle
                .derived_reference_price(&token0, &self.store, &self.graph)?;
        token1.derived_reference_price =
            self.oracle
                .derived_reference_price(&token1, &self.store, &self.graph)?;
        self.store.save_token(token0.clone())?;
        self.store.save_token(token1.clone())?;

        let tracked_liquidity_reference = if bundle.reference_price_usd.is_zero() {
            Decimal::ZERO
        } else {
            self.attributor.tracked_liquidity_usd(
                pair.reserve0,
                &token0,
                pair.reserve1,
                &token1,
                &bundle,
            ) / bundle.reference_price_usd
        };

        pair.tracked_reserve_reference = tracked_liquidity_reference;
        pair.reserve_reference = pair.reserve0 * token0.derived_reference_price
            + pair.reserve1 * token1.derived_reference_price;
        pair.reserve_usd = pair.reserve_reference * bundle.reference_price_usd;

        exchange.total_liquidity_reference += tracked_liquidity_reference;
        exchange.total_liquidity_usd =
            exchange.total_liquidity_reference * bundle.reference_price_usd;

        token0.total_liquidity += pair.reserve0;
        token1.total_liquidity += pair.reserve1;

        self.store.save_pair(pair)?;
        self.store.save_exchange(exchange)?;
        self.store.save_token(token0)?;
        self.store.save_token(token1)?;
        Ok(())
    }

    /// Trade: attribute tracked/untracked volume, then roll up all four
    /// snapshot granularities.
    pub fn handle_swap(&mut self, event: &SwapEvent) -> Result<(), EventError> {
        let mut pair = self.require_pair(event.pair)?;
        let mut token0 = self.require_token(pair.token0)?;
        let mut token1 = self.require_token(pair.token1)?;
        let bundle = self.require_bundle()?;
        let mut exchange = self.require_exchange()?;

        let amount0_in = convert_token_to_decimal(event.amount0_in, token0.decimals)?;
        let amount1_in = convert_token_to_decimal(event.amount1_in, token1.decimals)?;
        let amount0_out = convert_token_to_decimal(event.amount0_out, token0.decimals)?;
        let amount1_out = convert_token_to_decimal(event.amount1_out, token1.decimals)?;
        let amount0_total = amount0_in + amount0_out;
        let amount1_total = amount1_in + amount1_out;

        // Untracked accounting values the trade at the mid of both derived
        // sides, with no whitelist confidence applied.
        let derived_amount_reference = (token1.derived_reference_price * amount1_total
            + token0.derived_reference_price * amount0_total)
            / Decimal::TWO;
        let derived_amount_usd = derived_amount_reference * bundle.reference_price_usd;

        let tracked_amount_usd = self.attributor.tracked_volume_usd(
            amount0_total,
            &token0,
            amount1_total,
            &token1,
            &pair,
            &bundle,
        );
        let tracked_amount_reference = if bundle.reference_price_usd.is_zero() {
            Decimal::ZERO
        } else {
            tracked_amount_usd / bundle.reference_price_usd
        };

        token0.trade_volume += amount0_total;
        token0.trade_volume_usd += tracked_amount_usd;
        token0.untracked_volume_usd += derived_amount_usd;
        token0.tx_count += 1;

        token1.trade_volume += amount1_total;
        token1.trade_volume_usd += tracked_amount_usd;
        token1.untracked_volume_usd += derived_amount_usd;
        token1.tx_count += 1;

        pair.volume_usd += tracked_amount_usd;
        pair.volume_token0 += amount0_total;
        pair.volume_token1 += amount1_total;
        pair.untracked_volume_usd += derived_amount_usd;
        pair.tx_count += 1;

        exchange.total_volume_usd += tracked_amount_usd;
        exchange.total_volume_reference += tracked_amount_reference;
        exchange.untracked_volume_usd += derived_amount_usd;
        exchange.tx_count += 1;

        self.store.save_pair(pair)?;
        self.store.save_token(token0.clone())?;
        self.store.save_token(token1.clone())?;
        self.store.save_exchange(exchange)?;

        let mut user = match self.store.user(event.sender)? {
            Some(user) => user,
            None => User::new(event.sender),
        };
        user.usd_swapped += tracked_amount_usd;
        self.store.save_user(user)?;

        let mut exchange_day = update_exchange_day_data(&mut self.store, event.timestamp)?;
        exchange_day.daily_volume_usd += tracked_amount_usd;
        exchange_day.daily_volume_reference += tracked_amount_reference;
        exchange_day.daily_volume_untracked += derived_amount_usd;
        self.store.save_exchange_day_data(exchange_day)?;

        let mut pair_day = update_pair_day_data(&mut self.store, event.pair, event.timestamp)?;
        pair_day.daily_volume_token0 += amount0_total;
        pair_day.daily_volume_token1 += amount1_total;
        pair_day.daily_volume_usd += tracked_amount_usd;
        self.store.save_pair_day_data(pair_day)?;

        let mut pair_hour = update_pair_hour_data(&mut self.store, event.pair, event.timestamp)?;
        pair_hour.hourly_volume_token0 += amount0_total;
        pair_hour.hourly_volume_token1 += amount1_total;
        pair_hour.hourly_volume_usd += tracked_amount_usd;
        self.store.save_pair_hour_data(pair_hour)?;

        let mut token0_day = update_token_day_data(&mut self.store, &token0, event.timestamp)?;
        token0_day.daily_volume_token += amount0_total;
        token0_day.daily_volume_reference += amount0_total * token0.derived_reference_price;
        token0_day.daily_volume_usd +=
            amount0_total * token0.derived_reference_price * bundle.reference_price_usd;
        self.store.save_token_day_data(token0_day)?;

        let mut token1_day = update_token_day_data(&mut self.store, &token1, event.timestamp)?;
        token1_day.daily_volume_token += amount1_total;
        token1_day.daily_volume_reference += amount1_total * token1.derived_reference_price;
        token1_day.daily_volume_usd +=
            amount1_total * token1.derived_reference_price * bundle.reference_price_usd;
        self.store.save_token_day_data(token1_day)?;

        Ok(())
    }

    /// Liquidity deposit: LP supply up, provider registration, counters,
    /// rollups.
    pub fn handle_mint(&mut self, event: &MintEvent) -> Result<(), EventError> {
        let mut pair = self.require_pair(event.pair)?;
        let mut token0 = self.require_token(pair.token0)?;
        let mut token1 = self.require_token(pair.token1)?;
        let mut exchange = self.require_exchange()?;

        pair.total_supply += convert_token_to_decimal(event.liquidity, LP_SHARE_DECIMALS)?;
        self.register_liquidity_provider(&mut pair, event.provider)?;

        token0.tx_count += 1;
        token1.tx_count += 1;
        pair.tx_count += 1;
        exchange.tx_count += 1;

        self.store.save_pair(pair)?;
        self.store.save_token(token0.clone())?;
        self.store.save_token(token1.clone())?;
        self.store.save_exchange(exchange)?;

        self.roll_up_pair_event(event.pair, &token0, &token1, event.timestamp)
    }

    /// Liquidity withdrawal: LP supply down, counters, rollups.
    pub fn handle_burn(&mut self, event: &BurnEvent) -> Result<(), EventError> {
        let mut pair = self.require_pair(event.pair)?;
        let mut token0 = self.require_token(pair.token0)?;
        let mut token1 = self.require_token(pair.token1)?;
        let mut exchange = self.require_exchange()?;

        pair.total_supply -= convert_token_to_decimal(event.liquidity, LP_SHARE_DECIMALS)?;

        token0.tx_count += 1;
        token1.tx_count += 1;
        pair.tx_count += 1;
        exchange.tx_count += 1;

        self.store.save_pair(pair)?;
        self.store.save_token(token0.clone())?;
        self.store.save_token(token1.clone())?;
        self.store.save_exchange(exchange)?;

        self.roll_up_pair_event(event.pair, &token0, &token1, event.timestamp)
    }

    fn roll_up_pair_event(
        &mut self,
        pair: Address,
        token0: &Token,
        token1: &Token,
        timestamp: u64,
    ) -> Result<(), EventError> {
        update_exchange_day_data(&mut self.store, timestamp)?;
        update_pair_day_data(&mut self.store, pair, timestamp)?;
        update_pair_hour_data(&mut self.store, pair, timestamp)?;
        update_token_day_data(&mut self.store, token0, timestamp)?;
        update_token_day_data(&mut self.store, token1, timestamp)?;
        Ok(())
    }

    /// First LP deposit from a wallet into a pair bumps the pair's provider
    /// count; later deposits from the same wallet do not.
    fn register_liquidity_provider(
        &mut self,
        pair: &mut Pair,
        provider: Address,
    ) -> Result<(), EventError> {
        if self.store.user(provider)?.is_none() {
            self.store.save_user(User::new(provider))?;
        }
        let id = LiquidityPosition::id_for(pair.address, provider);
        if self.store.liquidity_position(&id)?.is_none() {
            self.store
                .save_liquidity_position(LiquidityPosition::new(pair.address, provider))?;
            pair.liquidity_provider_count += 1;
            debug!(
                target: "handlers",
                pair = ?pair.address,
                providers = pair.liquidity_provider_count,
                "new liquidity provider"
            );
        }
        Ok(())
    }

    fn require_pair(&self, address: Address) -> Result<Pair, EventError> {
        self.store
            .pair(address)?
            .ok_or_else(|| EventError::MissingEntity {
                kind: EntityKind::Pair,
                id: format!("{address:#x}"),
            })
    }

    fn require_token(&self, address: Address) -> Result<Token, EventError> {
        self.store
            .token(address)?
            .ok_or_else(|| EventError::MissingEntity {
                kind: EntityKind::Token,
                id: format!("{address:#x}"),
            })
    }

    fn require_bundle(&self) -> Result<Bundle, EventError> {
        self.store.bundle()?.ok_or_else(|| EventError::MissingEntity {
            kind: EntityKind::Bundle,
            id: "singleton".into(),
        })
    }

    fn require_exchange(&self) -> Result<Exchange, EventError> {
        self.store.exchange()?.ok_or_else(|| EventError::MissingEntity {
            kind: EntityKind::Exchange,
            id: "singleton".into(),
        })
    }
}
