// src/store.rs

//! Entity persistence seam.
//!
//! The engine holds no state of its own between events; everything it reads
//! and writes goes through [`EntityStore`]. Loads return `Ok(None)` for
//! absent entities — whether an absence is fatal is decided by the caller,
//! per the fatal/recoverable split in [`crate::errors`]. Each save is an
//! idempotent whole-entity upsert.

use ethers::types::Address;
use std::collections::HashMap;

use crate::errors::StoreError;
use crate::types::{
    Bundle, Exchange, ExchangeDayData, LiquidityPosition, Pair, PairDayData, PairHourData, Token,
    TokenDayData, User,
};

/// Key-value persistence for entities and snapshot records.
pub trait EntityStore {
    fn token(&self, address: Address) -> Result<Option<Token>, StoreError>;
    fn save_token(&mut self, token: Token) -> Result<(), StoreError>;

    fn pair(&self, address: Address) -> Result<Option<Pair>, StoreError>;
    fn save_pair(&mut self, pair: Pair) -> Result<(), StoreError>;

    fn bundle(&self) -> Result<Option<Bundle>, StoreError>;
    fn save_bundle(&mut self, bundle: Bundle) -> Result<(), StoreError>;

    fn exchange(&self) -> Result<Option<Exchange>, StoreError>;
    fn save_exchange(&mut self, exchange: Exchange) -> Result<(), StoreError>;

    fn user(&self, address: Address) -> Result<Option<User>, StoreError>;
    fn save_user(&mut self, user: User) -> Result<(), StoreError>;

    fn liquidity_position(&self, id: &str) -> Result<Option<LiquidityPosition>, StoreError>;
    fn save_liquidity_position(&mut self, position: LiquidityPosition) -> Result<(), StoreError>;

    fn exchange_day_data(&self, id: &str) -> Result<Option<ExchangeDayData>, StoreError>;
    fn save_exchange_day_data(&mut self, record: ExchangeDayData) -> Result<(), StoreError>;

    fn pair_day_data(&self, id: &str) -> Result<Option<PairDayData>, StoreError>;
    fn save_pair_day_data(&mut self, record: PairDayData) -> Result<(), StoreError>;

    fn pair_hour_data(&self, id: &str) -> Result<Option<PairHourData>, StoreError>;
    fn save_pair_hour_data(&mut self, record: PairHourData) -> Result<(), StoreError>;

    fn token_day_data(&self, id: &str) -> Result<Option<TokenDayData>, StoreError>;
    fn save_token_day_data(&mut self, record: TokenDayData) -> Result<(), StoreError>;
}

/// In-memory [`EntityStore`] for tests and embedders that manage durability
/// themselves.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tokens: HashMap<Address, Token>,
    pairs: HashMap<Address, Pair>,
    bundle: Option<Bundle>,
    exchange: Option<Exchange>,
    users: HashMap<Address, User>,
    liquidity_positions: HashMap<String, LiquidityPosition>,
    exchange_day_data: HashMap<String, ExchangeDayData>,
    pair_day_data: HashMap<String, PairDayData>,
    pair_hour_data: HashMap<String, PairHourData>,
    token_day_data: HashMap<String, TokenDayData>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn token(&self, address: Address) -> Result<Option<Token>, StoreError> {
        Ok(self.tokens.get(&address).cloned())
    }

    fn save_token(&mut self, token: Token) -> Result<(), StoreError> {
        self.tokens.insert(token.address, token);
        Ok(())
    }

    fn pair(&self, address: Address) -> Result<Option<Pair>, StoreError> {
        Ok(self.pairs.get(&address).cloned())
    }

    fn save_pair(&mut self, pair: Pair) -> Result<(), StoreError> {
        self.pairs.insert(pair.address, pair);
        Ok(())
    }

    fn bundle(&self) -> Result<Option<Bundle>, StoreError> {
        Ok(self.bundle.clone())
    }

    fn save_bundle(&mut self, bundle: Bundle) -> Result<(), StoreError> {
        self.bundle = Some(bundle);
        Ok(())
    }

    fn exchange(&self) -> Result<Option<Exchange>, StoreError> {
        Ok(self.exchange.clone())
    }

    fn save_exchange(&mut self, exchange: Exchange) -> Result<(), StoreError> {
        self.exchange = Some(exchange);
        Ok(())
    }

    fn user(&self, address: Address) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&address).cloned())
    }

    fn save_user(&mut self, user: User) -> Result<(), StoreError> {
        self.users.insert(user.address, user);
        Ok(())
    }

    fn liquidity_position(&self, id: &str) -> Result<Option<LiquidityPosition>, StoreError> {
        Ok(self.liquidity_positions.get(id).cloned())
    }

    fn save_liquidity_position(&mut self, position: LiquidityPosition) -> Result<(), StoreError> {
        self.liquidity_positions.insert(position.id.clone(), position);
        Ok(())
    }

    fn exchange_day_data(&self, id: &str) -> Result<Option<ExchangeDayData>, StoreError> {
        Ok(self.exchange_day_data.get(id).cloned())
    }

    fn save_exchange_day_data(&mut self, record: ExchangeDayData) -> Result<(), StoreError> {
        self.exchange_day_data.insert(record.id.clone(), record);
        Ok(())
    }

    fn pair_day_data(&self, id: &str) -> Result<Option<PairDayData>, StoreError> {
        Ok(self.pair_day_data.get(id).cloned())
    }

    fn save_pair_day_data(&mut self, record: PairDayData) -> Result<(), StoreError> {
        self.pair_day_data.insert(record.id.clone(), record);
        Ok(())
    }

    fn pair_hour_data(&self, id: &str) -> Result<Option<PairHourData>, StoreError> {
        Ok(self.pair_hour_data.get(id).cloned())
    }

    fn save_pair_hour_data(&mut self, record: PairHourData) -> Result<(), StoreError> {
        self.pair_hour_data.insert(record.id.clone(), record);
        Ok(())
    }

    fn token_day_data(&self, id: &str) -> Result<Option<TokenDayData>, StoreError> {
        Ok(self.token_day_data.get(id).cloned())
    }

    fn save_token_day_data(&mut self, record: TokenDayData) -> Result<(), StoreError> {
        self.token_day_data.insert(record.id.clone(), record);
        Ok(())
    }
}
