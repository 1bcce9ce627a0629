//! # Centralized Error Handling
//!
//! Typed, hierarchical errors for the metrics engine. Each subsystem owns its
//! error enum; `EventError` is the per-event top level that the delivery layer
//! sees. The taxonomy encodes the fatal/recoverable split: entities that are
//! assumed to exist (the pair being updated, the bundle, the exchange
//! aggregate) surface as `MissingEntity` and abort the event, while entities
//! looked up opportunistically during a price search are plain `Ok(None)`
//! skips and never reach this module.

use thiserror::Error;

/// Entity kinds as named in `MissingEntity` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Token,
    Pair,
    Bundle,
    Exchange,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Token => "token",
            EntityKind::Pair => "pair",
            EntityKind::Bundle => "bundle",
            EntityKind::Exchange => "exchange",
        };
        f.write_str(name)
    }
}

/// Failures of the persistence backend itself.
///
/// The bundled in-memory store never produces these; trait implementations
/// backed by a real database map their transport errors here.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Raw on-chain amount could not be represented exactly.
#[derive(Error, Debug)]
pub enum AmountError {
    #[error("amount {amount} with {decimals} decimals exceeds exact decimal range")]
    Overflow { amount: String, decimals: u8 },
}

/// Errors from the price oracle and reference price feed.
///
/// An unpriceable token is NOT an error: the oracle returns zero as a valid
/// "no confidence price yet" sentinel.
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the bucketed rollup upserts.
#[derive(Error, Debug)]
pub enum RollupError {
    #[error("required {kind} {id} missing from store")]
    MissingEntity { kind: EntityKind, id: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Top-level per-event error. One of these aborts processing of the event;
/// retry/skip policy belongs to the delivery layer.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("required {kind} {id} missing from store")]
    MissingEntity { kind: EntityKind, id: String },
    #[error("amount conversion failed: {0}")]
    Amount(#[from] AmountError),
    #[error("pricing failed: {0}")]
    Price(#[from] PriceError),
    #[error("rollup update failed: {0}")]
    Rollup(#[from] RollupError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
