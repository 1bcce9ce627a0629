//! # dexmetrics
//!
//! Economic metrics engine for two-token AMM exchanges: derives
//! USD-denominated token prices by whitelist graph traversal, attributes
//! tracked trade volume and liquidity, and maintains day/hour bucketed
//! snapshot rollups — all as synchronous, strictly event-ordered pure
//! functions over an injected entity store and pair registry.
//!
//! The surrounding chain-sync, log decoding and durable storage live in the
//! embedding application; this crate starts at typed events and ends at
//! upserted entities.

pub mod amounts;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod pair_graph;
pub mod pricing;
pub mod rollups;
pub mod store;
pub mod types;

pub use config::{PricingConfig, NEW_PAIR_LP_THRESHOLD};
pub use errors::{AmountError, EntityKind, EventError, PriceError, RollupError, StoreError};
pub use handlers::{BurnEvent, MetricsEngine, MintEvent, SwapEvent, SyncEvent};
pub use pair_graph::{PairGraph, StaticPairGraph};
pub use pricing::{PriceOracle, ReferencePriceFeed, VolumeAttributor};
pub use store::{EntityStore, InMemoryEntityStore};
pub use types::{Bundle, Exchange, Pair, Token};
