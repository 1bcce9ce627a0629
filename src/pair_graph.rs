// src/pair_graph.rs

//! Read access to the factory's pair registry.
//!
//! On chain this is the factory contract's `getPair` view; here it is an
//! injected trait so the price oracle can be exercised deterministically
//! without a live connection. Lookups are order-insensitive, matching the
//! factory's symmetric mapping.

use ethers::types::Address;
use std::collections::HashMap;

/// Trading-pair registry keyed by unordered token pairs.
pub trait PairGraph {
    /// The pair contract trading `token_a` against `token_b`, if the factory
    /// has created one. `None` is the equivalent of the factory returning the
    /// zero address.
    fn pair_for(&self, token_a: Address, token_b: Address) -> Option<Address>;

    /// Number of pairs known to the registry.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`PairGraph`] populated by the embedder as pairs are indexed.
#[derive(Debug, Default)]
pub struct StaticPairGraph {
    pairs: HashMap<(Address, Address), Address>,
}

impl StaticPairGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair under its unordered token key.
    pub fn insert(&mut self, token_a: Address, token_b: Address, pair: Address) {
        self.pairs.insert(Self::key(token_a, token_b), pair);
    }

    fn key(token_a: Address, token_b: Address) -> (Address, Address) {
        if token_a <= token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        }
    }
}

impl PairGraph for StaticPairGraph {
    fn pair_for(&self, token_a: Address, token_b: Address) -> Option<Address> {
        self.pairs.get(&Self::key(token_a, token_b)).copied()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address(val: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = val;
        Address::from(bytes)
    }

    #[test]
    fn lookup_is_order_insensitive() {
        let mut graph = StaticPairGraph::new();
        let (a, b, pair) = (sample_address(1), sample_address(2), sample_address(10));
        graph.insert(a, b, pair);

        assert_eq!(graph.pair_for(a, b), Some(pair));
        assert_eq!(graph.pair_for(b, a), Some(pair));
        assert_eq!(graph.pair_for(a, sample_address(3)), None);
        assert_eq!(graph.len(), 1);
    }
}
