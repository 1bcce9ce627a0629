// src/amounts.rs

//! Conversion of raw on-chain integer amounts into exact decimals.
//!
//! Raw amounts arrive as `U256` scaled by the token's decimals. Conversion is
//! exact or it fails: an amount whose integer part would not fit the 96-bit
//! decimal mantissa is rejected rather than rounded, so replays can never
//! diverge silently.

use ethers::types::U256;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use crate::errors::AmountError;

/// The maximum token decimals we convert exactly. ERC-20 metadata allows more,
/// but `Decimal` supports scale up to 28.
pub const MAX_TOKEN_DECIMALS: u8 = 28;

/// Powers of ten up to 10^28 as decimals.
static POWERS_OF_TEN: Lazy<[Decimal; (MAX_TOKEN_DECIMALS + 1) as usize]> = Lazy::new(|| {
    let mut table = [Decimal::ONE; (MAX_TOKEN_DECIMALS + 1) as usize];
    for i in 1..table.len() {
        table[i] = table[i - 1] * Decimal::TEN;
    }
    table
});

/// `10^decimals` as an exact decimal.
pub fn exponent_to_decimal(decimals: u8) -> Decimal {
    let idx = decimals.min(MAX_TOKEN_DECIMALS) as usize;
    POWERS_OF_TEN[idx]
}

/// Convert a raw token amount to its decimal representation, dividing by
/// `10^decimals`. Zero-decimal tokens pass through unscaled.
pub fn convert_token_to_decimal(amount: U256, decimals: u8) -> Result<Decimal, AmountError> {
    let overflow = || AmountError::Overflow {
        amount: amount.to_string(),
        decimals,
    };

    // 96-bit mantissa bound; U256 values beyond it have no exact representation.
    if amount.bits() > 96 {
        return Err(overflow());
    }
    let raw = amount.as_u128() as i128;

    if decimals > MAX_TOKEN_DECIMALS {
        return Err(overflow());
    }
    Decimal::try_from_i128_with_scale(raw, decimals as u32).map_err(|_| overflow())
}
