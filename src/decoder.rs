// src/decoder.rs

use ethers::types::U256;

/// Maximum number of significant hex digits in an EVM word (256 bits).
pub const MAX_WORD_HEX_DIGITS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("empty hex string")]
    Empty,
    #[error("invalid hex character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("value has {0} significant hex digits, exceeds a 256-bit word")]
    Overflow(usize),
}

/// Decodes the hex quantity returned by `eth_call` into an `f64`.
///
/// Accepts an optional `0x`/`0X` prefix and any number of leading zeros. The word is
/// parsed as a `U256` and rounded once to the nearest `f64`; values above 2^53 lose
/// precision, which is fine for a gauge. Malformed input is an error, never 0.
pub fn hex_to_f64(raw: &str) -> Result<f64, DecodeError> {
    let digits = strip_hex_prefix(raw.trim());
    if digits.is_empty() {
        return Err(DecodeError::Empty);
    }
    if let Some((position, character)) = digits.chars().enumerate().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidCharacter { character, position });
    }

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(0.0);
    }
    if significant.len() > MAX_WORD_HEX_DIGITS {
        return Err(DecodeError::Overflow(significant.len()));
    }

    let value = U256::from_str_radix(significant, 16)
        .map_err(|_| DecodeError::Overflow(significant.len()))?;
    u256_to_f64(value).ok_or(DecodeError::Overflow(significant.len()))
}

// Goes through the decimal representation so the result is correctly rounded.
fn u256_to_f64(value: U256) -> Option<f64> {
    value.to_string().parse::<f64>().ok()
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
