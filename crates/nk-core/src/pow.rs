//! Proof-of-work evaluation.
//!
//! An identifier's difficulty is the count of leading zero bits across its
//! hex-decoded byte sequence. Difficulty is measured, never trusted: the
//! commitment tag's claimed target is parsed only for diagnostics, while
//! admission compares the measured difficulty against the configured
//! minimum.

use std::fmt;

use crate::item::Item;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowError {
    /// The commitment tag is absent, or its claimed target is malformed.
    MissingCommitment,
}

impl fmt::Display for PowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowError::MissingCommitment => write!(f, "missing or malformed commitment tag"),
        }
    }
}

impl std::error::Error for PowError {}

/// Count the leading zero bits of a hex-encoded identifier.
///
/// Whole leading zero bytes contribute 8 bits each; the first nonzero byte
/// contributes its own leading zeros. Empty or malformed identifiers yield
/// 0 — this is a total function, it never fails.
pub fn difficulty_of(id: &str) -> u32 {
    let bytes = match decode_hex(id) {
        Some(b) => b,
        None => return 0,
    };

    let mut count = 0u32;
    for b in bytes {
        if b == 0 {
            count += 8;
            continue;
        }
        count += b.leading_zeros();
        break;
    }
    count
}

/// Whether an item qualifies for admission at `min_difficulty`.
///
/// Requires both the commitment tag and a measured difficulty at or above
/// the minimum. An identifier that happens to satisfy the bit count without
/// a commitment does not qualify.
pub fn is_admissible(item: &Item, min_difficulty: u32) -> bool {
    item.has_commitment() && difficulty_of(&item.id) >= min_difficulty
}

/// Parse the claimed target difficulty from the commitment tag.
/// Diagnostics only — admission uses the measured difficulty.
pub fn claimed_target(item: &Item) -> Result<u32, PowError> {
    item.commitment_target()
        .ok_or(PowError::MissingCommitment)?
        .parse()
        .map_err(|_| PowError::MissingCommitment)
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = hex_val(pair[0])?;
            let lo = hex_val(pair[1])?;
            Some(hi << 4 | lo)
        })
        .collect()
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
