//! Node-pair feature encoding.
//!
//! Numeric node ids map to their value; anything else maps to a stable
//! SHA-256-derived value so the same id always lands on the same point.

use sha2::{Digest, Sha256};

/// Width of the feature vector produced by [`encode_pair`].
pub const FEATURE_COUNT: usize = 3;

/// Upper bound (exclusive) for hashed encodings.
const HASH_SPACE: u64 = 1_000_000;

/// Encodes one node identifier as a scalar.
pub fn encode_node(id: &str) -> f64 {
    match id.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => hashed(id),
    }
}

fn hashed(id: &str) -> f64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) % HASH_SPACE) as f64
}

/// Feature vector for a (source, target) pair: both encodings and their gap.
pub fn encode_pair(source: &str, target: &str) -> Vec<f64> {
    let s = encode_node(source);
    let t = encode_node(target);
    vec![s, t, (s - t).abs()]
}
