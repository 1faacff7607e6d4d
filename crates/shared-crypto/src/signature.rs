//! # Token Signatures
//!
//! SHA-1 fingerprint over an unordered set of tokens.
//!
//! The tokens are sorted lexicographically as opaque strings, concatenated
//! without a separator and hashed. Timestamps and nonces are therefore
//! compared as text: `"10"` sorts before `"9"`.

use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;

/// Compute the lowercase hex SHA-1 signature of a token set.
///
/// Order of `parts` does not matter.
pub fn signature(parts: &[&str]) -> String {
    let mut sorted = parts.to_vec();
    sorted.sort_unstable();

    let mut hasher = Sha1::new();
    for part in &sorted {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Check a caller-supplied signature against the token set.
///
/// Missing tokens are not an error here: they simply produce a signature
/// that will not match.
pub fn verify_signature(candidate: &str, parts: &[&str]) -> bool {
    constant_time_compare(candidate, &signature(parts))
}

/// Constant-time string comparison.
///
/// Takes the same time regardless of how many leading bytes match. Strings of
/// different length never compare equal.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let max_len = std::cmp::max(a.len(), b.len());

    // Different pad bytes so a length mismatch can never collapse into equality
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}
