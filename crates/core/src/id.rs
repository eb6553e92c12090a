// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Hash-based issue id generation.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

/// Shortest supported id suffix.
pub const MIN_ID_LENGTH: usize = 3;

/// Longest supported id suffix (36^12 still fits in the 64 hashed bits).
pub const MAX_ID_LENGTH: usize = 12;

/// Attempts made by [`generate_unique_id`] before giving up.
const MAX_ATTEMPTS: u32 = 64;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static NONCE: AtomicU64 = AtomicU64::new(0);

/// Returns a value that differs on every call within this process.
///
/// Mixed into the hash so ids stay distinct even when the clock does not
/// advance between two calls.
pub fn next_nonce() -> u64 {
    let counter = NONCE.fetch_add(1, Ordering::Relaxed);
    (u64::from(std::process::id()) << 32) ^ counter
}

/// Generate an issue ID from prefix, title, description, and creation time.
///
/// Format: `{prefix}-{suffix}` where suffix is `length` base-36 characters
/// taken from SHA256(title | description | nanos | nonce).
pub fn generate_id(
    prefix: &str,
    title: &str,
    description: &str,
    created_at: &DateTime<Utc>,
    nonce: u64,
    length: usize,
) -> String {
    let nanos = created_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| created_at.timestamp_micros().saturating_mul(1000));
    let input = format!("{title}|{description}|{nanos}|{nonce}");
    let hash = Sha256::digest(input.as_bytes());

    let mut head = [0u8; 8];
    head.copy_from_slice(&hash[..8]);
    let suffix = encode_base36(u64::from_be_bytes(head), length);
    format!("{prefix}-{suffix}")
}

/// Generate an ID that `exists` reports as unused, drawing a fresh nonce on
/// each collision.
pub fn generate_unique_id<F>(
    prefix: &str,
    title: &str,
    description: &str,
    created_at: &DateTime<Utc>,
    length: usize,
    mut exists: F,
) -> Result<String>
where
    F: FnMut(&str) -> Result<bool>,
{
    for _ in 0..MAX_ATTEMPTS {
        let id = generate_id(prefix, title, description, created_at, next_nonce(), length);
        if !exists(&id)? {
            return Ok(id);
        }
    }
    Err(Error::Validation(format!(
        "no free id after {MAX_ATTEMPTS} attempts with prefix '{prefix}' and length {length}"
    )))
}

/// Encode the low-order base-36 digits of `value`, zero padded to `length`.
fn encode_base36(mut value: u64, length: usize) -> String {
    let mut digits = vec!['0'; length];
    for slot in digits.iter_mut().rev() {
        *slot = char::from(BASE36_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.into_iter().collect()
}

/// Validate that a prefix is valid (2+ lowercase alphanumeric with at least one letter)
pub fn validate_prefix(prefix: &str) -> bool {
    prefix.len() >= 2
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && prefix.chars().any(|c| c.is_ascii_lowercase())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
