//! Asset id generation
//!
//! Ids look like `char_1718000000000_7_3fa2`: prefix, unix millis, a
//! process-wide sequence number and a random suffix. The sequence keeps ids
//! distinct when several assets are created in the same millisecond; the
//! suffix keeps two processes sharing a catalog apart.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh id with the given prefix
pub fn next_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let suffix: u16 = rand::random();
    format!("{prefix}_{millis}_{seq}_{suffix:04x}")
}
