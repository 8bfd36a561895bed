//! Per-request unique names for uploads and frame directories.
//!
//! Names are `<millis>-<counter>-<random>`: the timestamp keeps them roughly
//! sortable, the process-wide counter makes them unique within this process
//! and the random part separates concurrent server processes sharing a disk.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn unique_name() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let salt = rand::random::<u32>();
    format!("{}-{}-{:08x}", millis, seq, salt)
}

/// Unique name with a fixed prefix, e.g. `bhavna_frames_1733500000000-3-9f2c01aa`
pub fn unique_name_with_prefix(prefix: &str) -> String {
    format!("{}_{}", prefix, unique_name())
}
