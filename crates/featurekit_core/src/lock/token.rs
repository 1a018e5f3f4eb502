//! Lock authorization tokens.
//!
//! A token is `name + "_" + hex(number)` where `number` mixes a process-wide
//! counter, the expiry time and the bit-reversed current time:
//!
//! ```text
//! number = counter ^ (now_ms + duration_ms)
//! number = number ^ reverse_bits(now_ms)
//! ```
//!
//! The counter makes tokens distinct within a process even when the clock
//! does not move. Tokens are **not** cryptographically secure. They are
//! visibly time-correlated and only suitable for cooperative locking between
//! well-behaved callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Generates a token for a lock named `name` lasting `duration`.
pub fn generate_token(name: &str, duration: Duration) -> String {
    generate_token_at(name, millis(duration), now_ms())
}

/// Generates a token as if the current time were `now_ms`.
pub fn generate_token_at(name: &str, duration_ms: u64, now_ms: u64) -> String {
    let count = COUNTER.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
    let mut number = count ^ now_ms.wrapping_add(duration_ms);
    number ^= now_ms.reverse_bits();
    format!("{name}_{number:x}")
}

/// Resets the process-wide counter. Only meant for deterministic tests.
pub fn reset_counter(seed: u64) {
    COUNTER.store(seed, Ordering::SeqCst);
}
