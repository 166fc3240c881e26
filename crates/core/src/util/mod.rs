pub mod retry;
pub mod ring_buffer;
pub(crate) mod sync;
pub mod ticker;

pub use retry::{retry_with_backoff, RetryConfig};
pub use ring_buffer::RingBuffer;
pub use ticker::{run_periodic, spawn_periodic, TickerHandle};

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch, as stored in timelines.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
