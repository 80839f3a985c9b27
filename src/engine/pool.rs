// src/engine/pool.rs
//
// Batch scheduling policy for tile rasterization.
//
// Tiles run in fixed-size concurrent batches with a short yield between
// batches. Mobile form factors get batches of one and a frame-length yield
// so the host stays responsive; desktop runs three at a time back to back.
//
// The rasterization itself runs on tokio's blocking pool; the accelerated
// backend additionally parallelizes fills on rayon's global pool.

use crate::engine::config::Capabilities;
use std::time::Duration;

pub const DESKTOP_BATCH_SIZE: usize = 3;
pub const MOBILE_BATCH_SIZE: usize = 1;
pub const MOBILE_YIELD_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchPolicy {
    pub batch_size: usize,
    pub yield_interval: Duration,
}

impl BatchPolicy {
    pub fn for_capabilities(capabilities: Capabilities) -> Self {
        if capabilities.is_mobile() {
            Self {
                batch_size: MOBILE_BATCH_SIZE,
                yield_interval: MOBILE_YIELD_INTERVAL,
            }
        } else {
            Self {
                batch_size: DESKTOP_BATCH_SIZE,
                yield_interval: Duration::ZERO,
            }
        }
    }

    /// Batch size, never zero.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Suspend between batches: a bare scheduler yield when the interval is
    /// zero, a timed sleep otherwise.
    pub async fn pause(&self) {
        if self.yield_interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.yield_interval).await;
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self::for_capabilities(Capabilities::desktop())
    }
}
