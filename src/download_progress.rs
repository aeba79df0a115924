use std::time::{Duration, Instant};

use crate::app_types::ProgressInfo;

/// Accumulates chunk callbacks from the updater into [`ProgressInfo`] snapshots.
///
/// One tracker covers exactly one download session, so `transferred` never
/// decreases between snapshots.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    started: Instant,
    transferred: u64,
    total: u64,
}

impl ProgressTracker {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
            transferred: 0,
            total: 0,
        }
    }

    pub(crate) fn record(&mut self, chunk_len: usize, content_length: Option<u64>) -> ProgressInfo {
        let elapsed = self.started.elapsed();
        self.record_with_elapsed(chunk_len, content_length, elapsed)
    }

    fn record_with_elapsed(
        &mut self,
        chunk_len: usize,
        content_length: Option<u64>,
        elapsed: Duration,
    ) -> ProgressInfo {
        self.transferred = self.transferred.saturating_add(chunk_len as u64);
        if let Some(length) = content_length {
            self.total = length;
        }

        ProgressInfo {
            bytes_per_second: bytes_per_second(self.transferred, elapsed),
            percent: percent(self.transferred, self.total),
            transferred: self.transferred,
            total: self.total,
        }
    }
}

fn bytes_per_second(transferred: u64, elapsed: Duration) -> u64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= f64::EPSILON {
        return transferred;
    }
    (transferred as f64 / seconds) as u64
}

fn percent(transferred: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (transferred as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
