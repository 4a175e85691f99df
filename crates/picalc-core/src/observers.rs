//! Concrete listener implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use tracing::{debug, info, trace};

use crate::constants::DEFAULT_LOG_INTERVAL_MS;
use crate::observer::ProgressListener;
use crate::progress::ProgressEvent;

/// Listener that forwards events through a channel without blocking.
///
/// Events are dropped when a bounded channel is full.
pub struct ChannelListener {
    sender: Sender<ProgressEvent>,
}

impl ChannelListener {
    /// Create a listener forwarding to `sender`.
    #[must_use]
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressListener for ChannelListener {
    fn on_event(&self, event: &ProgressEvent) {
        let _ = self.sender.try_send(event.clone());
    }
}

/// Listener that logs events through `tracing`, throttling per-term lines.
pub struct LoggingListener {
    started: Instant,
    min_interval_ms: u64,
    last_logged_ms: AtomicU64,
}

impl LoggingListener {
    /// Create a logging listener emitting at most one term line per interval.
    #[must_use]
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            min_interval_ms,
            last_logged_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn should_log(&self) -> bool {
        let now = self.started.elapsed().as_millis() as u64;
        let last = self.last_logged_ms.load(Ordering::Relaxed);
        if last != 0 && now.saturating_sub(last) < self.min_interval_ms {
            return false;
        }
        self.last_logged_ms
            .compare_exchange(last, now.max(1), Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL_MS)
    }
}

impl ProgressListener for LoggingListener {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ConstantReady { value } => {
                info!(digits = value.significant_digits(), "constant ready");
            }
            ProgressEvent::IterationCompleted { index, value } => {
                if self.should_log() {
                    debug!(index, digits = value.significant_digits(), "term completed");
                }
            }
            ProgressEvent::NominatorReady { index, value }
            | ProgressEvent::DenominatorReady { index, value } => {
                trace!(kind = event.kind(), index, bits = value.bits(), "factor ready");
            }
        }
    }
}

/// Listener that counts completed terms.
#[derive(Default)]
pub struct CountingListener {
    completed: AtomicU64,
}

impl CountingListener {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `IterationCompleted` events seen.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressListener for CountingListener {
    fn on_event(&self, event: &ProgressEvent) {
        if let ProgressEvent::IterationCompleted { .. } = event {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Null object: discards every event.
#[derive(Default)]
pub struct NoOpListener;

impl NoOpListener {
    /// Create a no-op listener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProgressListener for NoOpListener {
    fn on_event(&self, _event: &ProgressEvent) {}
}
