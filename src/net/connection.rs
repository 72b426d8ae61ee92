//! In-flight stream tracking.
//!
//! # Responsibilities
//! - Generate unique stream IDs for tracing
//! - Count open `Process` streams so shutdown can wait for them to drain
//! - Keep the `ext_proc_streams_active` gauge in step with the count

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;

/// Relaxed ordering is enough: IDs only need to be unique.
static STREAM_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for one `Process` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(u64);

impl StreamId {
    pub fn new() -> Self {
        Self(STREAM_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Counts open streams for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct StreamTracker {
    active_count: Arc<AtomicU64>,
}

impl StreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened stream. The returned guard closes it on drop.
    pub fn track(&self) -> StreamGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_stream_opened();
        StreamGuard {
            active_count: Arc::clone(&self.active_count),
            id: StreamId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every tracked stream has closed or `timeout` elapses.
    ///
    /// Returns `true` if the streams drained in time.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let drained = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(timeout, drained).await.is_ok()
    }
}

/// Lifetime of one stream. Decrements the active count when dropped.
#[derive(Debug)]
pub struct StreamGuard {
    active_count: Arc<AtomicU64>,
    id: StreamId,
}

impl StreamGuard {
    pub fn id(&self) -> StreamId {
        self.id
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_stream_closed();
        tracing::trace!(stream_id = %self.id, "Stream closed");
    }
}
