//! Cross-thread delivery into the network event loop
//!
//! The agent has two concurrency domains: the Tokio loop that owns the
//! network connection, and plain worker threads (camera capture). Workers
//! never touch the connection. They push into an [`OutboundLink`], a
//! bounded lock-free queue paired with a wake-up signal, and the event
//! loop pops and sends.
//!
//! ```text
//! capture thread ── schedule() ──▶ [ArrayQueue] ──▶ pop() ── event loop ──▶ socket
//!                       │                                        ▲
//!                       └──────────── Notify ────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use tokio::sync::Notify;

/// Default number of outbound messages held before the oldest is dropped
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 8;

/// Short human-readable rendering of a message for log lines
pub trait LogSummary {
    fn log_summary(&self) -> String;
}

/// Bounded, drop-oldest outbound queue shared between worker threads and
/// the event loop
///
/// Cloning is cheap and every clone refers to the same queue.
#[derive(Debug)]
pub struct OutboundLink<T> {
    queue: Arc<ArrayQueue<T>>,
    notify: Arc<Notify>,
    dropped: Arc<AtomicU64>,
}

impl<T> Clone for OutboundLink<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            notify: Arc::clone(&self.notify),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl<T> OutboundLink<T> {
    /// Create a link holding at most `capacity` pending messages
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
            notify: Arc::new(Notify::new()),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue a message and wake the event loop. Never blocks.
    ///
    /// When the queue is full the oldest pending message is discarded.
    /// Returns `true` if that happened.
    pub fn schedule(&self, msg: T) -> bool {
        let displaced = self.queue.force_push(msg).is_some();
        if displaced {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        displaced
    }

    /// Take the oldest pending message
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Take every pending message, oldest first
    pub fn drain(&self) -> Vec<T> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }

    /// Wait until something was scheduled since the last wake-up
    pub async fn ready(&self) {
        self.notify.notified().await
    }

    /// Number of pending messages
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Messages discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Default for OutboundLink<T> {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOUND_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_drop_oldest_on_overflow() {
        let link = OutboundLink::new(2);
        assert!(!link.schedule(1));
        assert!(!link.schedule(2));
        assert!(link.schedule(3));

        assert_eq!(link.drain(), vec![2, 3]);
        assert_eq!(link.dropped(), 1);
        assert!(link.is_empty());
    }

    #[test]
    fn test_clones_share_queue() {
        let link = OutboundLink::new(4);
        let worker_side = link.clone();
        worker_side.schedule("frame");

        assert_eq!(link.len(), 1);
        assert_eq!(link.pop(), Some("frame"));
    }

    #[tokio::test]
    async fn test_ready_wakes_on_schedule_from_thread() {
        let link = OutboundLink::new(4);
        let worker_side = link.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            worker_side.schedule(42u32);
        });

        tokio::time::timeout(Duration::from_secs(2), link.ready())
            .await
            .expect("link was never signalled");
        assert_eq!(link.pop(), Some(42));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_schedule_before_wait_is_not_lost() {
        let link = OutboundLink::new(4);
        link.schedule(7u8);

        tokio::time::timeout(Duration::from_millis(200), link.ready())
            .await
            .expect("stored permit should complete immediately");
        assert_eq!(link.drain(), vec![7]);
    }
}
