//! Bounded, multi-producer / multi-consumer ingestion buffer.
//!
//! Capacity counts *outstanding* items: queued plus handed to a drain worker
//! but not yet acknowledged. A slot frees only on [`IngestBuffer::ack`].

use crate::error::BufferError;
use crate::metrics::BufferMetrics;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

/// Point-in-time buffer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub capacity: usize,
    pub outstanding: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub available: usize,
    pub closed: bool,
}

pub struct IngestBuffer<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    outstanding: AtomicUsize,
    in_flight: AtomicUsize,
    closed: AtomicBool,
    notify: Notify,
    metrics: BufferMetrics,
}

impl<T> IngestBuffer<T> {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            outstanding: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
            metrics: BufferMetrics::new(name),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> &BufferMetrics {
        &self.metrics
    }

    /// Admit the whole batch or none of it. Never blocks.
    ///
    /// Returns the number of items admitted. On [`BufferError::Full`] the
    /// error reports how many slots were free at the time of the check.
    pub fn submit(&self, items: Vec<T>) -> Result<usize, BufferError> {
        if self.is_closed() {
            self.metrics.submit_rejected("closed", items.len());
            return Err(BufferError::Closed);
        }

        let requested = items.len();
        if requested == 0 {
            return Ok(0);
        }

        self.reserve(requested)?;

        {
            let mut queue = self.queue.lock();
            queue.extend(items);
        }

        self.metrics.items_submitted(requested);
        self.metrics.outstanding(self.outstanding());
        self.notify.notify_one();

        debug!(buffer = %self.metrics.buffer(), count = requested, "Items admitted");
        Ok(requested)
    }

    fn reserve(&self, requested: usize) -> Result<(), BufferError> {
        let mut current = self.outstanding.load(Ordering::Acquire);
        loop {
            let available = self.capacity.saturating_sub(current);
            if requested > available {
                self.metrics.submit_rejected("full", requested);
                return Err(BufferError::Full {
                    requested,
                    available,
                });
            }

            match self.outstanding.compare_exchange_weak(
                current,
                current + requested,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Wait for the next batch.
    ///
    /// Waits for a first item, then keeps filling until `max_size` items are
    /// queued or `max_wait` elapses, whichever comes first. Items leave the
    /// queue only in the final synchronous take, so dropping the future never
    /// loses items.
    ///
    /// Returns `None` once the buffer is closed and empty.
    pub async fn next_batch(&self, max_size: usize, max_wait: Duration) -> Option<Vec<T>> {
        let max_size = max_size.max(1);

        loop {
            // Phase 1: wait for at least one queued item.
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.queued() > 0 {
                    break;
                }
                if self.is_closed() {
                    return None;
                }
                notified.await;
            }

            // Phase 2: fill until full, deadline, or close.
            let deadline = Instant::now() + max_wait;
            while self.queued() < max_size && !self.is_closed() {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let _ = tokio::time::timeout(deadline - now, self.notify.notified()).await;
            }

            if let Some(batch) = self.try_take(max_size) {
                return Some(batch);
            }
            // Another worker took everything; start over.
        }
    }

    /// Take up to `max_size` queued items without waiting.
    ///
    /// Taken items stay outstanding until acknowledged.
    pub fn try_take(&self, max_size: usize) -> Option<Vec<T>> {
        let (batch, remaining) = {
            let mut queue = self.queue.lock();
            let n = queue.len().min(max_size.max(1));
            if n == 0 {
                return None;
            }
            let batch: Vec<T> = queue.drain(..n).collect();
            (batch, queue.len())
        };

        self.in_flight.fetch_add(batch.len(), Ordering::AcqRel);
        if remaining > 0 {
            // Hand the rest to another idle worker.
            self.notify.notify_one();
        }
        Some(batch)
    }

    /// Release `count` slots previously taken by a drain worker.
    pub fn ack(&self, count: usize) {
        self.in_flight.fetch_sub(count, Ordering::AcqRel);
        let previous = self.outstanding.fetch_sub(count, Ordering::AcqRel);
        self.metrics.outstanding(previous.saturating_sub(count));
    }

    /// Stop admitting items. Queued items remain available to drain workers.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(
                buffer = %self.metrics.buffer(),
                queued = self.queued(),
                "Buffer closed to new submissions"
            );
            self.notify.notify_waiters();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn stats(&self) -> BufferStats {
        let outstanding = self.outstanding();
        BufferStats {
            capacity: self.capacity,
            outstanding,
            queued: self.queued(),
            in_flight: self.in_flight.load(Ordering::Acquire),
            available: self.capacity.saturating_sub(outstanding),
            closed: self.is_closed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_submit_within_capacity() {
        let buffer = IngestBuffer::new("test", 4);
        assert_eq!(buffer.submit(vec![1, 2, 3]).unwrap(), 3);

        let stats = buffer.stats();
        assert_eq!(stats.outstanding, 3);
        assert_eq!(stats.queued, 3);
        assert_eq!(stats.available, 1);
    }

    #[test]
    fn test_submit_is_all_or_nothing() {
        let buffer = IngestBuffer::new("test", 4);
        buffer.submit(vec![1, 2, 3]).unwrap();

        match buffer.submit(vec![4, 5]) {
            Err(BufferError::Full {
                requested,
                available,
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected Full, got {:?}", other),
        }

        // Nothing from the rejected batch was admitted.
        assert_eq!(buffer.queued(), 3);
        assert_eq!(buffer.outstanding(), 3);
    }

    #[test]
    fn test_empty_submit_is_noop() {
        let buffer: IngestBuffer<u32> = IngestBuffer::new("test", 1);
        assert_eq!(buffer.submit(Vec::new()).unwrap(), 0);
        assert_eq!(buffer.outstanding(), 0);
    }

    #[test]
    fn test_slots_free_only_on_ack() {
        let buffer = IngestBuffer::new("test", 2);
        buffer.submit(vec![1, 2]).unwrap();

        let batch = buffer.try_take(10).unwrap();
        assert_eq!(batch, vec![1, 2]);
        assert_eq!(buffer.stats().in_flight, 2);
        assert!(matches!(
            buffer.submit(vec![3]),
            Err(BufferError::Full { available: 0, .. })
        ));

        buffer.ack(batch.len());
        assert_eq!(buffer.outstanding(), 0);
        assert_eq!(buffer.submit(vec![3]).unwrap(), 1);
    }

    #[test]
    fn test_closed_buffer_rejects() {
        let buffer = IngestBuffer::new("test", 2);
        buffer.close();
        assert!(matches!(buffer.submit(vec![1]), Err(BufferError::Closed)));
        assert!(buffer.stats().closed);
    }

    #[tokio::test]
    async fn test_next_batch_respects_max_size() {
        let buffer = IngestBuffer::new("test", 10);
        buffer.submit((0..5).collect()).unwrap();

        let batch = buffer
            .next_batch(2, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(batch, vec![0, 1]);
        assert_eq!(buffer.queued(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_batch_returns_partial_after_max_wait() {
        let buffer = IngestBuffer::new("test", 10);
        buffer.submit(vec![7]).unwrap();

        let batch = buffer
            .next_batch(100, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(batch, vec![7]);
    }

    #[tokio::test]
    async fn test_next_batch_wakes_on_submit() {
        let buffer = Arc::new(IngestBuffer::new("test", 10));
        let waiter = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.next_batch(1, Duration::from_millis(1)).await })
        };

        tokio::task::yield_now().await;
        buffer.submit(vec![42]).unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch, Some(vec![42]));
    }

    #[tokio::test]
    async fn test_next_batch_ends_when_closed_and_empty() {
        let buffer = Arc::new(IngestBuffer::<u32>::new("test", 10));
        let waiter = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.next_batch(1, Duration::from_millis(1)).await })
        };

        tokio::task::yield_now().await;
        buffer.close();

        let batch = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(batch.is_none());
    }

    #[test]
    fn test_concurrent_submit_never_exceeds_capacity() {
        let buffer = Arc::new(IngestBuffer::new("test", 100));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    let mut admitted = 0;
                    for _ in 0..10 {
                        if let Ok(n) = buffer.submit(vec![0u8; 3]) {
                            admitted += n;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(admitted <= 100);
        assert_eq!(admitted, buffer.queued());
        assert_eq!(admitted, buffer.outstanding());
    }
}
