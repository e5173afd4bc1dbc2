use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

/// Creates an unbounded FIFO event channel with a single consumer.
pub fn event_channel<E>() -> (EventSink<E>, EventQueue<E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventQueue { rx })
}

/// Producer half handed to the task (and anything it spawns).
pub struct EventSink<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> EventSink<E> {
    /// Publishes one event without blocking.
    ///
    /// Returns `false` once the consumer has stopped draining.
    pub fn emit(&self, event: E) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Returns whether the consumer is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Outcome of a bounded-wait pop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopOutcome<E> {
    /// The next event in arrival order.
    Item(E),
    /// Nothing arrived within the wait.
    Elapsed,
    /// Every sink is dropped and the queue is empty.
    Closed,
}

/// Consumer half, owned by the drain loop.
pub struct EventQueue<E> {
    rx: mpsc::UnboundedReceiver<E>,
}

impl<E> EventQueue<E> {
    /// Non-blocking emptiness check.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Number of events waiting to be drained.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Pops the next event if one is already queued.
    pub fn try_pop(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Pops the next event, waiting at most `wait` for one to arrive.
    pub async fn pop_timeout(&mut self, wait: Duration) -> PopOutcome<E> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(event)) => PopOutcome::Item(event),
            Ok(None) => PopOutcome::Closed,
            Err(_) => PopOutcome::Elapsed,
        }
    }
}

impl<E> fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("len", &self.rx.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_in_push_order() {
        let (sink, mut queue) = event_channel();
        for n in 0..3 {
            assert!(sink.emit(n));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_pop(), Some(0));
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)).await, PopOutcome::Item(1));
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)).await, PopOutcome::Item(2));
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pop_reports_elapsed_then_closed() {
        let (sink, mut queue) = event_channel::<u8>();
        assert_eq!(queue.pop_timeout(Duration::from_millis(500)).await, PopOutcome::Elapsed);
        drop(sink);
        assert_eq!(queue.pop_timeout(Duration::from_millis(500)).await, PopOutcome::Closed);
    }

    #[test]
    fn emit_fails_after_consumer_drops() {
        let (sink, queue) = event_channel();
        drop(queue);
        assert!(sink.is_closed());
        assert!(!sink.emit("late"));
    }
}
