//! Main-loop event queue.
//!
//! Events are produced by the [`Scheduler`](crate::scheduler::Scheduler)
//! delegate when a periodic task comes due, and consumed by the control
//! loop, which dispatches them one at a time in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Scheduler   │────▶│  Event Queue │────▶│  Main Loop   │
//! │ (delegate)  │     │  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The queue is owned by the loop and borrowed by the delegate; it never
//! crosses a thread boundary.

use heapless::spsc::Queue;
use log::warn;

/// Backing array size.  `heapless::spsc::Queue<_, N>` holds `N - 1` items.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Sample the analog input and feed the detector.
    SampleTick,
    /// Service the Wi-Fi link and MQTT session (heartbeat, reconnect).
    LinkPoll,
    /// Emit a statistics snapshot.
    StatsReport,
}

/// Bounded FIFO of pending [`Event`]s.
pub struct EventQueue {
    inner: Queue<Event, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            inner: Queue::new(),
            dropped: 0,
        }
    }

    /// Push an event.  Returns `false` if the queue is full (event dropped).
    pub fn push(&mut self, event: Event) -> bool {
        match self.inner.enqueue(event) {
            Ok(()) => true,
            Err(lost) => {
                self.dropped = self.dropped.saturating_add(1);
                warn!("Event queue full, dropped {:?} (total dropped {})", lost, self.dropped);
                false
            }
        }
    }

    /// Pop the next event, or `None` if empty.
    pub fn pop(&mut self) -> Option<Event> {
        self.inner.dequeue()
    }

    /// Drain all pending events into a callback, FIFO.
    pub fn drain(&mut self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Events lost to overflow since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
