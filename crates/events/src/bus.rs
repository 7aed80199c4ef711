//! Lifecycle event fan-out over a tokio broadcast channel.

use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

/// Events a slow subscriber may fall behind by before it starts lagging.
const CAPACITY: usize = 256;

/// Shared handle to the lifecycle channel of a phase run.
///
/// Clones send into the same channel. The channel closes for subscribers once
/// every clone is dropped, which is how the CLI's progress printer ends.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    /// Stamp `event` and send it. Returns the number of subscribers reached;
    /// with none listening the event is discarded.
    pub fn emit(&self, event: Event) -> usize {
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Receive events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
