//! Injected publish/subscribe seam for live client delivery.
//!
//! The channel layer is process-wide shared infrastructure, but domain
//! services take it as a collaborator so tests can observe published
//! events without sockets.

use tokio::sync::broadcast;

use crate::domain::events::{ChannelTopic, LiveEvent};

/// Topic-addressed broadcast fan-out.
///
/// `publish` is best effort: it reports how many live subscribers received
/// the event and never fails, because durability lives in the notification
/// log, not the channel.
pub trait EventBus: Send + Sync {
    /// Deliver an event to current subscribers of a topic; returns the
    /// number of receivers reached.
    fn publish(&self, topic: &ChannelTopic, event: &LiveEvent) -> usize;

    /// Subscribe to a topic's live events.
    fn subscribe(&self, topic: &ChannelTopic) -> broadcast::Receiver<LiveEvent>;
}

/// Event bus with no delivery; used where live push is irrelevant.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn publish(&self, _topic: &ChannelTopic, _event: &LiveEvent) -> usize {
        0
    }

    fn subscribe(&self, _topic: &ChannelTopic) -> broadcast::Receiver<LiveEvent> {
        let (_sender, receiver) = broadcast::channel(1);
        receiver
    }
}
