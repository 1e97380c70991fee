//! In-process broadcast implementation of the event bus port.
//!
//! One `tokio::sync::broadcast` channel per topic, created lazily on first
//! subscribe or publish and dropped again once a publish finds no
//! listeners. Slow consumers lag and lose old events rather than blocking
//! publishers; the notification log covers re-delivery.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;

use crate::domain::events::{ChannelTopic, LiveEvent};
use crate::domain::ports::EventBus;

/// Buffered events per topic before a slow subscriber starts lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Topic-keyed broadcast fan-out.
#[derive(Default)]
pub struct BroadcastEventBus {
    topics: RwLock<HashMap<ChannelTopic, broadcast::Sender<LiveEvent>>>,
}

impl BroadcastEventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, topic: &ChannelTopic, event: &LiveEvent) -> usize {
        let delivered = {
            let topics = self
                .topics
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match topics.get(topic) {
                Some(sender) => sender.send(event.clone()).unwrap_or(0),
                None => return 0,
            }
        };

        if delivered == 0 {
            // Last subscriber went away; drop the idle channel.
            let mut topics = self
                .topics
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if topics
                .get(topic)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                topics.remove(topic);
            }
        }
        delivered
    }

    fn subscribe(&self, topic: &ChannelTopic) -> broadcast::Receiver<LiveEvent> {
        let mut topics = self
            .topics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        topics
            .entry(*topic)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}
