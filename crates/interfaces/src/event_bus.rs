// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use reth_core::{BlockNumber, H256};
use tokio::sync::broadcast;

/// Chain-head change, published once a block is fully committed. The miner
/// crate subscribes to restart block assembly on the new parent; the
/// txpool crate subscribes to apply the resulting `StateUpdate`.
#[derive(Debug, Clone)]
pub struct ChainUpdated {
    pub number: BlockNumber,
    pub hash: H256,
    pub is_reorg: bool,
}

/// Thin wrapper around a broadcast channel: every subscriber gets every
/// event, late subscribers miss whatever was published before they joined.
pub struct EventBus {
    sender: broadcast::Sender<ChainUpdated>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus { sender }
    }

    pub fn publish(&self, event: ChainUpdated) {
        // no active subscribers is not an error, the event is simply dropped
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChainUpdated> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(ChainUpdated {
            number: 1,
            hash: H256::zero(),
            is_reorg: false,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.number, 1);
    }
}
