// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Wraps the `test_only` in-memory chain double with the one piece of glue
//! §6 requires and the double itself has no reason to know about: publishing
//! `CHAIN_UPDATED` once a block actually lands.

use reth_core::{Block, BlockBody, BlockHeader, BlockId, BlockNumber, H256, U256};
use reth_interfaces::{
    blockchain::{test_double::InMemoryBlockchain, Blockchain, BlockchainWriter},
    event_bus::{ChainUpdated, EventBus},
};
use std::sync::Arc;

pub struct EventPublishingBlockchain {
    inner: Arc<InMemoryBlockchain>,
    event_bus: Arc<EventBus>,
}

impl EventPublishingBlockchain {
    pub fn new(inner: Arc<InMemoryBlockchain>, event_bus: Arc<EventBus>) -> Self {
        EventPublishingBlockchain { inner, event_bus }
    }
}

impl Blockchain for EventPublishingBlockchain {
    fn header(&self, id: BlockId) -> Option<BlockHeader> {
        self.inner.header(id)
    }
    fn body(&self, id: BlockId) -> Option<BlockBody> {
        self.inner.body(id)
    }
    fn header_range(&self, start: BlockId, max_headers: u64, skip: u64, reverse: bool) -> Vec<BlockHeader> {
        self.inner.header_range(start, max_headers, skip, reverse)
    }
    fn best_number(&self) -> BlockNumber {
        self.inner.best_number()
    }
    fn best_hash(&self) -> H256 {
        self.inner.best_hash()
    }
    fn total_difficulty(&self, id: BlockId) -> Option<U256> {
        self.inner.total_difficulty(id)
    }
    fn genesis_hash(&self) -> H256 {
        self.inner.genesis_hash()
    }
}

impl BlockchainWriter for EventPublishingBlockchain {
    fn insert_block(&self, block: Block) -> anyhow::Result<()> {
        let number = block.header.number;
        let hash = block.header.hash();
        self.inner.insert_block(block)?;
        self.event_bus.publish(ChainUpdated { number, hash, is_reorg: false });
        Ok(())
    }
}
