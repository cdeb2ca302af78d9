// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use reth_core::{Block, BlockBody, BlockHeader, BlockId, BlockNumber, H256, U256};

/// Read-only view of the canonical chain, as seen by the wire and miner
/// crates. Implemented against whatever storage backend actually holds
/// blocks; both crates depend only on this trait.
pub trait Blockchain: Send + Sync {
    fn header(&self, id: BlockId) -> Option<BlockHeader>;
    fn header_by_hash(&self, hash: &H256) -> Option<BlockHeader> {
        self.header(BlockId::Hash(*hash))
    }
    fn body(&self, id: BlockId) -> Option<BlockBody>;
    fn block(&self, id: BlockId) -> Option<Block> {
        Some(Block {
            header: self.header(id)?,
            body: self.body(id)?,
        })
    }
    /// `max_headers` headers starting at `start`, `skip` apart, optionally walking
    /// toward the genesis instead of the tip. Mirrors the eth/6x GetBlockHeaders query shape.
    fn header_range(
        &self,
        start: BlockId,
        max_headers: u64,
        skip: u64,
        reverse: bool,
    ) -> Vec<BlockHeader>;
    fn best_number(&self) -> BlockNumber;
    fn best_hash(&self) -> H256;
    fn total_difficulty(&self, id: BlockId) -> Option<U256>;
    fn genesis_hash(&self) -> H256;
}

/// Mutating half of the chain facade; kept separate so read-mostly
/// consumers (the wire crate answering GetBlockHeaders) don't need write
/// access.
pub trait BlockchainWriter: Send + Sync {
    /// Inserts a block that has already passed consensus and execution
    /// verification, extending (or forking from) the canonical chain.
    fn insert_block(&self, block: Block) -> anyhow::Result<()>;
}

#[cfg(any(test, feature = "test_only"))]
pub mod test_double {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    /// In-memory chain keyed by block number, always linear (no forks),
    /// good enough to exercise header-serving and import logic in tests.
    pub struct InMemoryBlockchain {
        blocks: RwLock<HashMap<BlockNumber, Block>>,
        genesis_hash: H256,
    }

    impl InMemoryBlockchain {
        pub fn new(genesis: Block) -> Self {
            let genesis_hash = genesis.hash();
            let mut blocks = HashMap::new();
            blocks.insert(genesis.header.number, genesis);
            InMemoryBlockchain {
                blocks: RwLock::new(blocks),
                genesis_hash,
            }
        }

        fn header_at(&self, number: BlockNumber) -> Option<BlockHeader> {
            self.blocks.read().get(&number).map(|b| b.header.clone())
        }

        fn resolve(&self, id: BlockId) -> Option<BlockNumber> {
            match id {
                BlockId::Number(n) => Some(n),
                BlockId::Latest => Some(self.best_number()),
                BlockId::Hash(hash) => self
                    .blocks
                    .read()
                    .values()
                    .find(|b| b.hash() == hash)
                    .map(|b| b.header.number),
            }
        }
    }

    impl Blockchain for InMemoryBlockchain {
        fn header(&self, id: BlockId) -> Option<BlockHeader> {
            self.header_at(self.resolve(id)?)
        }

        fn body(&self, id: BlockId) -> Option<BlockBody> {
            let number = self.resolve(id)?;
            self.blocks.read().get(&number).map(|b| b.body.clone())
        }

        fn header_range(
            &self,
            start: BlockId,
            max_headers: u64,
            skip: u64,
            reverse: bool,
        ) -> Vec<BlockHeader> {
            let start = match self.resolve(start) {
                Some(n) => n,
                None => return Vec::new(),
            };
            let stride = skip + 1;
            let mut out = Vec::new();
            let mut cursor = start as i128;
            for _ in 0..max_headers {
                if cursor < 0 {
                    break;
                }
                match self.header_at(cursor as BlockNumber) {
                    Some(header) => out.push(header),
                    None => break,
                }
                cursor += if reverse { -(stride as i128) } else { stride as i128 };
            }
            out
        }

        fn best_number(&self) -> BlockNumber {
            self.blocks.read().keys().copied().max().unwrap_or_default()
        }

        fn best_hash(&self) -> H256 {
            self.header_at(self.best_number())
                .map(|h| h.hash())
                .unwrap_or(self.genesis_hash)
        }

        fn total_difficulty(&self, id: BlockId) -> Option<U256> {
            let target = self.resolve(id)?;
            let blocks = self.blocks.read();
            let mut total = U256::zero();
            for number in 0..=target {
                total += blocks.get(&number)?.header.difficulty;
            }
            Some(total)
        }

        fn genesis_hash(&self) -> H256 {
            self.genesis_hash
        }
    }

    impl BlockchainWriter for InMemoryBlockchain {
        fn insert_block(&self, block: Block) -> anyhow::Result<()> {
            self.blocks.write().insert(block.header.number, block);
            Ok(())
        }
    }
}
