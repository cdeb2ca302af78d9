// Copyright 2020-2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crate::vm::StateUpdate;
use async_trait::async_trait;
use reth_core::H256;

/// Surface the wire crate drives to feed received transactions/hashes into
/// the pool and to answer GetPooledTransactions, without depending on the
/// pool's internal scoring and eviction machinery.
#[async_trait]
pub trait TransactionPool: Send + Sync {
    /// Of the given hashes, the ones the pool does not already have —
    /// preserves order, drops none.
    async fn filter_unknown(&self, hashes: Vec<H256>) -> Vec<H256>;
    /// Validates and admits raw (RLP-encoded) transactions; one result per
    /// input, same order.
    async fn import(&self, transactions: Vec<Vec<u8>>) -> Vec<anyhow::Result<()>>;
    /// Encoded transactions for the requested hashes; `None` in a slot the
    /// pool doesn't have.
    async fn find(&self, hashes: Vec<H256>) -> Vec<Option<Vec<u8>>>;
    async fn remove(&self, hashes: Vec<H256>);
    /// Applied after a chain reorg or new head: drop transactions that
    /// landed on-chain, reinstate ones from blocks that got reverted.
    async fn apply_state_update(&self, update: &StateUpdate);
}

#[cfg(any(test, feature = "test_only"))]
pub mod test_double {
    use super::*;
    use parking_lot::Mutex;

    /// Treats every hash as unknown unless seeded via `seed_known`, and
    /// records every import instead of touching a real pool.
    #[derive(Default)]
    pub struct RecordingPool {
        pub known: Mutex<Vec<(H256, Vec<u8>)>>,
        pub imported: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingPool {
        pub fn seed_known(&self, hash: H256, raw: Vec<u8>) {
            self.known.lock().push((hash, raw));
        }
    }

    #[async_trait]
    impl TransactionPool for RecordingPool {
        async fn filter_unknown(&self, hashes: Vec<H256>) -> Vec<H256> {
            hashes
        }

        async fn import(&self, transactions: Vec<Vec<u8>>) -> Vec<anyhow::Result<()>> {
            let count = transactions.len();
            self.imported.lock().extend(transactions);
            (0..count).map(|_| Ok(())).collect()
        }

        async fn find(&self, hashes: Vec<H256>) -> Vec<Option<Vec<u8>>> {
            let known = self.known.lock();
            hashes
                .into_iter()
                .map(|hash| known.iter().find(|(h, _)| *h == hash).map(|(_, raw)| raw.clone()))
                .collect()
        }

        async fn remove(&self, _hashes: Vec<H256>) {}

        async fn apply_state_update(&self, _update: &StateUpdate) {}
    }
}
