// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{transactions::BlockInfo, ScoreTransaction, Transactions};
use crate::{config::Config, Announcer, Error};
use async_trait::async_trait;
use futures::future::join_all;
use reth_interfaces::{
    txpool::TransactionPool,
    vm::{StateUpdate, WorldState},
};
use parking_lot::RwLock;
use reth_core::{Address, BlockId, Transaction, H256, U256};
use std::{collections::HashMap, sync::Arc};

pub struct PendingBlock {
    pub tx: Vec<ScoreTransaction>,
    pub gas_price: U256,
}

/// Transaction pool.
pub struct Pool {
    txs: Arc<RwLock<Transactions>>,
    /// configuration of pool
    config: Arc<Config>,

    /// World state
    world_state: Arc<dyn WorldState>,

    announcer: Arc<dyn Announcer>,
}

impl Pool {
    pub fn new(
        config: Arc<Config>,
        world_state: Arc<dyn WorldState>,
        announcer: Arc<dyn Announcer>,
    ) -> Pool {
        let best_block = BlockInfo {
            base_fee: 0.into(),
            hash: H256::zero(),
        };

        let pool = Pool {
            txs: Arc::new(RwLock::new(Transactions::new(config.clone(), best_block))),
            config: config.clone(),
            world_state,
            announcer: announcer.clone(),
        };

        // periodic check for timing out tx and checking to recreate binary_heap.
        let txs = pool.txs.clone();
        let annon = announcer.clone();
        let timeout = config.timeout;
        let _ = tokio::spawn(async move {
            loop {
                let rem = txs.write().periodic_check();
                for rem in rem {
                    annon.removed(rem, Error::RemovedTxTimeout).await;
                }
                tokio::time::sleep(timeout / 360).await;
            }
        });

        pool
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get transaction for pending blocks
    pub async fn new_pending_block(&self) -> (Vec<Arc<Transaction>>, BlockInfo) {
        //iterate over sorted tx to create new pending block tx
        let (binary_heap, infos, block) = {
            let mut txs = self.txs.write();
            let block = *txs.block();
            let (heap, infos, _) = txs.binary_heap_and_accounts();
            (heap, infos, block)
        };
        let sorted = binary_heap.into_sorted_vec();
        let mut out = Vec::new();
        let mut nonces: HashMap<Address, u64> = HashMap::new();
        for tx in sorted.into_iter().rev() {
            if tx.score < block.base_fee {
                break;
            }
            let author = tx
                .author()
                .expect("every inserted transaction has a recoverable author");
            let nonce = nonces.entry(author).or_insert_with(|| {
                infos
                    .get(&author)
                    .expect("account info should be present")
                    .nonce
            });
            if *nonce == tx.nonce {
                out.push(tx.tx.clone());
                *nonce += 1;
            }
        }
        // If tx0 and tx1 share an author at nonces 0 and 1, and tx1 scores higher
        // than tx0, this walk skips tx1 on the first pass: nonces must still be
        // applied in order. A second pass reconsidering skipped transactions
        // would close that gap; left for a future revision.
        (out, block)
    }
}

#[async_trait]
impl TransactionPool for Pool {
    async fn filter_unknown(&self, hashes: Vec<H256>) -> Vec<H256> {
        let txs = self.txs.read();
        hashes
            .into_iter()
            .filter(|hash| txs.find_by_hash(hash).is_none())
            .collect()
    }

    async fn import(&self, transactions: Vec<Vec<u8>>) -> Vec<anyhow::Result<()>> {
        let mut handlers = Vec::with_capacity(transactions.len());
        for raw in transactions.into_iter() {
            handlers.push(async move {
                let tx = Arc::new(Transaction::decode(&raw)?);
                if !tx.has_author() {
                    return Err(Error::TxAuthorUnknown.into());
                }
                let address = tx.author().unwrap();
                let replaced;

                // Loop below is a way to avoid calling world_state.account_info from rwlocked pool and with that
                // blocking all operation for extended period while we are waiting for response.
                // In best (most used) case it should loop only once.
                // Block hash is used as kind of identifier to check if pool is changed or not.
                loop {
                    // pool read lock. Get account info and block hash from pool.
                    let (info, block_hash) = {
                        let txs_pool = self.txs.read();
                        (txs_pool.account(&address).cloned(), txs_pool.block().hash)
                    };
                    // if there is account present in pool use it.
                    let acc_and_block_hash = if info.is_some() {
                        info.map(|t| Some((t, block_hash))).flatten()
                    } else {
                        // if there is no account known fetch account info from world_state.
                        let info = self
                            .world_state
                            .account_info(BlockId::Hash(block_hash), &address)
                            .await
                            .unwrap_or_default();
                        Some((info, block_hash))
                    };
                    // pool write lock. Insert tx into pool with provided account info.
                    match self.txs.write().insert(tx.clone(), acc_and_block_hash) {
                        // Hurray, we included tx into pool
                        Ok(rem) => {
                            replaced = rem;
                            break;
                        }
                        Err(err) => {
                            // account info got obsolete, that means that
                            // new block was included/retracted and block hash is changed.
                            // loop over and ping world_state for new info
                            if let Some(Error::InternalAccountObsolete) =
                                err.downcast_ref::<Error>()
                            {
                                continue;
                            }
                            // there is error on inclusion of tx.
                            return Err(err);
                        }
                    };
                }
                // announce change in pool
                for (tx, reason) in replaced {
                    self.announcer.removed(tx, reason).await;
                }
                self.announcer.inserted(tx).await;
                Ok(())
            });
        }

        join_all(handlers).await
    }

    async fn find(&self, hashes: Vec<H256>) -> Vec<Option<Vec<u8>>> {
        let txs = self.txs.read();
        hashes
            .into_iter()
            .map(|hash| txs.find_by_hash(&hash).map(|tx| tx.encode(false)))
            .collect()
    }

    async fn remove(&self, hashes: Vec<H256>) {
        for hash in hashes.iter() {
            let tx = self.txs.write().remove(hash);
            if let Some(tx) = tx {
                self.announcer.removed(tx, Error::RemovedTxOnDemand).await;
            }
        }
    }

    async fn apply_state_update(&self, update: &StateUpdate) {
        let (removed, reinserted) = self.txs.write().block_update(update);
        for (rem, reason) in removed {
            self.announcer.removed(rem, reason).await;
        }
        for reinsert in reinserted {
            self.announcer.reinserted(reinsert).await;
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::{super::announcer::test::AnnouncerTest, *};
    use reth_interfaces::vm::test_double::WorldStateTest;

    #[tokio::test]
    async fn smoke_test() {
        //Create objects
        let pool = Arc::new(Pool::new(
            Arc::new(Config::default()),
            Arc::new(WorldStateTest::new_empty()),
            Arc::new(AnnouncerTest::new()),
        ));
        {
            pool.import(vec![]).await;
        }
    }
}
