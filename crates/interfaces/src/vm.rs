// Copyright 2020-2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use reth_core::{Address, Block, BlockId, H256, U256};

/// Account facts a caller can query without executing anything: current
/// balance and nonce as of a given block. The miner and txpool crates both
/// use this to admit/order transactions without depending on the execution
/// engine itself.
#[async_trait]
pub trait WorldState: Send + Sync {
    async fn account_info(&self, block_id: BlockId, account: &Address) -> Option<AccountInfo>;
}

#[derive(Debug, Copy, Clone, Default)]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
}

impl AccountInfo {
    pub fn new(balance: U256, nonce: u64) -> AccountInfo {
        AccountInfo { balance, nonce }
    }
}

/// Delta produced by inserting a block or unwinding one during a reorg; the
/// txpool crate uses this to reinstate transactions from reverted blocks and
/// drop ones that landed in the new canonical chain.
pub struct StateUpdate {
    pub old_hash: H256,
    pub new_hash: H256,
    pub base_fee: U256,
    /// Accounts touched by the new head, post-update balance/nonce. Keyed
    /// by address rather than split reverted/applied since only the final
    /// value after the reorg settles matters to a consumer like the pool.
    pub changed_accounts: Vec<(Address, AccountInfo)>,
    /// Raw encoded transactions that were in the old canonical chain but
    /// are not in the new one, candidates for reinsertion into the pool.
    pub reverted_transactions: Vec<Vec<u8>>,
}

/// Executes a block's transactions against world state. Kept minimal: the
/// miner crate only needs to know whether a candidate block executes
/// cleanly and what state root results, not the detail of how.
pub trait Vm: Send + Sync {
    fn execute_block(&self, block: &Block) -> anyhow::Result<ExecutionOutput>;
}

pub struct ExecutionOutput {
    pub state_root: H256,
    pub receipts_root: H256,
    pub gas_used: U256,
}

#[cfg(any(test, feature = "test_only"))]
pub mod test_double {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    pub struct WorldStateTest {
        accounts_by_block: RwLock<HashMap<BlockId, HashMap<Address, AccountInfo>>>,
    }

    impl WorldStateTest {
        pub fn new_empty() -> Self {
            WorldStateTest {
                accounts_by_block: RwLock::new(HashMap::new()),
            }
        }

        pub fn insert(&self, id: BlockId, account: Address, info: AccountInfo) {
            self.accounts_by_block
                .write()
                .entry(id)
                .or_default()
                .insert(account, info);
        }
    }

    #[async_trait]
    impl WorldState for WorldStateTest {
        async fn account_info(&self, block_id: BlockId, account: &Address) -> Option<AccountInfo> {
            self.accounts_by_block
                .read()
                .get(&block_id)?
                .get(account)
                .copied()
        }
    }
}
