// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Assembles one candidate block: admits transactions against a simulated
//! account view, then hands the finished body to the `Vm` collaborator for
//! the real state transition.

use crate::error::BuilderError;
use clique::{SignerSet, EXTRA_SEAL, EXTRA_VANITY};
use crypto::publickey::Secret;
use reth_core::{
    Address, Block, BlockBody, BlockHeader, BlockId, BlockNumber, Bloom, Keccak, Transaction, U256,
};
use reth_interfaces::vm::{AccountInfo, Vm, WorldState};
use std::{collections::HashMap, sync::Arc};

/// Header facts the scheduler has already decided (difficulty, gas limit,
/// base fee); the builder only fills in what depends on the assembled body.
pub struct HeaderData {
    pub number: BlockNumber,
    pub difficulty: U256,
    pub gas_limit: U256,
    pub base_fee_per_gas: Option<U256>,
    pub timestamp: u64,
}

/// Clique-specific knobs; absent on a node that only validates, never seals.
pub struct CliqueOptions {
    pub signer_address: Address,
    pub signer_secret: Secret,
    pub signers: Arc<SignerSet>,
}

pub struct BlockBuilder {
    parent: BlockHeader,
    header_data: HeaderData,
    clique: Option<CliqueOptions>,
    world_state: Arc<dyn WorldState>,
    vm: Arc<dyn Vm>,
    accounts: HashMap<Address, AccountInfo>,
    body: Vec<Transaction>,
    gas_used: U256,
}

impl BlockBuilder {
    pub fn open(
        parent: BlockHeader,
        header_data: HeaderData,
        clique: Option<CliqueOptions>,
        world_state: Arc<dyn WorldState>,
        vm: Arc<dyn Vm>,
    ) -> Self {
        BlockBuilder {
            parent,
            header_data,
            clique,
            world_state,
            vm,
            accounts: HashMap::new(),
            body: Vec::new(),
            gas_used: U256::zero(),
        }
    }

    pub fn gas_remaining(&self) -> U256 {
        self.header_data.gas_limit.saturating_sub(self.gas_used)
    }

    /// Executes `tx` against the builder's simulated account snapshot. On
    /// success the transaction joins the body and `gas_used` accounts for
    /// its full `gas_limit` (this crate has no per-instruction gas metering
    /// ahead of the real `Vm::execute_block` call, so it reserves the worst
    /// case, matching the donor's own conservative block-gas accounting).
    pub async fn add_transaction(&mut self, tx: Transaction) -> Result<(), BuilderError> {
        let gas_limit = U256::from(tx.gas_limit);
        if gas_limit > self.gas_remaining() {
            return Err(BuilderError::GasLimitExceeded { remaining: self.gas_remaining() });
        }
        if let Some(base_fee) = self.header_data.base_fee_per_gas {
            if tx.is_below_base_fee(base_fee) {
                return Err(BuilderError::BaseFeeTooLow);
            }
        }
        let sender = tx.author().ok_or(BuilderError::UnrecoverableSender)?;
        let account = self.account(sender).await;
        if tx.nonce != account.nonce {
            return Err(BuilderError::NonceMismatch { tx_nonce: tx.nonce, account_nonce: account.nonce });
        }
        let cost = tx.cost();
        if account.balance < cost {
            return Err(BuilderError::InsufficientBalance { balance: account.balance, cost });
        }
        self.accounts.insert(
            sender,
            AccountInfo { balance: account.balance - cost, nonce: account.nonce + 1 },
        );
        self.gas_used += gas_limit;
        self.body.push(tx);
        Ok(())
    }

    async fn account(&mut self, address: Address) -> AccountInfo {
        if let Some(info) = self.accounts.get(&address) {
            return *info;
        }
        let info = self
            .world_state
            .account_info(BlockId::Hash(self.parent.hash()), &address)
            .await
            .unwrap_or_default();
        self.accounts.insert(address, info);
        info
    }

    pub fn is_full(&self) -> bool {
        self.gas_remaining() < U256::from(21_000)
    }

    pub fn discard(self) {}

    /// Finalizes the block: builds the header around the admitted body,
    /// runs it through the `Vm` to get the real state root and receipts
    /// root, then (on a Clique node) seals it.
    pub fn build(self) -> Result<Block, BuilderError> {
        let extra_data = self.extra_data();
        let no_ommers: Vec<BlockHeader> = Vec::new();
        let ommers_hash = keccak_hash::keccak(rlp::encode_list(&no_ommers));
        let mut header = BlockHeader {
            parent_hash: self.parent.hash(),
            ommers_hash,
            beneficiary_address: self.clique.as_ref().map(|c| c.signer_address).unwrap_or_default(),
            state_root: Keccak::zero(),
            transactions_root: transactions_root(&self.body),
            receipts_root: Keccak::zero(),
            logs_bloom: Bloom::zero(),
            difficulty: self.header_data.difficulty,
            number: self.header_data.number,
            gas_limit: self.header_data.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.header_data.timestamp,
            extra_data,
            mix_hash: Keccak::zero(),
            nonce: 0,
            base_fee_per_gas: self.header_data.base_fee_per_gas,
        };

        let block = Block { header: header.clone(), body: BlockBody { transactions: self.body.clone(), ommers: Vec::new() } };
        let output = self.vm.execute_block(&block).map_err(BuilderError::Revert)?;
        header.state_root = output.state_root;
        header.receipts_root = output.receipts_root;
        header.gas_used = output.gas_used;

        if let Some(clique) = &self.clique {
            clique::seal(&mut header, &clique.signer_secret).map_err(|err| BuilderError::Revert(err.into()))?;
        }

        Ok(Block { header, body: BlockBody { transactions: self.body, ommers: Vec::new() } })
    }

    fn extra_data(&self) -> Vec<u8> {
        let mut extra = vec![0u8; EXTRA_VANITY];
        if self.clique.is_some() {
            extra.extend(std::iter::repeat(0u8).take(EXTRA_SEAL));
        }
        extra
    }
}

fn transactions_root(txs: &[Transaction]) -> Keccak {
    let mut stream = rlp::RlpStream::new();
    Transaction::rlp_append_list(&mut stream, txs);
    keccak_hash::keccak(stream.out())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::publickey::{Generator, KeyPair, Random};
    use reth_core::transaction::test_util::signed_legacy_tx;
    use reth_interfaces::vm::{test_double::WorldStateTest, ExecutionOutput};

    struct VmAlwaysSucceeds;
    impl Vm for VmAlwaysSucceeds {
        fn execute_block(&self, block: &reth_core::Block) -> anyhow::Result<reth_interfaces::vm::ExecutionOutput> {
            Ok(ExecutionOutput {
                state_root: Keccak::repeat_byte(0x99),
                receipts_root: Keccak::zero(),
                gas_used: block.body.transactions.iter().map(|t| U256::from(t.gas_limit)).fold(U256::zero(), |a, b| a + b),
            })
        }
    }

    fn parent_header() -> BlockHeader {
        BlockHeader {
            parent_hash: Keccak::zero(),
            ommers_hash: Keccak::zero(),
            beneficiary_address: Address::zero(),
            state_root: Keccak::zero(),
            transactions_root: Keccak::zero(),
            receipts_root: Keccak::zero(),
            logs_bloom: Bloom::zero(),
            difficulty: U256::from(2),
            number: 9,
            gas_limit: U256::from(8_000_000),
            gas_used: U256::zero(),
            timestamp: 100,
            extra_data: Vec::new(),
            mix_hash: Keccak::zero(),
            nonce: 0,
            base_fee_per_gas: None,
        }
    }

    fn keypair() -> KeyPair {
        Random.generate().unwrap()
    }

    #[tokio::test]
    async fn admits_transaction_with_sufficient_balance_and_nonce() {
        let world_state = Arc::new(WorldStateTest::new_empty());
        let kp = keypair();
        let author = kp.address();
        world_state.insert(
            BlockId::Hash(parent_header().hash()),
            author,
            AccountInfo { balance: U256::from(1_000_000_000_000u64), nonce: 0 },
        );
        let tx = signed_legacy_tx(&kp, 0, 21_000, U256::from(1));
        let mut builder = BlockBuilder::open(
            parent_header(),
            HeaderData { number: 10, difficulty: U256::from(2), gas_limit: U256::from(8_000_000), base_fee_per_gas: None, timestamp: 115 },
            None,
            world_state,
            Arc::new(VmAlwaysSucceeds),
        );
        assert!(builder.add_transaction(tx).await.is_ok());
        let block = builder.build().unwrap();
        assert_eq!(block.body.transactions.len(), 1);
        assert_eq!(block.header.gas_used, U256::from(21_000));
    }

    #[tokio::test]
    async fn rejects_nonce_mismatch() {
        let world_state = Arc::new(WorldStateTest::new_empty());
        let kp = keypair();
        let author = kp.address();
        world_state.insert(
            BlockId::Hash(parent_header().hash()),
            author,
            AccountInfo { balance: U256::from(1_000_000_000_000u64), nonce: 5 },
        );
        let tx = signed_legacy_tx(&kp, 0, 21_000, U256::from(1));
        let mut builder = BlockBuilder::open(
            parent_header(),
            HeaderData { number: 10, difficulty: U256::from(2), gas_limit: U256::from(8_000_000), base_fee_per_gas: None, timestamp: 115 },
            None,
            world_state,
            Arc::new(VmAlwaysSucceeds),
        );
        assert!(matches!(builder.add_transaction(tx).await, Err(BuilderError::NonceMismatch { .. })));
    }

    #[tokio::test]
    async fn rejects_gas_limit_exceeded() {
        let world_state = Arc::new(WorldStateTest::new_empty());
        let kp = keypair();
        let tx = signed_legacy_tx(&kp, 0, 21_000, U256::from(1));
        let mut builder = BlockBuilder::open(
            parent_header(),
            HeaderData { number: 10, difficulty: U256::from(2), gas_limit: U256::from(20_000), base_fee_per_gas: None, timestamp: 115 },
            None,
            world_state,
            Arc::new(VmAlwaysSucceeds),
        );
        assert!(matches!(builder.add_transaction(tx).await, Err(BuilderError::GasLimitExceeded { .. })));
    }

    #[tokio::test]
    async fn rejects_below_base_fee() {
        let world_state = Arc::new(WorldStateTest::new_empty());
        let kp = keypair();
        let tx = signed_legacy_tx(&kp, 0, 21_000, U256::from(5));
        let mut builder = BlockBuilder::open(
            parent_header(),
            HeaderData { number: 10, difficulty: U256::from(2), gas_limit: U256::from(8_000_000), base_fee_per_gas: Some(U256::from(10)), timestamp: 115 },
            None,
            world_state,
            Arc::new(VmAlwaysSucceeds),
        );
        assert!(matches!(builder.add_transaction(tx).await, Err(BuilderError::BaseFeeTooLow)));
    }
}
