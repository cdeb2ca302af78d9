// Copyright 2020-2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use reth_core::{BlockHeader, BlockId, BlockNumber, Transaction, H256, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewBlockHash {
    pub hash: H256,
    pub number: BlockNumber,
}

impl NewBlockHash {
    pub fn new(hash: H256, number: BlockNumber) -> Self {
        NewBlockHash { hash, number }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetBlockHeaders {
    pub block_id: BlockId,
    pub max_headers: u64,
    pub skip: u64,
    pub reverse: bool,
}

impl GetBlockHeaders {
    pub fn new(block_id: BlockId, max_headers: u64, skip: u64, reverse: bool) -> GetBlockHeaders {
        GetBlockHeaders {
            block_id,
            max_headers,
            skip,
            reverse,
        }
    }
}

/// A decoded header paired with its own hash, so callers don't need to
/// re-hash it for every lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockHeaderAndHash {
    pub header: BlockHeader,
    pub hash: H256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBlock {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub ommers: Vec<BlockHeader>,
    pub total_difficulty: U256,
}
