// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use reth_core::{Transaction, H256, U256};
use std::{
    cmp,
    collections::{BinaryHeap, HashSet},
    mem,
    ops::Deref,
    sync::Arc,
};

pub type Score = U256;

pub struct ByScore {
    /// all transactions sorted by min/max value
    sorting: BinaryHeap<ScoreTransaction>,
    /// pending hashes for removal. It is optimization for BinaryHeap because we dont want to recreate it every time.
    pending_removal: HashSet<H256>,
}

impl ByScore {
    pub fn new() -> Self {
        Self {
            sorting: BinaryHeap::new(),
            pending_removal: HashSet::new(),
        }
    }

    pub fn peek(&self) -> Option<&ScoreTransaction> {
        self.sorting.peek()
    }

    pub fn push(&mut self, tx: ScoreTransaction) {
        self.sorting.push(tx);
    }

    pub fn clone_heap(&self) -> BinaryHeap<ScoreTransaction> {
        self.sorting.clone()
    }

    pub fn remove(&mut self, hash: H256) {
        match self.sorting.peek() {
            Some(top) if top.hash() == hash => {
                self.sorting.pop();
                while let Some(tx) = self.sorting.peek() {
                    if !self.pending_removal.contains(&tx.hash()) {
                        break;
                    }
                    self.sorting.pop();
                }
            }
            _ => {
                // mark tx for removal from by_score
                self.pending_removal.insert(hash);
            }
        }
    }

    pub fn pending_removal(&self) -> usize {
        self.pending_removal.len()
    }

    /// Drops everything pending removal and, if a base fee is given,
    /// re-derives every surviving transaction's score against it (the
    /// binary heap's ordering key is only valid for the base fee it was
    /// built with).
    pub fn recreate_heap(&mut self, base_fee: Option<U256>) {
        let fresh_tx: Vec<_> = mem::take(&mut self.sorting)
            .into_vec()
            .into_iter()
            .filter(|tx| !self.pending_removal.contains(&tx.hash()))
            .map(|tx| match base_fee {
                Some(base_fee) => ScoreTransaction::new(tx.tx, base_fee),
                None => tx,
            })
            .collect();

        self.pending_removal.clear();
        self.sorting = BinaryHeap::from(fresh_tx);
    }

    pub fn pending_removal_remove(&mut self, hash: &H256) -> bool {
        self.pending_removal.remove(hash)
    }
}

#[derive(Debug)]
pub struct ScoreTransaction {
    pub score: Score,
    pub tx: Arc<Transaction>,
}

impl ScoreTransaction {
    pub fn hash(&self) -> H256 {
        self.tx.hash()
    }

    pub fn new(tx: Arc<Transaction>, base_fee: U256) -> ScoreTransaction {
        let score = tx.effective_gas_price(Some(base_fee));
        ScoreTransaction { tx, score }
    }
}

impl Deref for ScoreTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

impl Clone for ScoreTransaction {
    fn clone(&self) -> Self {
        ScoreTransaction {
            score: self.score,
            tx: self.tx.clone(),
        }
    }
}

// order by nonce then by time of insertion and tie break it with hash if needed.
impl Ord for ScoreTransaction {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        other.score.cmp(&self.score).then(other.hash().cmp(&self.hash()))
    }
}

impl PartialOrd for ScoreTransaction {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoreTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for ScoreTransaction {}
