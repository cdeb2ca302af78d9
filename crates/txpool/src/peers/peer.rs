// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use bytes::Bytes;
use reth_interfaces::{
    rlpx::{PeerId, RlpxTransport},
    txpool::TransactionPool,
};
use reth_core::{transaction::TxType, Transaction, H256};
use rlp::{DecoderError, Rlp, RlpStream};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{
    message::{
        eth_capability, GET_POOLED_TRANSACTIONS, NEW_POOLED_TRANSACTION_HASHES, POOLED_TRANSACTIONS, TRANSACTIONS,
    },
    PeerMsg,
};

use anyhow::Result;

pub const MAX_KNOWN_TX: usize = 1024;

pub struct Peer {
    peer_id: PeerId,
    next_request_id: u64,
    requested: HashMap<u64, Vec<H256>>,
    known: HashSet<H256>,
    known_sorted: VecDeque<H256>,
    pool: Arc<dyn TransactionPool>,
    transport: Arc<dyn RlpxTransport>,
}

impl Peer {
    pub fn new(peer_id: PeerId, pool: Arc<dyn TransactionPool>, transport: Arc<dyn RlpxTransport>) -> Self {
        Self {
            peer_id,
            pool,
            transport,
            next_request_id: 0,
            requested: HashMap::new(),
            known: HashSet::new(),
            known_sorted: VecDeque::new(),
        }
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    // Only one public fn.
    pub async fn run_loop(&mut self, rc: &mut UnboundedReceiver<PeerMsg>) {
        //First call send known N transactions

        loop {
            let res = match rc.recv().await {
                Some(PeerMsg::InboundPooledTx(data)) => self.inbound_pooled_tx(&data).await,
                Some(PeerMsg::InboundNewPooledTxHashes(data)) => {
                    self.inbound_new_pooled_tx_hashes(&data).await
                }
                Some(PeerMsg::InboundGetPooledTxs(data)) => self.inbound_get_pooled_tx(&data).await,
                Some(PeerMsg::IncludedTxs(txs, full_body)) => self.pool_new_tx(txs, full_body).await,
                None => break,
            };
            if let Err(err) = res {
                debug!("dropping message from peer {:?}: {:?}", self.peer_id, err);
            }
        }
    }

    async fn inbound_pooled_tx(&mut self, data: &Bytes) -> Result<()> {
        let (req, mut txs) = {
            let rlp = &Rlp::new(data);
            if rlp.size() != 2 {
                return Err(DecoderError::RlpIncorrectListLen.into());
            }
            let req_id = rlp.val_at(0)?;
            let req = self
                .requested
                .remove(&req_id)
                .ok_or(DecoderError::RlpIncorrectListLen)?; // TODO make proper err

            let txs = Transaction::rlp_decode_list(&rlp.at(1)?)?;
            (req, txs)
        };

        // recover account from txs
        for tx in txs.iter_mut() {
            let _ = tx.recover_sender()?;
        }

        let mut req = req.iter();
        let got = txs.iter();
        // check if our request is matching with the one we asked
        for tx in got {
            let mut is_found = false;
            while let Some(&hash) = req.next() {
                if tx.hash() == hash {
                    is_found = true;
                    break;
                }
            }
            if !is_found {
                //tx is not the one we requested
                return Err(DecoderError::RlpIncorrectListLen.into()); //TODO add proper error
            }
        }

        let raw: Vec<Vec<u8>> = txs
            .iter()
            .map(|t| {
                self.insert_known(t.hash());
                t.encode(false)
            })
            .collect();

        let _ = self.pool.import(raw).await;

        Ok(())
    }

    async fn inbound_new_pooled_tx_hashes(&mut self, data: &Bytes) -> Result<()> {
        let hashes: Vec<H256> = Rlp::new(data).as_list()?;
        hashes.iter().for_each(|hash| self.insert_known(*hash));

        let unknown = self.pool.filter_unknown(hashes).await;
        if unknown.is_empty() {
            return Ok(());
        }

        let request_id = self.next_request_id();
        self.requested.insert(request_id, unknown.clone());

        // eth/66: GetPooledTransactions is wrapped as [request_id, [hashes...]].
        let mut rlp = RlpStream::new_list(2);
        rlp.append(&request_id);
        rlp.begin_list(unknown.len());
        for hash in unknown.iter() {
            rlp.append(hash);
        }
        self.transport.send_message(
            &self.peer_id,
            &eth_capability(),
            GET_POOLED_TRANSACTIONS,
            &rlp.out(),
        );

        Ok(())
    }

    /// mark asked transaction as known. Ask pool to find txs and send it to peer.
    async fn inbound_get_pooled_tx(&mut self, data: &Bytes) -> Result<()> {
        let rlp = Rlp::new(data);
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen.into());
        }
        let request_id: u64 = rlp.val_at(0)?;
        let hashes: Vec<H256> = rlp.list_at(1)?;

        let found: Vec<_> = self
            .pool
            .find(hashes)
            .await
            .into_iter()
            .flatten()
            .collect();

        // eth/66: PooledTransactions echoes the request_id of the request it answers.
        let mut rlp = RlpStream::new_list(2);
        rlp.append(&request_id);
        rlp.begin_unbounded_list();
        for raw in found.into_iter() {
            if let Ok(tx) = Transaction::decode(&raw) {
                self.insert_known(tx.hash());
                if tx.txtype() == TxType::Legacy {
                    rlp.append_raw(&raw, 1);
                } else {
                    rlp.append(&raw);
                }
            }
        }
        rlp.finalize_unbounded_list();
        self.transport.send_message(
            &self.peer_id,
            &eth_capability(),
            POOLED_TRANSACTIONS,
            &rlp.out(),
        );

        Ok(())
    }

    /// Broadcast discipline: peers picked by the caller as part of the
    /// square-root-of-unknown-peers subset get the full transaction bodies;
    /// everyone else only learns the hashes and pulls bodies on demand via
    /// GetPooledTransactions.
    async fn pool_new_tx(&mut self, new: Arc<Vec<Arc<Transaction>>>, full_body: bool) -> Result<()> {
        let unknown: Vec<&Arc<Transaction>> = new
            .iter()
            .filter(|tx| {
                let hash = tx.hash();
                let is_new = !self.is_known(&hash);
                if is_new {
                    self.insert_known(hash);
                }
                is_new
            })
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }

        if full_body {
            let mut rlp = RlpStream::new();
            rlp.begin_unbounded_list();
            for tx in unknown.iter() {
                let raw = tx.encode(false);
                if tx.txtype() == TxType::Legacy {
                    rlp.append_raw(&raw, 1);
                } else {
                    rlp.append(&raw);
                }
            }
            rlp.finalize_unbounded_list();
            self.transport.send_message(&self.peer_id, &eth_capability(), TRANSACTIONS, &rlp.out());
        } else {
            let mut rlp = RlpStream::new_list(unknown.len());
            for tx in unknown.iter() {
                rlp.append(&tx.hash());
            }
            self.transport.send_message(
                &self.peer_id,
                &eth_capability(),
                NEW_POOLED_TRANSACTION_HASHES,
                &rlp.out(),
            );
        }
        Ok(())
    }

    fn insert_known(&mut self, hash: H256) {
        if self.known_sorted.len() > MAX_KNOWN_TX {
            let h = self.known_sorted.pop_back().unwrap();
            self.known.remove(&h);
        }
        self.known.insert(hash);
        self.known_sorted.push_front(hash);
    }

    fn is_known(&self, hash: &H256) -> bool {
        self.known.contains(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reth_interfaces::{rlpx::test_double::RecordingTransport, txpool::test_double::RecordingPool};

    fn peer() -> (Peer, Arc<RecordingTransport>, Arc<RecordingPool>) {
        let transport = Arc::new(RecordingTransport::default());
        let pool = Arc::new(RecordingPool::default());
        let peer = Peer::new(PeerId::repeat_byte(1), pool.clone(), transport.clone());
        (peer, transport, pool)
    }

    #[tokio::test]
    async fn get_pooled_transactions_carries_request_id_and_populates_requested() {
        let (mut peer, transport, _pool) = peer();
        let hash = H256::repeat_byte(9);
        let mut rlp = RlpStream::new_list(1);
        rlp.append(&hash);
        peer.inbound_new_pooled_tx_hashes(&Bytes::from(rlp.out()))
            .await
            .unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        let (_, message_id, data) = &sent[0];
        assert_eq!(*message_id, GET_POOLED_TRANSACTIONS);

        let rlp = Rlp::new(data);
        assert_eq!(rlp.item_count().unwrap(), 2);
        let request_id: u64 = rlp.val_at(0).unwrap();
        let hashes: Vec<H256> = rlp.list_at(1).unwrap();
        assert_eq!(hashes, vec![hash]);
        assert_eq!(peer.requested.get(&request_id), Some(&vec![hash]));
    }

    #[tokio::test]
    async fn pooled_transactions_echoes_request_id_of_the_request() {
        let (mut peer, transport, _pool) = peer();
        let mut rlp = RlpStream::new_list(2);
        rlp.append(&7u64);
        rlp.begin_list(0);
        peer.inbound_get_pooled_tx(&Bytes::from(rlp.out())).await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        let (_, message_id, data) = &sent[0];
        assert_eq!(*message_id, POOLED_TRANSACTIONS);
        let rlp = Rlp::new(data);
        let request_id: u64 = rlp.val_at(0).unwrap();
        assert_eq!(request_id, 7);
    }

    #[tokio::test]
    async fn pool_new_tx_sends_full_bodies_when_picked_for_the_subset() {
        let (mut peer, transport, _pool) = peer();
        let tx = Arc::new(Transaction::default());
        peer.pool_new_tx(Arc::new(vec![tx]), true).await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, TRANSACTIONS);
    }

    #[tokio::test]
    async fn pool_new_tx_announces_hashes_when_not_picked_for_the_subset() {
        let (mut peer, transport, _pool) = peer();
        let tx = Arc::new(Transaction::default());
        peer.pool_new_tx(Arc::new(vec![tx]), false).await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, NEW_POOLED_TRANSACTION_HASHES);
    }

    #[tokio::test]
    async fn pool_new_tx_skips_already_known_transactions() {
        let (mut peer, transport, _pool) = peer();
        let tx = Arc::new(Transaction::default());
        peer.insert_known(tx.hash());
        peer.pool_new_tx(Arc::new(vec![tx]), true).await.unwrap();

        assert!(transport.sent.lock().is_empty());
    }
}
