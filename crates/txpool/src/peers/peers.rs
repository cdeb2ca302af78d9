// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use crate::Announcer;

use super::{
    message::{GET_POOLED_TRANSACTIONS, NEW_POOLED_TRANSACTION_HASHES, POOLED_TRANSACTIONS},
    peer::Peer,
};

use async_trait::async_trait;
use bytes::Bytes;
use rand::seq::SliceRandom;
use reth_interfaces::{
    rlpx::{PeerId, RlpxTransport},
    txpool::TransactionPool,
};
use reth_core::Transaction;
use tokio::{
    sync::{mpsc::UnboundedSender, Mutex, Notify, RwLock},
    task::JoinHandle,
};

type PeerHandle = (UnboundedSender<PeerMsg>, JoinHandle<()>);

pub struct Peers {
    peers: RwLock<HashMap<PeerId, PeerHandle>>,
    transport: Arc<dyn RlpxTransport>,
    pool: Arc<dyn TransactionPool>,
    tx_buffer: Arc<Mutex<Vec<Arc<Transaction>>>>,
    notify_tx_buffer: Arc<Notify>,
}

#[derive(Clone)]
pub enum PeerMsg {
    InboundNewPooledTxHashes(Bytes),
    InboundPooledTx(Bytes),
    InboundGetPooledTxs(Bytes),
    /// `bool` marks whether the recipient was picked into the
    /// square-root-of-unknown-peers subset that gets full bodies, rather
    /// than just a hash announcement.
    IncludedTxs(Arc<Vec<Arc<Transaction>>>, bool),
}

/// Picks roughly `sqrt(peers.len())` peers (rounded up) to receive full
/// transaction bodies; the rest only get a hash announcement and pull
/// bodies on demand. Mirrors the eth broadcast discipline used to bound
/// bandwidth while still getting new transactions to the whole network
/// quickly.
fn pick_full_body_peers(peer_ids: &[PeerId]) -> HashSet<PeerId> {
    let count = (peer_ids.len() as f64).sqrt().ceil() as usize;
    let mut shuffled = peer_ids.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled.into_iter().take(count).collect()
}

impl Peers {
    pub fn new(transport: Arc<dyn RlpxTransport>, pool: Arc<dyn TransactionPool>) -> Arc<Self> {
        let peers = Arc::new(Self {
            peers: RwLock::new(HashMap::new()),
            transport,
            pool,
            tx_buffer: Arc::new(Mutex::new(Vec::new())),
            notify_tx_buffer: Arc::new(Notify::new()),
        });

        let peers2 = peers.clone();

        tokio::task::spawn(async move {
            loop {
                // empty buffer
                let txs: Vec<_> = {
                    peers2.notify_tx_buffer.notified().await;
                    // sleep 50ms after waking up so that we can wait for new incoming tx.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    std::mem::take(peers2.tx_buffer.lock().await.as_mut())
                };
                if txs.is_empty() {
                    continue;
                }
                let txs = Arc::new(txs);

                // if there are errors on send, remove peer after sending is finished.
                let mut disconnected_peers = Vec::new();

                // iterate over all peers and send them Arc pointer to transaction list,
                // full bodies to the sqrt(peers) subset and hash announcements to the rest.
                let connected = peers2.peers.read().await;
                let peer_ids: Vec<PeerId> = connected.keys().copied().collect();
                let full_body_peers = pick_full_body_peers(&peer_ids);
                for (peer_id, (ch, _)) in connected.iter() {
                    let full_body = full_body_peers.contains(peer_id);
                    if ch.send(PeerMsg::IncludedTxs(txs.clone(), full_body)).is_err() {
                        disconnected_peers.push(*peer_id);
                    }
                }
                drop(connected);
                {
                    // remove disconnected peers from HashMap
                    if !disconnected_peers.is_empty() {
                        let mut peers = peers2.peers.write().await;
                        for dis in disconnected_peers.iter() {
                            peers.remove(dis);
                        }
                    }
                }

                // sleep when sending of new transaction is over so that we are not sending only one tx.
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });

        peers
    }

    pub async fn inbound(&self, peer_id: &PeerId, message_id: u8, data: Bytes) {
        let peer_msg = match message_id {
            NEW_POOLED_TRANSACTION_HASHES => PeerMsg::InboundNewPooledTxHashes(data),
            POOLED_TRANSACTIONS => PeerMsg::InboundPooledTx(data),
            GET_POOLED_TRANSACTIONS => PeerMsg::InboundGetPooledTxs(data),
            _ => return,
        };

        let res = if let Some(handle) = self.peers.read().await.get(peer_id) {
            handle.0.send(peer_msg)
        } else {
            let mut peer = self.peers.write().await;
            match peer.entry(*peer_id) {
                Entry::Occupied(occ) => occ.get().0.send(peer_msg),
                Entry::Vacant(vac) => vac.insert(self.new_peer(peer_id)).0.send(peer_msg),
            }
        };
        // if there is a error in sending the msg, this means that receiver is closed and we can remove peer from peers.
        if res.is_err() {
            self.peers.write().await.remove(peer_id);
        }
    }

    pub async fn disconnect_peer(&self, peer_id: &PeerId) {
        self.peers.write().await.remove(peer_id);
    }

    pub fn new_peer(&self, peer_id: &PeerId) -> PeerHandle {
        let transport = self.transport.clone();
        let pool = self.pool.clone();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PeerMsg>();
        let peer_id = *peer_id;
        let join = tokio::spawn(async move {
            let mut peer = Peer::new(peer_id, pool, transport);
            peer.run_loop(&mut rx).await
        });
        (tx, join)
    }
}

#[async_trait]
impl Announcer for Peers {
    async fn inserted(&self, tx: Arc<Transaction>) {
        self.tx_buffer.lock().await.push(tx);
        self.notify_tx_buffer.notify_one();
    }

    async fn reinserted(&self, _tx: Arc<Transaction>) {}

    async fn removed(&self, _tx: Arc<Transaction>, _error: crate::Error) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer_ids(n: usize) -> Vec<PeerId> {
        (0..n as u8).map(PeerId::repeat_byte).collect()
    }

    #[test]
    fn picks_ceil_sqrt_of_peer_count() {
        assert_eq!(pick_full_body_peers(&peer_ids(0)).len(), 0);
        assert_eq!(pick_full_body_peers(&peer_ids(1)).len(), 1);
        assert_eq!(pick_full_body_peers(&peer_ids(4)).len(), 2);
        assert_eq!(pick_full_body_peers(&peer_ids(10)).len(), 4);
    }

    #[test]
    fn picked_peers_are_a_subset_of_the_input() {
        let ids = peer_ids(9);
        let picked = pick_full_body_peers(&ids);
        assert!(picked.iter().all(|id| ids.contains(id)));
    }
}
