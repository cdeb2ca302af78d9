// Copyright 2020 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{
    handshake::{ChainStatus, Handshake},
    peer_organizer::{ErrorAct, PeerId, PeerOrganizer, Task, TaskType},
    protocol::{EthMessageId, EthProtocolVersion, MessageId},
};
use crate::block_manager::BlockManager;
use log::*;
use reth_interfaces::{
    blockchain::Blockchain,
    rlpx::{Capability, DisconnectReason, RlpxEventHandler, RlpxTransport},
};
use std::{
    sync::{
        mpsc::{channel, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

/// Drives one devp2p/eth session set: owns the handshake state machine, the
/// peer/request bookkeeping and the block-serving logic, and ticks them on
/// a dedicated OS thread independent of whatever async runtime the rest of
/// the node uses.
pub struct Scheduler {
    handshake: Mutex<Handshake>,
    chain_status: ChainStatus,

    peer_organizer: Mutex<PeerOrganizer>,
    block_manager: BlockManager,

    main_loop_trigger: Mutex<Sender<LoopMsg>>,
    thread_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

pub enum LoopMsg {
    TrigerLoop,
    EndLoop,
}

impl Scheduler {
    pub fn new(
        transport: Arc<dyn RlpxTransport>,
        chain: Arc<dyn Blockchain>,
        handshake: Handshake,
        chain_status: ChainStatus,
    ) -> Arc<Scheduler> {
        let (tx, rx) = channel::<LoopMsg>();
        let peer_organizer = PeerOrganizer::new(transport.clone());
        let block_manager = BlockManager::new(chain);
        let org = Arc::new(Scheduler {
            peer_organizer: Mutex::new(peer_organizer),
            handshake: Mutex::new(handshake),
            chain_status,
            block_manager,
            main_loop_trigger: Mutex::new(tx),
            thread_handle: Mutex::new(None),
        });
        let org_exec = org.clone();
        *(org.thread_handle.lock().unwrap()) = Some(
            thread::Builder::new()
                .name("Scheduler".to_string())
                .spawn(move || loop {
                    match rx.recv_timeout(Duration::from_secs(1)) {
                        Err(std::sync::mpsc::RecvTimeoutError::Timeout) => (),
                        Ok(LoopMsg::TrigerLoop) => (),
                        Ok(LoopMsg::EndLoop) => break,
                        Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                    org_exec.main_loop();
                })
                .expect("Expect to run thread"),
        );
        transport.register_handler(org.clone());
        org
    }

    pub fn start(&self) {
        self.peer_organizer.lock().unwrap().start();
    }

    pub fn stop(&self) {
        let handle = {
            self.main_loop_trigger.lock().unwrap().send(LoopMsg::EndLoop).unwrap();
            self.thread_handle.lock().unwrap().take()
        };
        self.peer_organizer.lock().unwrap().stop();
        if let Some(handle) = handle {
            handle.join().expect("Expect for thread to end gracefully.");
        }
    }

    pub fn main_loop(&self) {
        let mut org = self.peer_organizer.lock().unwrap();
        let failed_tasks = org.tick();
        if !failed_tasks.is_empty() {
            info!("failed tasks: {:?}", failed_tasks);
        }
        for fail_task in failed_tasks.iter() {
            if let Task::WaitForStatus(peer, _) = fail_task {
                org.push_task(
                    Task::new_kick_with_reason(peer, DisconnectReason::Timeout, "status handshake timed out".to_string()),
                    None,
                );
            }
        }
        if !org.peers().is_empty() {
            info!("current peer count: {}", org.peers().len());
        }
    }

    fn process_eth_message(&self, id: EthMessageId, peer: &PeerId, data: &[u8], version: EthProtocolVersion) -> Result<Task, ErrorAct> {
        match id {
            EthMessageId::Status => {
                let mut handshake = self.handshake.lock().unwrap();
                if let Some(task_id) = handshake.peers.get(peer).copied() {
                    let mut org = self.peer_organizer.lock().unwrap();
                    if org.check_response_with_task_id(peer, TaskType::StatusMsg, &task_id) {
                        org.push_task(
                            handshake
                                .handle_status_message(peer, data)
                                .unwrap_or_else(|act| Task::PenalPeer(*peer, act.penal(), act.reason())),
                            None,
                        );
                    }
                }
            }
            EthMessageId::NewBlockHashes => {
                info!("got NewBlockHashes from {:?}", peer);
                return self.block_manager.api_new_block_hashes(peer, data);
            }
            EthMessageId::Transactions => {}
            EthMessageId::GetBlockHeaders => {
                return self.block_manager.api_get_block_headers(peer, data, version);
            }
            EthMessageId::BlockHeaders => {
                self.block_manager.process_block_headers(data);
            }
            EthMessageId::GetBlockBodies => {
                return self.block_manager.api_get_block_bodies(peer, data, version);
            }
            EthMessageId::BlockBodies => {
                self.block_manager.process_block_bodies(data);
            }
            EthMessageId::NewBlock => {
                return self.block_manager.api_new_block(peer, data);
            }
            EthMessageId::NewPooledTransactionHashes
            | EthMessageId::GetPooledTransactions
            | EthMessageId::PooledTransactions => {
                // handled by the txpool crate, which registers its own handler on the transport
            }
            EthMessageId::GetNodeData | EthMessageId::NodeData => {}
            EthMessageId::GetReceipts | EthMessageId::Receipts => {}
        }
        Ok(Task::None)
    }
}

impl RlpxEventHandler for Scheduler {
    fn on_connect(&self, peer: &PeerId, capability: &Capability) {
        info!("peer connected with capability {:?}", capability);
        let task_id = Task::new_id();
        let data = self
            .handshake
            .lock()
            .unwrap()
            .connect_and_create_status_message(peer, task_id, &self.chain_status);
        self.peer_organizer
            .lock()
            .unwrap()
            .push_task(Task::WaitForStatus(*peer, data), Some(task_id));
    }

    fn on_message(&self, peer: &PeerId, capability: &Capability, message_id: u8, data: &[u8]) {
        debug!("recv msg: peer={:?} id={} capability={:?}", peer, message_id, capability);
        if capability.name != "eth" {
            return;
        }
        let message_id: Option<EthMessageId> = num::FromPrimitive::from_u8(message_id);
        let message_id = match message_id {
            Some(id) => id,
            None => return,
        };
        let version = EthProtocolVersion::from_number(capability.version).unwrap_or(EthProtocolVersion::MIN);
        if !message_id.is_valid_for(version) {
            return;
        }

        if message_id.is_response() && !self.peer_organizer.lock().unwrap().check_response(peer, MessageId(message_id)) {
            return;
        }

        let protocol_version = self.peer_organizer.lock().unwrap().protocol_version();
        let data = match crate::frame::decompress(data, protocol_version) {
            Ok(data) => data,
            Err(err) => {
                warn!("peer {:?} sent malformed snappy frame: {}", peer, err);
                self.peer_organizer.lock().unwrap().push_task(
                    Task::PenalPeer(*peer, DisconnectReason::SubprotocolError, "malformed snappy frame".to_string()),
                    None,
                );
                return;
            }
        };
        let task = self.process_eth_message(message_id, peer, &data, version);
        let mut peer_org = self.peer_organizer.lock().unwrap();
        match task {
            Ok(task) => {
                peer_org.push_task(task, None);
            }
            Err(act) => {
                peer_org.push_task(Task::PenalPeer(*peer, act.penal(), act.reason()), None);
            }
        }
    }

    fn on_disconnect(&self, peer: &PeerId) {
        info!("disconnected: {:?}", peer);
        let task_id = self.handshake.lock().unwrap().disconnect(peer);
        let mut peer_org = self.peer_organizer.lock().unwrap();
        match task_id {
            Some(task_id) => peer_org.remove_task(&task_id),
            None => peer_org.disconnect(peer, DisconnectReason::ProtocolBreach),
        }
    }
}
