// Copyright 2020 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{
    handshake::HandshakeInfo,
    protocol::{EthMessageId, MessageId},
};
use reth_interfaces::rlpx::{Capability, DisconnectReason, RlpxTransport};
use std::{
    collections::{HashMap, HashSet},
    sync::{atomic::AtomicUsize, Arc},
    time::{Duration, Instant},
};

pub type TaskId = usize;
pub type PeerId = reth_interfaces::rlpx::PeerId;
pub type PeerCapability = HashSet<u8>; // negotiated eth protocol versions offered by the peer
pub type MessageData = Vec<u8>;

#[derive(Debug)]
pub struct InitialRequest {
    pub message_id: EthMessageId,
    pub data: MessageData,
}

impl InitialRequest {
    pub fn new(message_id: EthMessageId, data: MessageData) -> Self {
        InitialRequest { message_id, data }
    }
}

#[derive(Debug, Clone)]
pub enum Task {
    InsertPeer(HandshakeInfo),
    PenalPeer(PeerId, DisconnectReason, String),
    WaitForStatus(PeerId, MessageData),
    InitialRequest(PeerId, EthMessageId, MessageData),
    Responde(PeerId, EthMessageId, Vec<u8>),
    None,
}

#[derive(Debug)]
pub struct ErrorAct {
    penal: DisconnectReason,
    reason: String,
}

impl ErrorAct {
    pub fn new(penal: DisconnectReason, reason: String) -> Result<(), ErrorAct> {
        Err(ErrorAct { penal, reason })
    }

    pub fn new_kick(reason: String) -> Result<(), ErrorAct> {
        Err(ErrorAct {
            penal: DisconnectReason::ProtocolBreach,
            reason,
        })
    }

    /// Used for message bodies that fail to decode: malformed RLP, per the
    /// error taxonomy, is a subprotocol error rather than a plain breach.
    pub fn new_kick_generic<T>(reason: String) -> Result<T, ErrorAct> {
        Err(ErrorAct {
            penal: DisconnectReason::SubprotocolError,
            reason,
        })
    }

    pub fn penal(&self) -> DisconnectReason {
        self.penal
    }

    pub fn reason(&self) -> String {
        self.reason.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskType {
    SendMsg,
    StatusMsg,
    ResponseMsg,
    None,
}

static GLOBAL_TASK_ID: AtomicUsize = AtomicUsize::new(1);

impl Task {
    pub fn new_kick(peer: &PeerId, msg: String) -> Task {
        Task::PenalPeer(*peer, DisconnectReason::ProtocolBreach, msg)
    }

    pub fn new_kick_with_reason(peer: &PeerId, reason: DisconnectReason, msg: String) -> Task {
        Task::PenalPeer(*peer, reason, msg)
    }

    pub fn task_type(&self) -> TaskType {
        match self {
            Self::InsertPeer(_) => TaskType::SendMsg,
            Self::PenalPeer(_, _, _) => TaskType::SendMsg,
            Self::WaitForStatus(_, _) => TaskType::StatusMsg,
            Self::InitialRequest(_, _, _) => TaskType::SendMsg,
            Self::Responde(_, _, _) => TaskType::ResponseMsg,
            Self::None => TaskType::None,
        }
    }

    pub fn peer_id(&self) -> Option<PeerId> {
        match self {
            Self::InsertPeer(_) => None,
            Self::PenalPeer(peer_id, _, _) => Some(*peer_id),
            Self::WaitForStatus(peer_id, _) => Some(*peer_id),
            Self::InitialRequest(peer_id, _, _) => Some(*peer_id),
            Self::Responde(peer_id, _, _) => Some(*peer_id),
            Self::None => None,
        }
    }

    pub fn timelimit(&self) -> Option<Duration> {
        match self {
            Self::WaitForStatus(_, _) => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    pub fn new_id() -> TaskId {
        GLOBAL_TASK_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct TaskWrapper {
    task: Task,
    timestamp: Instant,
}

impl TaskWrapper {
    pub fn new(task: Task) -> TaskWrapper {
        TaskWrapper {
            task,
            timestamp: Instant::now(),
        }
    }

    pub fn timeouted(&self, now: &Instant) -> bool {
        match self.task.timelimit() {
            Some(timelimit) => self.timestamp + timelimit < *now,
            None => false,
        }
    }
}

pub struct Peer {
    tasks: HashSet<TaskId>,
    eth_protocol_version: u8,
    /// Set once the first GetPooledTransactions/Transactions traffic has
    /// told us what the peer has, so the txpool crate can avoid
    /// re-broadcasting. Populated lazily from outside the organizer.
    pub known_transactions: HashSet<reth_core::H256>,
}

impl From<&HandshakeInfo> for Peer {
    fn from(hi: &HandshakeInfo) -> Self {
        Peer {
            tasks: HashSet::new(),
            eth_protocol_version: hi.eth_protocol_version,
            known_transactions: HashSet::new(),
        }
    }
}

/// Tracks connected peers and in-flight request/response correlation.
///
/// Pre-eth/66 peers are allowed exactly one outstanding request at a time
/// (`check_response`); eth/66+ peers carry an explicit `request_id` on every
/// request/response pair (`check_response_with_task_id`), which additionally
/// verifies the response came from the same peer the request was sent to —
/// a stricter check than the wire protocol itself requires, closing off a
/// peer that answers another peer's outstanding request.
pub struct PeerOrganizer {
    peers: HashMap<PeerId, Peer>,
    pending_tasks: HashMap<TaskId, TaskWrapper>,
    transport: Arc<dyn RlpxTransport>,
}

impl PeerOrganizer {
    pub fn new(transport: Arc<dyn RlpxTransport>) -> PeerOrganizer {
        PeerOrganizer {
            peers: HashMap::new(),
            pending_tasks: HashMap::new(),
            transport,
        }
    }

    pub fn peers(&self) -> &HashMap<PeerId, Peer> {
        &self.peers
    }

    pub fn protocol_version(&self) -> u8 {
        self.transport.protocol_version()
    }

    fn free_peer(&self) -> Option<PeerId> {
        self.peers
            .iter()
            .find(|(_, peer)| peer.tasks.is_empty())
            .map(|(id, _)| *id)
    }

    pub fn schedule_to_free_peer(&mut self, request: InitialRequest) {
        if let Some(peer_id) = self.free_peer() {
            let task = Task::InitialRequest(peer_id, request.message_id, request.data);
            let task_id = Task::new_id();
            self.peers.get_mut(&peer_id).unwrap().tasks.insert(task_id);
            self.push_task(task, Some(task_id));
        } else {
            info!("No free peer to schedule task {:?} to", &request);
        }
    }

    pub fn start(&self) {
        self.transport.start();
    }

    pub fn stop(&self) {
        self.transport.stop();
    }

    pub fn tick(&mut self) -> Vec<Task> {
        let now = Instant::now();
        let mut timeouted_tasks = Vec::new();
        let mut rem_ids = Vec::new();
        for (id, task) in self.pending_tasks.iter() {
            if task.timeouted(&now) {
                timeouted_tasks.push(task.task.clone());
                rem_ids.push(*id);
            }
        }
        for rem_id in rem_ids {
            self.pending_tasks.remove(&rem_id);
        }
        timeouted_tasks
    }

    /// Pre-eth/66 response correlation: a peer may have only one
    /// outstanding request, so any reply is assumed to answer it.
    pub fn check_response(&mut self, peer: &PeerId, _message_id: MessageId) -> bool {
        let task_id = match self.peers.get_mut(peer) {
            Some(peer) => {
                if peer.tasks.len() != 1 {
                    return false;
                }
                peer.tasks.drain().next().unwrap()
            }
            None => return false,
        };
        match self.pending_tasks.remove(&task_id) {
            Some(_) => true,
            None => {
                error!("peer {:?} task {} missing from pending_tasks", peer, task_id);
                false
            }
        }
    }

    /// eth/66+ response correlation by `request_id`. Requires the request
    /// to still be pending, to have the expected task type, and to have
    /// been sent to the very peer that is now answering it.
    pub fn check_response_with_task_id(
        &mut self,
        peer: &PeerId,
        task_type: TaskType,
        task_id: &TaskId,
    ) -> bool {
        match self.pending_tasks.entry(*task_id) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let matches = entry.get().task.task_type() == task_type
                    && entry.get().task.peer_id().map_or(true, |p| p == *peer);
                if matches {
                    entry.remove();
                    if let Some(p) = self.peers.get_mut(peer) {
                        p.tasks.remove(task_id);
                    }
                }
                matches
            }
            std::collections::hash_map::Entry::Vacant(_) => false,
        }
    }

    pub fn push_task(&mut self, task: Task, task_id: Option<TaskId>) -> Option<TaskId> {
        let task_id = match &task {
            Task::InsertPeer(hi) => {
                info!("peer inserted: {:?}", hi.peer_id);
                self.peers.insert(hi.peer_id, Peer::from(hi));
                None
            }
            Task::PenalPeer(peer, penal, reason) => {
                debug!("peer {:?} penalized: {}", peer, reason);
                self.disconnect(peer, *penal);
                None
            }
            Task::WaitForStatus(peer, data) => {
                let version = self.transport.protocol_version();
                self.transport.send_message(
                    peer,
                    &eth_capability(),
                    EthMessageId::Status as u8,
                    &crate::frame::compress(data, version),
                );
                task_id
            }
            Task::InitialRequest(peer, message_id, data) => {
                let version = self.transport.protocol_version();
                self.transport.send_message(
                    peer,
                    &eth_capability(),
                    *message_id as u8,
                    &crate::frame::compress(data, version),
                );
                task_id
            }
            Task::Responde(peer, message_id, data) => {
                let version = self.transport.protocol_version();
                self.transport.send_message(
                    peer,
                    &eth_capability(),
                    *message_id as u8,
                    &crate::frame::compress(data, version),
                );
                None
            }
            Task::None => return None,
        };
        if let Some(task_id) = task_id {
            self.pending_tasks.insert(task_id, TaskWrapper::new(task));
        }
        task_id
    }

    pub fn remove_task(&mut self, task_id: &TaskId) {
        self.pending_tasks.remove(task_id);
    }

    pub fn disconnect(&mut self, peer_id: &PeerId, reason: DisconnectReason) {
        if let Some(peer) = self.peers.remove(peer_id) {
            for task_id in peer.tasks {
                self.pending_tasks.remove(&task_id);
            }
        }
        self.transport.disconnect(peer_id, reason);
    }
}

fn eth_capability() -> Capability {
    Capability { name: "eth", version: 66 }
}
