// Copyright 2020-2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{
    peer_organizer::{ErrorAct, PeerId, Task, TaskId},
    protocol::EthProtocolVersion,
};
use ethereum_forkid::{ForkFilter, ForkHash, ForkId};
use reth_core::{H256, U256};
use reth_interfaces::rlpx::DisconnectReason;
use rlp::{DecoderError, Rlp, RlpStream};
use std::collections::HashMap;

/// Our own chain facts, sent in every outbound STATUS message.
#[derive(Debug, Clone)]
pub struct ChainStatus {
    pub network_id: u64,
    pub genesis_hash: H256,
    pub best_hash: H256,
    pub total_difficulty: U256,
    pub fork_id: ForkId,
}

#[derive(Debug, Clone)]
pub struct Handshake {
    pub peers: HashMap<PeerId, TaskId>,
    network_id: u64,
    genesis_hash: H256,
    fork_filter: ForkFilter,
}

#[derive(Debug, Clone, Copy)]
pub struct HandshakeInfo {
    pub peer_id: PeerId,
    pub eth_protocol_version: u8,
    pub genesis_hash: H256,
    pub network_id: u64,
    pub latest_hash: H256,
    pub total_difficulty: U256,
    pub fork_id: ForkId,
}

impl Handshake {
    pub fn new(network_id: u64, genesis_hash: H256, fork_filter: ForkFilter) -> Handshake {
        Handshake {
            peers: HashMap::new(),
            network_id,
            genesis_hash,
            fork_filter,
        }
    }

    fn encode_rlp_status_msg(status: &ChainStatus) -> Vec<u8> {
        let mut rlp = RlpStream::new();
        rlp.begin_list(6);
        rlp.append(&(EthProtocolVersion::MAX.to_number() as u32));
        rlp.append(&status.network_id);
        rlp.append(&status.total_difficulty);
        rlp.append(&status.best_hash);
        rlp.append(&status.genesis_hash);
        rlp.begin_list(2);
        rlp.append(&&status.fork_id.hash.0[..]);
        rlp.append(&status.fork_id.next);
        rlp.out().to_vec()
    }

    fn decode_rlp_status_msg(data: &[u8]) -> Result<HandshakeInfo, DecoderError> {
        let rlp = Rlp::new(data);
        if rlp.item_count()? != 6 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(HandshakeInfo {
            peer_id: Default::default(),
            eth_protocol_version: rlp.val_at(0)?,
            network_id: rlp.val_at(1)?,
            total_difficulty: rlp.val_at(2)?,
            latest_hash: rlp.val_at(3)?,
            genesis_hash: rlp.val_at(4)?,
            fork_id: {
                let fork_id_rlp = rlp.at(5)?;
                let hash_bytes: Vec<u8> = fork_id_rlp.val_at(0)?;
                if hash_bytes.len() != 4 {
                    return Err(DecoderError::RlpInvalidLength);
                }
                let mut hash = [0u8; 4];
                hash.copy_from_slice(&hash_bytes);
                ForkId { hash: ForkHash(hash), next: fork_id_rlp.val_at(1)? }
            },
        })
    }

    pub fn connect_and_create_status_message(
        &mut self,
        peer: &PeerId,
        id: TaskId,
        status: &ChainStatus,
    ) -> Vec<u8> {
        self.peers.insert(*peer, id);
        Self::encode_rlp_status_msg(status)
    }

    /// The three EIP-2124 rules, in order: protocol version must be within
    /// our supported range, genesis hash must match exactly, network id
    /// must match, and finally the fork id itself must validate against our
    /// fork filter (same chain history, or a subset we haven't reached yet).
    pub fn verify_status(&self, hi: &HandshakeInfo) -> Result<(), ErrorAct> {
        if EthProtocolVersion::from_number(hi.eth_protocol_version).is_none() {
            ErrorAct::new(DisconnectReason::UselessPeer, "unsupported eth protocol version".into())?
        }
        if hi.genesis_hash != self.genesis_hash {
            ErrorAct::new(DisconnectReason::UselessPeer, "genesis hash mismatch".into())?
        }
        if hi.network_id != self.network_id {
            ErrorAct::new(DisconnectReason::SubprotocolError, "network id mismatch".into())?
        }
        if self.fork_filter.validate(hi.fork_id).is_err() {
            ErrorAct::new(DisconnectReason::SubprotocolError, "fork id rejected".into())?
        }
        Ok(())
    }

    pub fn handle_status_message(&mut self, peer: &PeerId, data: &[u8]) -> Result<Task, ErrorAct> {
        if self.peers.remove(peer).is_none() {
            return Err(ErrorAct::new_kick("unknown peer in handshake".into()).expect_err(""));
        }
        match Self::decode_rlp_status_msg(data) {
            Ok(mut hi) => {
                hi.peer_id = *peer;
                self.verify_status(&hi)?;
                Ok(Task::InsertPeer(hi))
            }
            Err(err) => Err(ErrorAct::new(DisconnectReason::SubprotocolError, format!("malformed status message: {:?}", err))
                .expect_err("")),
        }
    }

    pub fn disconnect(&mut self, peer: &PeerId) -> Option<TaskId> {
        self.peers.remove(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_forkid::ForkHash;

    fn filter() -> ForkFilter {
        ForkFilter::new(0u64, H256::zero(), Vec::<u64>::new())
    }

    fn handshake() -> Handshake {
        Handshake::new(1, H256::zero(), filter())
    }

    fn info(network_id: u64, genesis: H256, version: u8) -> HandshakeInfo {
        HandshakeInfo {
            peer_id: Default::default(),
            eth_protocol_version: version,
            genesis_hash: genesis,
            network_id,
            latest_hash: H256::zero(),
            total_difficulty: U256::zero(),
            fork_id: ForkId { hash: ForkHash([0; 4]), next: 0 },
        }
    }

    #[test]
    fn rejects_genesis_mismatch() {
        let hs = handshake();
        let bad = info(1, H256::repeat_byte(1), 66);
        let err = hs.verify_status(&bad).unwrap_err();
        assert!(matches!(err.penal(), DisconnectReason::UselessPeer));
    }

    #[test]
    fn rejects_network_id_mismatch() {
        let hs = handshake();
        let bad = info(2, H256::zero(), 66);
        let err = hs.verify_status(&bad).unwrap_err();
        assert!(matches!(err.penal(), DisconnectReason::SubprotocolError));
    }

    #[test]
    fn rejects_unsupported_version() {
        let hs = handshake();
        let bad = info(1, H256::zero(), 10);
        let err = hs.verify_status(&bad).unwrap_err();
        assert!(matches!(err.penal(), DisconnectReason::UselessPeer));
    }

    #[test]
    fn accepts_matching_status() {
        let hs = handshake();
        let good = info(1, H256::zero(), 66);
        assert!(hs.verify_status(&good).is_ok());
    }
}
