// Copyright 2020 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::rlp_en_de::{
    decode_block_bodies, decode_block_headers, decode_get_block_bodies, decode_get_block_headers,
    decode_new_block, decode_new_block_hashes, decode_with_request_id, encode_block_bodies,
    encode_block_headers, encode_with_request_id,
};
use crate::{
    common_types::NewBlock,
    scheduler::peer_organizer::{ErrorAct, PeerId, Task},
    scheduler::protocol::{EthMessageId, EthProtocolVersion},
};
use reth_core::{BlockBody, BlockId, H256};
use reth_interfaces::blockchain::Blockchain;
use std::sync::Arc;

/// Serves header/body requests from the local chain and decodes the
/// announcement messages (`NewBlockHashes`, `NewBlock`) peers send us.
/// Downloading and importing the blocks those announcements point at is
/// someone else's job; this type only speaks the wire format.
pub struct BlockManager {
    chain: Arc<dyn Blockchain>,
}

impl BlockManager {
    pub fn new(chain: Arc<dyn Blockchain>) -> BlockManager {
        BlockManager { chain }
    }

    pub fn api_new_block_hashes(&self, peer: &PeerId, data: &[u8]) -> Result<Task, ErrorAct> {
        match decode_new_block_hashes(data) {
            Ok(hashes) => {
                info!("peer {:?} announced {} new block hash(es)", peer, hashes.len());
                Ok(Task::None)
            }
            Err(err) => ErrorAct::new_kick_generic(format!("invalid NewBlockHashes: {}", err)),
        }
    }

    pub fn api_get_block_headers(&self, peer: &PeerId, data: &[u8], version: EthProtocolVersion) -> Result<Task, ErrorAct> {
        let (request_id, payload) = match unwrap_request(data, version) {
            Ok(unwrapped) => unwrapped,
            Err(err) => return ErrorAct::new_kick_generic(format!("invalid GetBlockHeaders envelope: {}", err)),
        };
        match decode_get_block_headers(&payload) {
            Ok(request) => {
                let headers = self.chain.header_range(
                    request.block_id,
                    request.max_headers,
                    request.skip,
                    request.reverse,
                );
                Ok(Task::Responde(
                    *peer,
                    EthMessageId::BlockHeaders,
                    wrap_response(request_id, encode_block_headers(&headers)),
                ))
            }
            Err(err) => ErrorAct::new_kick_generic(format!("invalid GetBlockHeaders: {}", err)),
        }
    }

    fn retrieve_block_bodies(&self, hashes: &[H256]) -> Vec<BlockBody> {
        hashes
            .iter()
            .filter_map(|hash| self.chain.body(BlockId::Hash(*hash)))
            .collect()
    }

    pub fn api_get_block_bodies(&self, peer: &PeerId, data: &[u8], version: EthProtocolVersion) -> Result<Task, ErrorAct> {
        let (request_id, payload) = match unwrap_request(data, version) {
            Ok(unwrapped) => unwrapped,
            Err(err) => return ErrorAct::new_kick_generic(format!("invalid GetBlockBodies envelope: {}", err)),
        };
        match decode_get_block_bodies(&payload) {
            Ok(ref hashes) => Ok(Task::Responde(
                *peer,
                EthMessageId::BlockBodies,
                wrap_response(request_id, encode_block_bodies(&self.retrieve_block_bodies(hashes))),
            )),
            Err(err) => ErrorAct::new_kick_generic(format!("invalid GetBlockBodies: {}", err)),
        }
    }

    pub fn process_block_headers(&self, data: &[u8]) {
        match decode_block_headers(data) {
            Ok(headers) => info!("received {} block headers", headers.len()),
            Err(err) => error!("could not decode block headers: {}", err),
        }
    }

    pub fn process_block_bodies(&self, data: &[u8]) {
        match decode_block_bodies(data) {
            Ok(bodies) => info!("received {} block bodies", bodies.len()),
            Err(err) => error!("could not decode block bodies: {}", err),
        }
    }

    pub fn api_new_block(&self, peer: &PeerId, data: &[u8]) -> Result<Task, ErrorAct> {
        match decode_new_block(data) {
            Ok(NewBlock { header, .. }) => {
                info!("peer {:?} announced new block #{}", peer, header.number);
                Ok(Task::None)
            }
            Err(err) => ErrorAct::new_kick_generic(format!("invalid NewBlock: {}", err)),
        }
    }
}

/// eth/66 carries a `request_id` on every GetBlockHeaders/GetBlockBodies
/// request; earlier versions send the bare payload. `request_id` is `None`
/// below eth/66, in which case the response is sent unwrapped too.
fn unwrap_request(data: &[u8], version: EthProtocolVersion) -> Result<(Option<u64>, Vec<u8>), rlp::DecoderError> {
    if version.uses_request_id() {
        let (request_id, payload) = super::rlp_en_de::decode_with_request_id(data)?;
        Ok((Some(request_id), payload))
    } else {
        Ok((None, data.to_vec()))
    }
}

fn wrap_response(request_id: Option<u64>, payload: Vec<u8>) -> Vec<u8> {
    match request_id {
        Some(request_id) => encode_with_request_id(request_id, &payload),
        None => payload,
    }
}
