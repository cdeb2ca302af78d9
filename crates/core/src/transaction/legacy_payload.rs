// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{
    payload::PayloadTrait,
    replay_protection::{self, SigVLegacy},
    Signature, Transaction, TypePayload,
};
use crate::U256;
use keccak_hash::keccak;
use rlp::{DecoderError, Rlp, RlpStream};

/// A pre-EIP-2718 transaction: no type byte, the signature `v` carries the
/// chain id per EIP-155 if the transaction opted into replay protection.
#[derive(Debug, Clone, Default)]
pub struct LegacyPayload {
    pub gas_price: U256,
    pub chain_id: Option<u64>,
}

impl PayloadTrait for LegacyPayload {
    fn encode(tx: &Transaction, for_signature: bool) -> Vec<u8> {
        let data = match &tx.type_payload {
            TypePayload::Legacy(data) => data,
            _ => panic!("wrong payload handed to LegacyPayload::encode"),
        };
        let mut rlp = RlpStream::new();
        rlp.begin_list(9);
        rlp.append(&tx.nonce);
        rlp.append(&data.gas_price);
        rlp.append(&tx.gas_limit);
        rlp.append(&tx.to);
        rlp.append(&tx.value);
        rlp.append(&tx.data);
        if for_signature {
            if let Some(chain_id) = data.chain_id {
                rlp.append(&chain_id);
                rlp.append(&0u8);
                rlp.append(&0u8);
            } else {
                rlp.append(&0u8);
                rlp.append(&0u8);
                rlp.append(&0u8);
            }
        } else {
            let mixed_v = replay_protection::encode(tx.signature.v, data.chain_id);
            rlp.append(&mixed_v);
            rlp.append(&tx.signature.r);
            rlp.append(&tx.signature.s);
        }
        rlp.out().to_vec()
    }

    fn decode(input: &[u8]) -> Result<Transaction, DecoderError> {
        let rlp = Rlp::new(input);
        if rlp.item_count()? != 9 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let nonce = rlp.val_at(0)?;
        let gas_price = rlp.val_at(1)?;
        let gas_limit = rlp.val_at(2)?;
        let to = rlp.val_at(3)?;
        let value = rlp.val_at(4)?;
        let data = rlp.val_at(5)?;
        let mixed_v: SigVLegacy = rlp.val_at(6)?;
        let r = rlp.val_at(7)?;
        let s = rlp.val_at(8)?;
        let v = replay_protection::decode_v(mixed_v);
        let chain_id = replay_protection::decode_chain_id(mixed_v);

        Ok(Transaction::new(
            TypePayload::Legacy(LegacyPayload { gas_price, chain_id }),
            Signature::new(v, r, s),
            keccak(input),
            nonce,
            gas_limit,
            to,
            value,
            data,
        ))
    }
}
