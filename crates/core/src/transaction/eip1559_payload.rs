// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{
    access_list_payload::{append_access_list, decode_access_list},
    payload::PayloadTrait,
    AccessList, Signature, Transaction, TxType, TypePayload,
};
use crate::U256;
use keccak_hash::keccak;
use rlp::{DecoderError, Rlp, RlpStream};

/// EIP-1559 dynamic-fee transaction: `0x02 || rlp([chainId, nonce,
/// maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data,
/// accessList, v, r, s])`.
#[derive(Debug, Clone, Default)]
pub struct Eip1559Payload {
    pub chain_id: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub access_list: AccessList,
}

impl PayloadTrait for Eip1559Payload {
    fn encode(tx: &Transaction, for_signature: bool) -> Vec<u8> {
        let data = match &tx.type_payload {
            TypePayload::Eip1559(data) => data,
            _ => panic!("wrong payload handed to Eip1559Payload::encode"),
        };
        let mut rlp = RlpStream::new();
        rlp.begin_list(if for_signature { 9 } else { 12 });
        rlp.append(&data.chain_id);
        rlp.append(&tx.nonce);
        rlp.append(&data.max_priority_fee_per_gas);
        rlp.append(&data.max_fee_per_gas);
        rlp.append(&tx.gas_limit);
        rlp.append(&tx.to);
        rlp.append(&tx.value);
        rlp.append(&tx.data);
        append_access_list(&mut rlp, &data.access_list);
        if !for_signature {
            tx.signature.rlp_append(&mut rlp);
        }
        [&[TxType::Eip1559 as u8], rlp.as_raw()].concat()
    }

    fn decode(input: &[u8]) -> Result<Transaction, DecoderError> {
        if input.is_empty() {
            return Err(DecoderError::RlpIsTooShort);
        }
        let rlp = Rlp::new(&input[1..]);
        if rlp.item_count()? != 12 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let chain_id = rlp.val_at(0)?;
        let nonce = rlp.val_at(1)?;
        let max_priority_fee_per_gas = rlp.val_at(2)?;
        let max_fee_per_gas = rlp.val_at(3)?;
        let gas_limit = rlp.val_at(4)?;
        let to = rlp.val_at(5)?;
        let value = rlp.val_at(6)?;
        let data = rlp.val_at(7)?;
        let access_list = decode_access_list(&rlp.at(8)?)?;
        let signature = Signature::new(rlp.val_at(9)?, rlp.val_at(10)?, rlp.val_at(11)?);

        Ok(Transaction::new(
            TypePayload::Eip1559(Eip1559Payload {
                chain_id,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                access_list,
            }),
            signature,
            keccak(input),
            nonce,
            gas_limit,
            to,
            value,
            data,
        ))
    }
}
