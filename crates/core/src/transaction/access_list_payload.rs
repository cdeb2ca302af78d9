// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{payload::PayloadTrait, AccessList, AccessListItem, Signature, Transaction, TxType, TypePayload};
use crate::U256;
use keccak_hash::keccak;
use rlp::{DecoderError, Rlp, RlpStream};

/// EIP-2930 access-list transaction: `0x01 || rlp([chainId, nonce, gasPrice,
/// gasLimit, to, value, data, accessList, v, r, s])`.
#[derive(Debug, Clone, Default)]
pub struct AccessListPayload {
    pub chain_id: u64,
    pub gas_price: U256,
    pub access_list: AccessList,
}

pub(super) fn append_access_list(rlp: &mut RlpStream, access_list: &AccessList) {
    rlp.begin_list(access_list.len());
    for access in access_list {
        rlp.begin_list(2);
        rlp.append(&access.address);
        rlp.begin_list(access.storage_keys.len());
        for key in &access.storage_keys {
            rlp.append(key);
        }
    }
}

pub(super) fn decode_access_list(rlp: &Rlp) -> Result<AccessList, DecoderError> {
    let mut access_list = AccessList::new();
    for account in rlp.iter() {
        if account.item_count()? != 2 {
            return Err(DecoderError::Custom(
                "access list entry must have exactly two items",
            ));
        }
        access_list.push(AccessListItem::new(account.val_at(0)?, account.list_at(1)?));
    }
    Ok(access_list)
}

impl PayloadTrait for AccessListPayload {
    fn encode(tx: &Transaction, for_signature: bool) -> Vec<u8> {
        let data = match &tx.type_payload {
            TypePayload::AccessList(data) => data,
            _ => panic!("wrong payload handed to AccessListPayload::encode"),
        };
        let mut rlp = RlpStream::new();
        rlp.begin_list(if for_signature { 8 } else { 11 });
        rlp.append(&data.chain_id);
        rlp.append(&tx.nonce);
        rlp.append(&data.gas_price);
        rlp.append(&tx.gas_limit);
        rlp.append(&tx.to);
        rlp.append(&tx.value);
        rlp.append(&tx.data);
        append_access_list(&mut rlp, &data.access_list);
        if !for_signature {
            tx.signature.rlp_append(&mut rlp);
        }
        [&[TxType::AccessList as u8], rlp.as_raw()].concat()
    }

    fn decode(input: &[u8]) -> Result<Transaction, DecoderError> {
        if input.is_empty() {
            return Err(DecoderError::RlpIsTooShort);
        }
        let rlp = Rlp::new(&input[1..]);
        if rlp.item_count()? != 11 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let chain_id = rlp.val_at(0)?;
        let nonce = rlp.val_at(1)?;
        let gas_price = rlp.val_at(2)?;
        let gas_limit = rlp.val_at(3)?;
        let to = rlp.val_at(4)?;
        let value = rlp.val_at(5)?;
        let data = rlp.val_at(6)?;
        let access_list = decode_access_list(&rlp.at(7)?)?;
        let signature = Signature::new(rlp.val_at(8)?, rlp.val_at(9)?, rlp.val_at(10)?);

        Ok(Transaction::new(
            TypePayload::AccessList(AccessListPayload {
                chain_id,
                gas_price,
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
