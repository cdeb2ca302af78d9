// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{AccessListPayload, Eip1559Payload, LegacyPayload, Transaction, TxType};
use rlp::DecoderError;

/// Per-envelope encode/decode. Each transaction type implements this over
/// its own field set; `TypePayload` dispatches to the right impl.
pub trait PayloadTrait {
    fn encode(tx: &Transaction, for_signature: bool) -> Vec<u8>;
    fn decode(input: &[u8]) -> Result<Transaction, DecoderError>;
}

#[derive(Debug, Clone)]
pub enum TypePayload {
    Legacy(LegacyPayload),
    AccessList(AccessListPayload),
    Eip1559(Eip1559Payload),
}

impl TypePayload {
    pub fn txtype(&self) -> TxType {
        match self {
            TypePayload::Legacy(_) => TxType::Legacy,
            TypePayload::AccessList(_) => TxType::AccessList,
            TypePayload::Eip1559(_) => TxType::Eip1559,
        }
    }

    pub fn encode(tx: &Transaction, for_signature: bool) -> Vec<u8> {
        match &tx.type_payload {
            TypePayload::Legacy(_) => LegacyPayload::encode(tx, for_signature),
            TypePayload::AccessList(_) => AccessListPayload::encode(tx, for_signature),
            TypePayload::Eip1559(_) => Eip1559Payload::encode(tx, for_signature),
        }
    }

    pub fn decode(input: &[u8]) -> Result<Transaction, DecoderError> {
        match TxType::from_wire_byte(*input.first().ok_or(DecoderError::RlpIsTooShort)?) {
            Some(TxType::Legacy) => LegacyPayload::decode(input),
            Some(TxType::AccessList) => AccessListPayload::decode(input),
            Some(TxType::Eip1559) => Eip1559Payload::decode(input),
            None => Err(DecoderError::Custom("unknown transaction type byte")),
        }
    }
}
