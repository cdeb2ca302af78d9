// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crate::Address;
use rlp::{DecoderError, Rlp, RlpStream};

/// A transaction's `to` field: either absent (contract creation) or a
/// 20-byte recipient address. RLP-encoded the same way the field appears on
/// the wire: an empty string for creation, the raw address bytes otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    CreateContract,
    CallMessage(Address),
}

impl CallType {
    pub fn to(&self) -> Option<Address> {
        match self {
            Self::CreateContract => None,
            Self::CallMessage(addr) => Some(*addr),
        }
    }
}

impl Default for CallType {
    fn default() -> Self {
        Self::CreateContract
    }
}

impl rlp::Decodable for CallType {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.is_empty() {
            if rlp.is_data() {
                Ok(CallType::CreateContract)
            } else {
                Err(DecoderError::RlpExpectedToBeData)
            }
        } else {
            Ok(CallType::CallMessage(rlp.as_val()?))
        }
    }
}

impl rlp::Encodable for CallType {
    fn rlp_append(&self, s: &mut RlpStream) {
        match self {
            CallType::CreateContract => {
                s.append_internal(&"");
            }
            CallType::CallMessage(addr) => {
                s.append_internal(addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_create_contract() {
        let encoded = rlp::encode(&CallType::CreateContract);
        let decoded: CallType = rlp::decode(&encoded).unwrap();
        assert_eq!(decoded, CallType::CreateContract);
    }

    #[test]
    fn roundtrip_call_message() {
        let addr = Address::repeat_byte(0xab);
        let encoded = rlp::encode(&CallType::CallMessage(addr));
        let decoded: CallType = rlp::decode(&encoded).unwrap();
        assert_eq!(decoded, CallType::CallMessage(addr));
    }
}
