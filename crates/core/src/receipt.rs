// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crate::{Address, Bloom, Bytes, H256, U256};
use rlp::{DecoderError, Rlp, RlpStream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl rlp::Encodable for Log {
    fn rlp_append(&self, stream: &mut RlpStream) {
        stream.begin_list(3);
        stream.append(&self.address);
        stream.append_list(&self.topics);
        stream.append(&self.data);
    }
}

impl rlp::Decodable for Log {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        Ok(Log {
            address: rlp.val_at(0)?,
            topics: rlp.list_at(1)?,
            data: rlp.val_at(2)?,
        })
    }
}

/// Post-transaction receipt. The legacy status field is a single byte
/// (0 = failure, 1 = success) rather than the pre-Byzantium intermediate
/// state root; this repo only targets post-Byzantium chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub success: bool,
    pub cumulative_gas_used: U256,
    pub logs_bloom: Bloom,
    pub logs: Vec<Log>,
}

impl rlp::Encodable for Receipt {
    fn rlp_append(&self, stream: &mut RlpStream) {
        stream.begin_list(4);
        stream.append(&(self.success as u8));
        stream.append(&self.cumulative_gas_used);
        stream.append(&self.logs_bloom);
        stream.append_list(&self.logs);
    }
}

impl rlp::Decodable for Receipt {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let success: u8 = rlp.val_at(0)?;
        Ok(Receipt {
            success: success != 0,
            cumulative_gas_used: rlp.val_at(1)?,
            logs_bloom: rlp.val_at(2)?,
            logs: rlp.list_at(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_roundtrip() {
        let receipt = Receipt {
            success: true,
            cumulative_gas_used: U256::from(21_000),
            logs_bloom: Bloom::zero(),
            logs: vec![Log {
                address: Address::repeat_byte(1),
                topics: vec![H256::repeat_byte(2)],
                data: vec![1, 2, 3],
            }],
        };
        let encoded = rlp::encode(&receipt);
        let decoded: Receipt = rlp::decode(&encoded).unwrap();
        assert_eq!(receipt, decoded);
    }
}
