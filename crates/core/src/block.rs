// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crate::{Address, Bloom, BlockNumber, Bytes, Keccak, Transaction, H256, U256};
use rlp::{DecoderError, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Field order matches the canonical RLP encoding of a block header:
/// https://ethereum.stackexchange.com/questions/268/ethereum-block-architecture
#[derive(Debug, Eq, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_hash: Keccak,
    pub ommers_hash: Keccak,
    pub beneficiary_address: Address,
    pub state_root: Keccak,
    pub transactions_root: Keccak,
    pub receipts_root: Keccak,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: BlockNumber,
    pub gas_limit: U256,
    pub gas_used: U256,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: Keccak,
    pub nonce: u64,
    /// EIP-1559. Absent before London activation.
    pub base_fee_per_gas: Option<U256>,
}

/// Denominator bounding how much the base fee can move between two
/// consecutive blocks (EIP-1559).
const BASE_FEE_MAX_CHANGE_DENOMINATOR: u64 = 8;
/// Target gas usage is half of `gas_limit`; EIP-1559 expresses the delta as
/// a fraction of the distance between `gas_used` and that target.
const ELASTICITY_MULTIPLIER: u64 = 2;

impl BlockHeader {
    pub fn hash(&self) -> Keccak {
        keccak_hash::keccak(rlp::encode(self))
    }

    /// The base fee this header's child block must carry, per EIP-1559.
    /// `None` if `self` predates London (no base fee to extrapolate from).
    pub fn next_base_fee(&self) -> Option<U256> {
        let base_fee = self.base_fee_per_gas?;
        let gas_target = self.gas_limit / ELASTICITY_MULTIPLIER;
        if gas_target.is_zero() {
            return Some(base_fee);
        }
        Some(if self.gas_used == gas_target {
            base_fee
        } else if self.gas_used > gas_target {
            let delta = base_fee * (self.gas_used - gas_target) / gas_target
                / BASE_FEE_MAX_CHANGE_DENOMINATOR;
            base_fee + delta.max(U256::one())
        } else {
            let delta = base_fee * (gas_target - self.gas_used) / gas_target
                / BASE_FEE_MAX_CHANGE_DENOMINATOR;
            base_fee.saturating_sub(delta)
        })
    }
}

/// 15 fields pre-London, 16 once a base fee is carried. The extra field is
/// appended rather than interleaved so that pre-London decoders (ommers in
/// old bodies, e.g.) never need to know about it.
impl rlp::Encodable for BlockHeader {
    fn rlp_append(&self, stream: &mut RlpStream) {
        let field_count = if self.base_fee_per_gas.is_some() { 16 } else { 15 };
        stream.begin_list(field_count);
        stream
            .append(&self.parent_hash)
            .append(&self.ommers_hash)
            .append(&self.beneficiary_address)
            .append(&self.state_root)
            .append(&self.transactions_root)
            .append(&self.receipts_root)
            .append(&self.logs_bloom)
            .append(&self.difficulty)
            .append(&self.number)
            .append(&self.gas_limit)
            .append(&self.gas_used)
            .append(&self.timestamp)
            .append(&self.extra_data)
            .append(&self.mix_hash)
            .append(&self.nonce);
        if let Some(base_fee) = self.base_fee_per_gas {
            stream.append(&base_fee);
        }
    }
}

impl rlp::Decodable for BlockHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let field_count = rlp.item_count()?;
        if field_count != 15 && field_count != 16 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(BlockHeader {
            parent_hash: rlp.val_at(0)?,
            ommers_hash: rlp.val_at(1)?,
            beneficiary_address: rlp.val_at(2)?,
            state_root: rlp.val_at(3)?,
            transactions_root: rlp.val_at(4)?,
            receipts_root: rlp.val_at(5)?,
            logs_bloom: rlp.val_at(6)?,
            difficulty: rlp.val_at(7)?,
            number: rlp.val_at(8)?,
            gas_limit: rlp.val_at(9)?,
            gas_used: rlp.val_at(10)?,
            timestamp: rlp.val_at(11)?,
            extra_data: rlp.val_at(12)?,
            mix_hash: rlp.val_at(13)?,
            nonce: rlp.val_at(14)?,
            base_fee_per_gas: if field_count == 16 {
                Some(rlp.val_at(15)?)
            } else {
                None
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockBody {
    pub transactions: Vec<Transaction>,
    pub ommers: Vec<BlockHeader>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn hash(&self) -> Keccak {
        self.header.hash()
    }
}

/// A reference to a block, either by its canonical number or by hash.
/// `Latest` is only ever used locally (e.g. as a chain-facade query) and is
/// never placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockId {
    Number(BlockNumber),
    Hash(H256),
    Latest,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            parent_hash: Keccak::repeat_byte(0x11),
            ommers_hash: Keccak::repeat_byte(0x22),
            beneficiary_address: Address::repeat_byte(0x33),
            state_root: Keccak::repeat_byte(0x44),
            transactions_root: Keccak::repeat_byte(0x55),
            receipts_root: Keccak::repeat_byte(0x66),
            logs_bloom: Bloom::zero(),
            difficulty: U256::from(2),
            number: 42,
            gas_limit: U256::from(8_000_000),
            gas_used: U256::from(21_000),
            timestamp: 1_600_000_000,
            extra_data: vec![0xde, 0xad],
            mix_hash: Keccak::repeat_byte(0x77),
            nonce: 0,
            base_fee_per_gas: None,
        }
    }

    #[test]
    fn header_roundtrip_pre_london() {
        let header = sample_header();
        let encoded = rlp::encode(&header);
        let decoded: BlockHeader = rlp::decode(&encoded).unwrap();
        assert_eq!(header, decoded);
        assert_eq!(rlp::Rlp::new(&encoded).item_count().unwrap(), 15);
    }

    #[test]
    fn header_roundtrip_with_base_fee() {
        let mut header = sample_header();
        header.base_fee_per_gas = Some(U256::from(1_000_000_000u64));
        let encoded = rlp::encode(&header);
        let decoded: BlockHeader = rlp::decode(&encoded).unwrap();
        assert_eq!(header, decoded);
        assert_eq!(rlp::Rlp::new(&encoded).item_count().unwrap(), 16);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let mut stream = RlpStream::new_list(3);
        stream.append(&1u8).append(&2u8).append(&3u8);
        let err = rlp::decode::<BlockHeader>(&stream.out()).unwrap_err();
        assert_eq!(err, DecoderError::RlpIncorrectListLen);
    }

    #[test]
    fn next_base_fee_holds_steady_at_target() {
        let mut header = sample_header();
        header.gas_limit = U256::from(20_000_000);
        header.gas_used = U256::from(10_000_000);
        header.base_fee_per_gas = Some(U256::from(1_000_000_000u64));
        assert_eq!(header.next_base_fee(), header.base_fee_per_gas);
    }

    #[test]
    fn next_base_fee_rises_above_target() {
        let mut header = sample_header();
        header.gas_limit = U256::from(20_000_000);
        header.gas_used = U256::from(20_000_000);
        header.base_fee_per_gas = Some(U256::from(1_000_000_000u64));
        assert!(header.next_base_fee().unwrap() > header.base_fee_per_gas.unwrap());
    }

    #[test]
    fn next_base_fee_falls_below_target() {
        let mut header = sample_header();
        header.gas_limit = U256::from(20_000_000);
        header.gas_used = U256::zero();
        header.base_fee_per_gas = Some(U256::from(1_000_000_000u64));
        assert!(header.next_base_fee().unwrap() < header.base_fee_per_gas.unwrap());
    }

    #[test]
    fn next_base_fee_absent_pre_london() {
        assert_eq!(sample_header().next_base_fee(), None);
    }
}
