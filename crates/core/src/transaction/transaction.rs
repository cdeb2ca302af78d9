// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use super::{
    payload::PayloadTrait, AccessListPayload, CallType, Eip1559Payload, LegacyPayload, Signature,
    TxType, TypePayload,
};
use crate::{Address, Bytes, Keccak, H256, U256};
use crypto::publickey::Secret;
use keccak_hash::keccak;
use rlp::{DecoderError, Rlp, RlpStream};

/// A signed Ethereum transaction, in any of the three EIP-2718 envelope
/// shapes. Type-specific fields (gas price vs. max-fee/max-priority-fee,
/// access lists, chain id) live in `type_payload`; everything common to all
/// three shapes is a direct field here.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub type_payload: TypePayload,
    pub nonce: u64,
    pub gas_limit: u64,
    pub to: CallType,
    pub value: U256,
    pub data: Bytes,
    pub signature: Signature,
    hash: Keccak,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        type_payload: TypePayload,
        signature: Signature,
        hash: Keccak,
        nonce: u64,
        gas_limit: u64,
        to: CallType,
        value: U256,
        data: Bytes,
    ) -> Self {
        Transaction {
            type_payload,
            nonce,
            gas_limit,
            to,
            value,
            data,
            signature,
            hash,
        }
    }

    pub fn txtype(&self) -> TxType {
        self.type_payload.txtype()
    }

    pub fn hash(&self) -> Keccak {
        self.hash
    }

    pub fn chain_id(&self) -> Option<u64> {
        match &self.type_payload {
            TypePayload::Legacy(data) => data.chain_id,
            TypePayload::AccessList(data) => Some(data.chain_id),
            TypePayload::Eip1559(data) => Some(data.chain_id),
        }
    }

    /// Gas price used for ordering/admission before EIP-1559: the flat
    /// `gas_price` for legacy/access-list transactions, or the type-2
    /// `max_fee_per_gas` acting as an upper bound.
    pub fn max_fee_per_gas(&self) -> U256 {
        match &self.type_payload {
            TypePayload::Legacy(data) => data.gas_price,
            TypePayload::AccessList(data) => data.gas_price,
            TypePayload::Eip1559(data) => data.max_fee_per_gas,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> U256 {
        match &self.type_payload {
            TypePayload::Legacy(data) => data.gas_price,
            TypePayload::AccessList(data) => data.gas_price,
            TypePayload::Eip1559(data) => data.max_priority_fee_per_gas,
        }
    }

    /// `min(maxFeePerGas - baseFee, maxPriorityFeePerGas) + baseFee` for
    /// type-2 transactions, or the flat gas price for the others (with
    /// `base_fee` still enforced as a floor below which the tx is excluded).
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        let base_fee = match base_fee {
            Some(fee) => fee,
            None => return self.max_fee_per_gas(),
        };
        let max_fee = self.max_fee_per_gas();
        if max_fee < base_fee {
            return U256::zero();
        }
        let priority = self.max_priority_fee_per_gas();
        let headroom = max_fee - base_fee;
        base_fee + priority.min(headroom)
    }

    pub fn is_below_base_fee(&self, base_fee: U256) -> bool {
        self.max_fee_per_gas() < base_fee
    }

    pub fn encode(&self, for_signature: bool) -> Vec<u8> {
        TypePayload::encode(self, for_signature)
    }

    /// The hash signed over: the typed encoding with an empty signature and,
    /// for legacy transactions, the chain id appended per EIP-155.
    pub fn signing_hash(&self) -> H256 {
        keccak(self.encode(true))
    }

    pub fn sign(&mut self, secret: &Secret) -> Result<(), crypto::publickey::Error> {
        self.signature = Signature::sign(&self.signing_hash(), secret)?;
        let encoded = self.encode(false);
        self.hash = keccak(&encoded);
        Ok(())
    }

    pub fn recover_sender(&self) -> Result<Address, crypto::publickey::Error> {
        Ok(self.signature.recover_author(&self.signing_hash())?.0)
    }

    /// The sending account, recovered from the signature over `signing_hash`.
    /// `None` for an unsigned or malformed signature rather than an error,
    /// since callers generally just want to know whether a sender is usable.
    pub fn author(&self) -> Option<Address> {
        self.recover_sender().ok()
    }

    pub fn has_author(&self) -> bool {
        self.author().is_some()
    }

    /// Upper bound on what this transaction can cost the sender: value plus
    /// gas spent entirely at `max_fee_per_gas`.
    pub fn cost(&self) -> U256 {
        self.value
            .saturating_add(U256::from(self.gas_limit).saturating_mul(self.max_fee_per_gas()))
    }

    pub fn decode(input: &[u8]) -> Result<Self, DecoderError> {
        TypePayload::decode(input)
    }

    pub fn rlp_append_list(stream: &mut RlpStream, txs: &[Transaction]) {
        stream.begin_list(txs.len());
        for tx in txs {
            let encoded = tx.encode(false);
            // typed transactions are embedded as opaque byte strings; legacy
            // transactions are embedded as the raw field list itself.
            match tx.txtype() {
                TxType::Legacy => {
                    stream.append_raw(&encoded, 1);
                }
                _ => {
                    stream.append(&encoded);
                }
            };
        }
    }

    pub fn rlp_decode_list(rlp: &Rlp) -> Result<Vec<Transaction>, DecoderError> {
        let mut out = Vec::with_capacity(rlp.item_count()?);
        for item in rlp.iter() {
            let bytes = if item.is_list() {
                item.as_raw().to_vec()
            } else {
                item.data()?.to_vec()
            };
            out.push(Transaction::decode(&bytes)?);
        }
        Ok(out)
    }
}

#[cfg(any(test, feature = "test_only"))]
impl Transaction {
    /// Overrides the cached hash without re-deriving it from the encoding.
    /// Only meaningful for fixtures that want a specific, recognizable hash.
    pub fn set_hash(&mut self, hash: Keccak) {
        self.hash = hash;
    }
}

impl Default for Transaction {
    fn default() -> Self {
        let type_payload = TypePayload::Legacy(LegacyPayload::default());
        Transaction {
            type_payload,
            nonce: 0,
            gas_limit: 21_000,
            to: CallType::CreateContract,
            value: U256::zero(),
            data: Vec::new(),
            signature: Signature::default(),
            hash: Keccak::zero(),
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}
impl Eq for Transaction {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transaction_is_legacy() {
        let tx = Transaction::default();
        assert_eq!(tx.txtype(), TxType::Legacy);
    }

    #[test]
    fn eip1559_effective_price_is_capped_by_priority_fee() {
        let tx = Transaction {
            type_payload: TypePayload::Eip1559(super::super::Eip1559Payload {
                chain_id: 1,
                max_fee_per_gas: U256::from(100),
                max_priority_fee_per_gas: U256::from(2),
                access_list: vec![],
            }),
            ..Transaction::default()
        };
        // base_fee=50, headroom=50, priority=2 -> effective = 52
        assert_eq!(tx.effective_gas_price(Some(U256::from(50))), U256::from(52));
    }

    #[test]
    fn below_base_fee_is_excluded() {
        let tx = Transaction {
            type_payload: TypePayload::Eip1559(super::super::Eip1559Payload {
                chain_id: 1,
                max_fee_per_gas: U256::from(6),
                max_priority_fee_per_gas: U256::from(1),
                access_list: vec![],
            }),
            ..Transaction::default()
        };
        assert!(tx.is_below_base_fee(U256::from(7)));
    }
}
