// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Clique proof-of-authority rule evaluation: signer-turn scheduling and the
//! ECDSA seal carried in a header's `extra_data` suffix. No vote-based
//! signer set changes; the signer list is fixed for the process lifetime.

use crypto::publickey::{public_to_address, recover, sign, Secret, Signature as CryptoSig};
use keccak_hash::keccak;
use reth_core::{Address, BlockHeader, BlockNumber, H256, U256};

/// Bytes of free-form vanity data before the seal in `extra_data`.
pub const EXTRA_VANITY: usize = 32;
/// Bytes of ECDSA signature appended after the vanity data.
pub const EXTRA_SEAL: usize = 65;

pub const DIFF_IN_TURN: u64 = 2;
pub const DIFF_NO_TURN: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("extra_data is {0} bytes, need at least 97 for vanity + seal")]
    ExtraDataTooShort(usize),
    #[error("signer set is empty")]
    EmptySignerSet,
    #[error("seal signature does not recover to a valid public key: {0}")]
    BadSeal(#[from] crypto::publickey::Error),
}

/// The hash a Clique seal signs over: the header's RLP encoding with the
/// seal portion of `extra_data` zeroed out.
pub fn seal_hash(header: &BlockHeader) -> Result<H256, Error> {
    if header.extra_data.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(Error::ExtraDataTooShort(header.extra_data.len()));
    }
    let mut unsealed = header.clone();
    let seal_start = unsealed.extra_data.len() - EXTRA_SEAL;
    unsealed.extra_data[seal_start..].iter_mut().for_each(|b| *b = 0);
    Ok(keccak(rlp::encode(&unsealed)))
}

/// Recovers the address that produced this header's seal.
pub fn recover_signer(header: &BlockHeader) -> Result<Address, Error> {
    if header.extra_data.len() < EXTRA_VANITY + EXTRA_SEAL {
        return Err(Error::ExtraDataTooShort(header.extra_data.len()));
    }
    let hash = seal_hash(header)?;
    let seal_start = header.extra_data.len() - EXTRA_SEAL;
    let sig = CryptoSig::from_electrum(&header.extra_data[seal_start..]);
    let public = recover(&sig, &hash)?;
    Ok(public_to_address(&public))
}

/// Signs `header` in place: `extra_data` must already carry a zeroed 65-byte
/// seal suffix (left by the block builder) for `seal_hash` to cover the
/// right bytes.
pub fn seal(header: &mut BlockHeader, secret: &Secret) -> Result<(), Error> {
    let hash = seal_hash(header)?;
    let sig = sign(secret, &hash)?;
    let seal_start = header.extra_data.len() - EXTRA_SEAL;
    header.extra_data[seal_start..].copy_from_slice(&sig.to_vec());
    Ok(())
}

/// A fixed, ordered set of authorized signers. Turn-taking and the
/// "recently signed" window are both derived from this ordering; there is
/// no support for voting signers in or out.
#[derive(Debug, Clone)]
pub struct SignerSet {
    signers: Vec<Address>,
}

impl SignerSet {
    pub fn new(mut signers: Vec<Address>) -> Result<Self, Error> {
        if signers.is_empty() {
            return Err(Error::EmptySignerSet);
        }
        signers.sort();
        signers.dedup();
        Ok(SignerSet { signers })
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn is_authorized(&self, signer: &Address) -> bool {
        self.signers.contains(signer)
    }

    /// The signer whose turn it is to produce `number`.
    pub fn in_turn_signer(&self, number: BlockNumber) -> Address {
        self.signers[(number as usize) % self.signers.len()]
    }

    pub fn is_in_turn(&self, number: BlockNumber, signer: &Address) -> bool {
        self.in_turn_signer(number) == *signer
    }

    pub fn difficulty(&self, number: BlockNumber, signer: &Address) -> U256 {
        if self.is_in_turn(number, signer) {
            U256::from(DIFF_IN_TURN)
        } else {
            U256::from(DIFF_NO_TURN)
        }
    }

    /// How many of the most recent blocks a signer must sit out between two
    /// seals: `floor(len(signers)/2) + 1`.
    pub fn signer_cooldown(&self) -> usize {
        self.signers.len() / 2 + 1
    }

    /// True if `signer` sealed one of the last `signer_cooldown()` blocks,
    /// given `recent_signers` ordered most-recent-first.
    pub fn is_recently_signed(&self, recent_signers: &[Address], signer: &Address) -> bool {
        recent_signers
            .iter()
            .take(self.signer_cooldown().saturating_sub(1))
            .any(|recent| recent == signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::publickey::{Generator, KeyPair, Random};
    use reth_core::{Bloom, Bytes, Keccak};

    fn keypair() -> KeyPair {
        Random.generate().expect("key generation should not fail")
    }

    fn header_with_extra(extra: Bytes) -> BlockHeader {
        BlockHeader {
            parent_hash: Keccak::zero(),
            ommers_hash: Keccak::zero(),
            beneficiary_address: Address::zero(),
            state_root: Keccak::zero(),
            transactions_root: Keccak::zero(),
            receipts_root: Keccak::zero(),
            logs_bloom: Bloom::zero(),
            difficulty: U256::from(2),
            number: 10,
            gas_limit: U256::from(8_000_000),
            gas_used: U256::zero(),
            timestamp: 0,
            extra_data: extra,
            mix_hash: Keccak::zero(),
            nonce: 0,
            base_fee_per_gas: None,
        }
    }

    #[test]
    fn seal_then_recover_roundtrips() {
        let kp = keypair();
        let mut header = header_with_extra(vec![0u8; EXTRA_VANITY + EXTRA_SEAL]);
        seal(&mut header, kp.secret()).unwrap();
        assert_eq!(recover_signer(&header).unwrap(), kp.address());
    }

    #[test]
    fn rejects_short_extra_data() {
        let header = header_with_extra(vec![0u8; 10]);
        assert!(matches!(recover_signer(&header), Err(Error::ExtraDataTooShort(10))));
    }

    #[test]
    fn turn_cycles_over_signer_set() {
        let signers = vec![Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3)];
        let mut sorted = signers.clone();
        sorted.sort();
        let set = SignerSet::new(signers).unwrap();
        assert_eq!(set.in_turn_signer(0), sorted[0]);
        assert_eq!(set.in_turn_signer(1), sorted[1]);
        assert_eq!(set.in_turn_signer(3), sorted[0]);
    }

    #[test]
    fn difficulty_reflects_turn() {
        let signers = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let set = SignerSet::new(signers.clone()).unwrap();
        let in_turn = set.in_turn_signer(0);
        let other = signers.iter().find(|s| **s != in_turn).unwrap();
        assert_eq!(set.difficulty(0, &in_turn), U256::from(DIFF_IN_TURN));
        assert_eq!(set.difficulty(0, other), U256::from(DIFF_NO_TURN));
    }

    #[test]
    fn recently_signed_blocks_cooldown() {
        let signers = vec![
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
        ];
        let set = SignerSet::new(signers.clone()).unwrap();
        assert_eq!(set.signer_cooldown(), 2);
        let recent = vec![signers[0]];
        assert!(set.is_recently_signed(&recent, &signers[0]));
        assert!(!set.is_recently_signed(&recent, &signers[1]));
    }
}
