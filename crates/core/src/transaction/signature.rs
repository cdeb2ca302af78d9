// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crypto::publickey::{self, public_to_address, recover, sign, Secret, Signature as CryptoSig};
use ethereum_types::{Address, BigEndianHash, Public, H256, U256};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

pub type SigV = u8;
pub type Author = (Address, Public);

/// Components that constitute a transaction signature.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// The V field of the signature; which half of the curve our point falls in.
    pub v: SigV,
    /// The R field of the signature; helps describe the point on the curve.
    pub r: U256,
    /// The S field of the signature; helps describe the point on the curve.
    pub s: U256,
}

impl Signature {
    pub fn new(v: SigV, r: U256, s: U256) -> Self {
        Signature { v, r, s }
    }

    /// Sign the given transaction signing-hash (the hash of the RLP encoding
    /// produced with `for_signature = true`).
    pub fn sign(signing_hash: &H256, secret: &Secret) -> Result<Self, publickey::Error> {
        Ok(sign(secret, signing_hash)?.into())
    }

    pub fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.v);
        s.append(&self.r);
        s.append(&self.s);
    }

    pub fn is_zero(&self) -> bool {
        self.r.is_zero() && self.s.is_zero()
    }

    pub fn check_low_s(&self) -> Result<(), publickey::Error> {
        let crypto_sig: CryptoSig = self.into();
        if !crypto_sig.is_low_s() {
            Err(publickey::Error::InvalidSignature)
        } else {
            Ok(())
        }
    }

    pub fn recover_author(&self, hash: &H256) -> Result<Author, publickey::Error> {
        if self.is_zero() {
            return Err(publickey::Error::InvalidSignature);
        }
        let public = recover(&self.into(), &hash)?;
        let address = public_to_address(&public);
        Ok((address, public))
    }
}

impl Default for Signature {
    fn default() -> Signature {
        Signature {
            v: 4,
            r: 0.into(),
            s: 0.into(),
        }
    }
}

impl From<CryptoSig> for Signature {
    fn from(sig: CryptoSig) -> Self {
        Signature {
            v: sig.v(),
            r: sig.r().into(),
            s: sig.s().into(),
        }
    }
}

impl From<&Signature> for CryptoSig {
    fn from(sig: &Signature) -> Self {
        let r: H256 = BigEndianHash::from_uint(&sig.r);
        let s: H256 = BigEndianHash::from_uint(&sig.s);
        CryptoSig::from_rsv(&r, &s, sig.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_signature_is_zero() {
        assert!(Signature::default().is_zero());
    }

    #[test]
    fn nonzero_signature_is_not_zero() {
        let sig = Signature::new(1, U256::from(1), U256::from(1));
        assert!(!sig.is_zero());
    }
}
