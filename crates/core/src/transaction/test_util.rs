// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Transaction fixtures for downstream crates' tests. Every transaction
//! produced here carries a real, recoverable signature; none of this pool's
//! admission logic can be exercised honestly against a faked one.

use super::{LegacyPayload, Transaction, TypePayload};
use crate::{Address, U256};
use crypto::publickey::{Generator, KeyPair, Random};

/// Two distinct signer identities, stable for the lifetime of a test.
pub fn dummy_keypair() -> KeyPair {
    Random.generate().expect("key generation should not fail")
}

pub fn dummy_author(keypair: &KeyPair) -> Address {
    keypair.address()
}

/// A minimal signed legacy transaction, nonce/gas/price set by the caller.
pub fn signed_legacy_tx(keypair: &KeyPair, nonce: u64, gas_limit: u64, gas_price: U256) -> Transaction {
    let mut tx = Transaction {
        type_payload: TypePayload::Legacy(LegacyPayload { chain_id: None, gas_price }),
        nonce,
        gas_limit,
        ..Transaction::default()
    };
    tx.sign(keypair.secret()).expect("signing with a freshly generated key cannot fail");
    tx
}
