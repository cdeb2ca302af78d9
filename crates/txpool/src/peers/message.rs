// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! The eth sub-protocol message ids this crate cares about. Kept as bare
//! constants rather than depending on the wire crate's own message enum, so
//! the pool stays usable without pulling in session/handshake machinery.

use reth_interfaces::rlpx::Capability;

pub const TRANSACTIONS: u8 = 0x02;
pub const NEW_POOLED_TRANSACTION_HASHES: u8 = 0x08;
pub const GET_POOLED_TRANSACTIONS: u8 = 0x09;
pub const POOLED_TRANSACTIONS: u8 = 0x0a;

pub fn eth_capability() -> Capability {
    Capability { name: "eth", version: 66 }
}
