// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use clique::SignerSet;
use crypto::publickey::KeyPair;
use reth_core::{BlockNumber, U256};
use std::time::Duration;

/// `1_000_000_000 wei`, the base fee the first London block carries
/// regardless of the parent's gas usage (EIP-1559).
pub const INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Default Clique block period, matching the donor chain's `period: 15`.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15);

pub struct Config {
    /// Target spacing between blocks. Out-of-turn signers additionally
    /// jitter their assembly by up to `active_signers × 500ms`.
    pub period: Duration,
    /// This node's signing identity. Assembly never fires without one.
    pub signer: KeyPair,
    /// The fixed Clique authority set; `signer`'s address must be a member
    /// for any block this node produces to be accepted downstream.
    pub signers: SignerSet,
    /// Block number at which EIP-1559 activates. `None` means the chain
    /// never forks to London.
    pub london_block: Option<BlockNumber>,
    pub initial_base_fee: U256,
}

impl Config {
    pub fn new(signer: KeyPair, signers: SignerSet, london_block: Option<BlockNumber>) -> Self {
        Config {
            period: DEFAULT_PERIOD,
            signer,
            signers,
            london_block,
            initial_base_fee: U256::from(INITIAL_BASE_FEE),
        }
    }
}
