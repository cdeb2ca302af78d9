// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use reth_core::U256;

/// Local-recovery errors from adding one transaction to an in-progress
/// block. None of these ever escape the assembly loop: the caller either
/// skips the transaction or, for `GasLimitExceeded` with little gas left,
/// marks the block full.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("tx gas_limit exceeds remaining block gas (remaining {remaining})")]
    GasLimitExceeded { remaining: U256 },
    #[error("tx nonce {tx_nonce} does not match account nonce {account_nonce}")]
    NonceMismatch { tx_nonce: u64, account_nonce: u64 },
    #[error("sender balance {balance} insufficient for cost {cost}")]
    InsufficientBalance { balance: U256, cost: U256 },
    #[error("tx max_fee_per_gas below block base fee")]
    BaseFeeTooLow,
    #[error("sender has no recoverable signature")]
    UnrecoverableSender,
    #[error("block execution reverted: {0}")]
    Revert(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("block assembly failed: {0}")]
    Build(#[from] BuilderError),
    #[error("block submission failed: {0}")]
    ChainPutBlock(anyhow::Error),
}
