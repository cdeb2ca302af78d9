// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("transaction with this hash is already in the pool")]
    AlreadyPresent,
    #[error("transaction has no recoverable sender")]
    TxAuthorUnknown,
    #[error("account already has the maximum number of pending transactions")]
    NotInsertedTxPerAccountFull,
    #[error("pool is full and this transaction does not outbid the worst one")]
    NotInsertedPoolFullIncreaseGas,
    #[error("nonce is not greater than the account's current nonce")]
    NotInsertedWrongNonce,
    #[error("account balance cannot cover this transaction's cost")]
    NotInsertedBalanceInsufficient,
    #[error("replacement transaction does not bid at least 12.5% more gas")]
    NotReplacedIncreaseGas,
    #[error("account info is stale relative to the pool's current block")]
    InternalAccountObsolete,
    #[error("no account info available to validate this transaction against")]
    InternalAccountNotFound,
    #[error("transaction timed out waiting to be mined")]
    RemovedTxTimeout,
    #[error("transaction removed, account can no longer afford it")]
    RemovedTxUnfunded,
    #[error("transaction replaced by a higher-bidding one with the same nonce")]
    RemovedTxReplaced,
    #[error("transaction evicted to make room under the pool's size limit")]
    RemovedTxLimitHit,
    #[error("transaction removed on demand")]
    RemovedTxOnDemand,
    #[error("transaction nonce consumed by a new block")]
    OnNewBlockNonce,
}
