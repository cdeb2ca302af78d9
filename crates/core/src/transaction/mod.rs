// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

mod access_list;
mod access_list_payload;
mod call_type;
mod eip1559_payload;
mod legacy_payload;
mod payload;
mod replay_protection;
mod signature;
#[cfg(any(test, feature = "test_only"))]
pub mod test_util;
mod transaction;
mod tx_type;

pub use access_list::{AccessList, AccessListItem};
pub use access_list_payload::AccessListPayload;
pub use call_type::CallType;
pub use eip1559_payload::Eip1559Payload;
pub use legacy_payload::LegacyPayload;
pub use payload::{PayloadTrait, TypePayload};
pub use replay_protection::ChainId;
pub use signature::Signature;
pub use transaction::Transaction;
pub use tx_type::TxType;
