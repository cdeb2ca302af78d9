// Copyright 2020 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

pub type ProtocolIdType = [u8; 3];

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum ProtocolId {
    Eth,
}

impl ProtocolId {
    pub fn to_protocol_type(self) -> ProtocolIdType {
        match self {
            Self::Eth => *b"eth",
        }
    }
}

/// eth sub-protocol version negotiated during the devp2p handshake. 62-65
/// carry the same message ids with an ever-growing tail; 66 adds a
/// `request_id` to every request/response pair.
#[derive(Debug, Eq, PartialEq, PartialOrd, Ord, Copy, Clone)]
pub enum EthProtocolVersion {
    Eth62,
    Eth63,
    Eth64,
    Eth65,
    Eth66,
}

impl EthProtocolVersion {
    pub const MIN: EthProtocolVersion = EthProtocolVersion::Eth62;
    pub const MAX: EthProtocolVersion = EthProtocolVersion::Eth66;

    pub fn to_number(self) -> u8 {
        match self {
            Self::Eth62 => 62,
            Self::Eth63 => 63,
            Self::Eth64 => 64,
            Self::Eth65 => 65,
            Self::Eth66 => 66,
        }
    }

    pub fn from_number(number: u8) -> Option<EthProtocolVersion> {
        match number {
            62 => Some(Self::Eth62),
            63 => Some(Self::Eth63),
            64 => Some(Self::Eth64),
            65 => Some(Self::Eth65),
            66 => Some(Self::Eth66),
            _ => None,
        }
    }

    /// eth/66 prefixes GetBlockHeaders/GetBlockBodies/GetPooledTransactions/
    /// GetReceipts (and their responses) with a request id.
    pub fn uses_request_id(self) -> bool {
        self >= Self::Eth66
    }
}

/// Every message id defined across eth/62 through eth/66. A session
/// negotiated at a lower version must reject ids introduced later; see
/// `EthMessageId::introduced_in`.
#[derive(FromPrimitive, Debug, Eq, PartialEq, Copy, Clone)]
pub enum EthMessageId {
    Status = 0x00,
    NewBlockHashes = 0x01,
    Transactions = 0x02,
    GetBlockHeaders = 0x03,
    BlockHeaders = 0x04,
    GetBlockBodies = 0x05,
    BlockBodies = 0x06,
    NewBlock = 0x07,
    NewPooledTransactionHashes = 0x08,
    GetPooledTransactions = 0x09,
    PooledTransactions = 0x0a,
    GetNodeData = 0x0d,
    NodeData = 0x0e,
    GetReceipts = 0x0f,
    Receipts = 0x10,
}

impl EthMessageId {
    /// The eth/NN version that first defines this message id.
    pub fn introduced_in(&self) -> EthProtocolVersion {
        match self {
            Self::Status
            | Self::NewBlockHashes
            | Self::Transactions
            | Self::GetBlockHeaders
            | Self::BlockHeaders
            | Self::GetBlockBodies
            | Self::BlockBodies
            | Self::NewBlock
            | Self::GetNodeData
            | Self::NodeData
            | Self::GetReceipts
            | Self::Receipts => EthProtocolVersion::Eth62,
            Self::NewPooledTransactionHashes
            | Self::GetPooledTransactions
            | Self::PooledTransactions => EthProtocolVersion::Eth65,
        }
    }

    pub fn is_valid_for(&self, version: EthProtocolVersion) -> bool {
        version >= self.introduced_in()
    }

    pub fn is_response(&self) -> bool {
        matches!(
            self,
            Self::BlockHeaders | Self::BlockBodies | Self::PooledTransactions | Self::NodeData | Self::Receipts
        )
    }
}

#[derive(Debug, Copy, Clone)]
pub struct MessageId(pub EthMessageId);

impl MessageId {
    pub fn to_u8(&self) -> u8 {
        self.0 as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth65_hash_announce_codes_rejected_below_eth65() {
        assert!(!EthMessageId::NewPooledTransactionHashes.is_valid_for(EthProtocolVersion::Eth64));
        assert!(EthMessageId::NewPooledTransactionHashes.is_valid_for(EthProtocolVersion::Eth65));
    }

    #[test]
    fn core_messages_valid_since_eth62() {
        assert!(EthMessageId::Status.is_valid_for(EthProtocolVersion::Eth62));
        assert!(EthMessageId::GetReceipts.is_valid_for(EthProtocolVersion::Eth62));
    }

    #[test]
    fn eth66_requires_request_id() {
        assert!(!EthProtocolVersion::Eth65.uses_request_id());
        assert!(EthProtocolVersion::Eth66.uses_request_id());
    }
}
