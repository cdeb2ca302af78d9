// Copyright 2020-2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crate::common_types::{BlockHeaderAndHash, GetBlockHeaders, NewBlock, NewBlockHash};
use reth_core::{BlockBody, BlockHeader, BlockId, BlockNumber, Receipt, Transaction, H256, U256};

use keccak_hash::keccak;
use rlp::{DecoderError, Rlp, RlpStream};

/// eth/66 wraps every request/response body in `[request_id, <payload>]`.
/// `payload` is the already-encoded message (itself a complete RLP item),
/// nested as-is rather than re-flattened.
pub fn encode_with_request_id(request_id: u64, payload: &[u8]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(2);
    stream.append(&request_id);
    stream.append_raw(payload, 1);
    stream.out().to_vec()
}

pub fn decode_with_request_id(data: &[u8]) -> Result<(u64, Vec<u8>), DecoderError> {
    let rlp = Rlp::new(data);
    if rlp.item_count()? != 2 {
        return Err(DecoderError::RlpIncorrectListLen);
    }
    let request_id = rlp.val_at(0)?;
    let payload = rlp.at(1)?.as_raw().to_vec();
    Ok((request_id, payload))
}

pub fn encode_new_block_hashes(request: &[NewBlockHash]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(request.len());
    for block in request {
        stream.begin_list(2).append(&block.hash).append(&block.number);
    }
    stream.out().to_vec()
}

pub fn decode_new_block_hashes(data: &[u8]) -> Result<Vec<NewBlockHash>, DecoderError> {
    let rlp = Rlp::new(data);
    let mut out = vec![];
    for item in rlp.iter() {
        out.push(NewBlockHash {
            hash: item.val_at(0)?,
            number: item.val_at(1)?,
        });
    }
    Ok(out)
}

pub fn encode_get_block_headers(request: &GetBlockHeaders) -> Vec<u8> {
    let mut stream = RlpStream::new_list(4);
    match request.block_id {
        BlockId::Number(number) => stream.append(&number),
        BlockId::Hash(hash) => stream.append(&hash),
        BlockId::Latest => panic!("GetBlockHeaders must reference a concrete block"),
    };
    stream.append(&request.max_headers).append(&request.skip);
    if request.reverse {
        stream.append(&1u8);
    } else {
        stream.append_empty_data();
    }
    stream.out().to_vec()
}

pub fn decode_get_block_headers(data: &[u8]) -> Result<GetBlockHeaders, DecoderError> {
    let rlp = Rlp::new(data);
    let block_id_rlp = rlp.at(0)?;
    let block_id = match block_id_rlp.size() {
        32 => BlockId::Hash(H256::from_slice(block_id_rlp.data()?)),
        _ => BlockId::Number(block_id_rlp.as_val::<BlockNumber>()?),
    };
    let max_headers = rlp.at(1)?.as_val::<u64>()?;
    let skip = rlp.at(2)?.as_val::<u64>()?;
    let reverse = rlp.at(3)?.as_val::<bool>()?;
    Ok(GetBlockHeaders::new(block_id, max_headers, skip, reverse))
}

pub fn encode_block_headers(headers: &[BlockHeader]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(headers.len());
    for header in headers {
        stream.append(header);
    }
    stream.out().to_vec()
}

pub fn decode_block_headers(data: &[u8]) -> Result<Vec<BlockHeader>, DecoderError> {
    Rlp::new(data).as_list()
}

pub fn decode_block_headers_with_hash(data: &[u8]) -> Result<Vec<BlockHeaderAndHash>, DecoderError> {
    let rlp = Rlp::new(data);
    let mut out = vec![];
    for item in rlp.iter() {
        let hash = keccak(item.as_raw());
        out.push(BlockHeaderAndHash {
            header: item.as_val()?,
            hash,
        });
    }
    Ok(out)
}

pub fn encode_get_block_bodies(hashes: &[H256]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(hashes.len());
    for hash in hashes {
        stream.append(hash);
    }
    stream.out().to_vec()
}

pub fn decode_get_block_bodies(data: &[u8]) -> Result<Vec<H256>, DecoderError> {
    Rlp::new(data).as_list()
}

fn encode_block_body(stream: &mut RlpStream, block_body: &BlockBody) {
    let block_stream = stream.begin_list(2);
    Transaction::rlp_append_list(block_stream, &block_body.transactions);
    block_stream.append_list(&block_body.ommers);
}

pub fn encode_block_bodies(block_bodies: &[BlockBody]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(block_bodies.len());
    for block_body in block_bodies {
        encode_block_body(&mut stream, block_body);
    }
    stream.out().to_vec()
}

fn decode_block_body(body: &Rlp) -> Result<BlockBody, DecoderError> {
    Ok(BlockBody {
        transactions: Transaction::rlp_decode_list(&body.at(0)?)?,
        ommers: body.list_at(1)?,
    })
}

pub fn decode_block_bodies(data: &[u8]) -> Result<Vec<BlockBody>, DecoderError> {
    let rlp = Rlp::new(data);
    let mut out = vec![];
    for body in rlp.iter() {
        out.push(decode_block_body(&body)?);
    }
    Ok(out)
}

pub fn encode_new_block(new_block: &NewBlock) -> Vec<u8> {
    let mut stream = RlpStream::new_list(2);
    let block_stream = stream.begin_list(3);
    block_stream.append(&new_block.header);
    Transaction::rlp_append_list(block_stream, &new_block.transactions);
    block_stream.append_list(&new_block.ommers);
    stream.append(&new_block.total_difficulty);
    stream.out().to_vec()
}

pub fn decode_new_block(data: &[u8]) -> Result<NewBlock, DecoderError> {
    let rlp = Rlp::new(data);
    let block = rlp.at(0)?;
    Ok(NewBlock {
        header: block.val_at(0)?,
        transactions: Transaction::rlp_decode_list(&block.at(1)?)?,
        ommers: block.list_at(2)?,
        total_difficulty: rlp.val_at(1)?,
    })
}

/// GetPooledTransactions / NewPooledTransactionHashes (eth/65): flat hash lists.
pub fn encode_hash_list(hashes: &[H256]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(hashes.len());
    for hash in hashes {
        stream.append(hash);
    }
    stream.out().to_vec()
}

pub fn decode_hash_list(data: &[u8]) -> Result<Vec<H256>, DecoderError> {
    Rlp::new(data).as_list()
}

/// PooledTransactions / Transactions: a flat list of typed transactions,
/// same envelope rules as a block body's transaction list.
pub fn encode_transactions(transactions: &[Transaction]) -> Vec<u8> {
    let mut stream = RlpStream::new();
    Transaction::rlp_append_list(&mut stream, transactions);
    stream.out().to_vec()
}

pub fn decode_transactions(data: &[u8]) -> Result<Vec<Transaction>, DecoderError> {
    Transaction::rlp_decode_list(&Rlp::new(data))
}

/// GetNodeData: hashes requested. NodeData: opaque trie node bytes, one per
/// found hash (omitted entries are simply absent, not padded with nulls).
pub fn encode_node_data(nodes: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(nodes.len());
    for node in nodes {
        stream.append(node);
    }
    stream.out().to_vec()
}

pub fn decode_node_data(data: &[u8]) -> Result<Vec<Vec<u8>>, DecoderError> {
    Rlp::new(data).as_list()
}

/// GetReceipts: block hashes. Receipts: one receipt list per block found.
pub fn encode_receipts(receipts_per_block: &[Vec<Receipt>]) -> Vec<u8> {
    let mut stream = RlpStream::new_list(receipts_per_block.len());
    for receipts in receipts_per_block {
        stream.append_list(receipts);
    }
    stream.out().to_vec()
}

pub fn decode_receipts(data: &[u8]) -> Result<Vec<Vec<Receipt>>, DecoderError> {
    let rlp = Rlp::new(data);
    let mut out = vec![];
    for item in rlp.iter() {
        out.push(item.as_list()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_block_hashes_roundtrip() {
        let request = vec![
            NewBlockHash::new(H256::repeat_byte(0x10), 42),
            NewBlockHash::new(H256::repeat_byte(0x22), 13),
        ];
        let encoded = encode_new_block_hashes(&request);
        let decoded = decode_new_block_hashes(&encoded).unwrap();
        assert_eq!(request, decoded);
    }

    #[test]
    fn test_encode_get_block_headers() {
        let request = GetBlockHeaders::new(BlockId::Number(1024), 128u64, 0u64, true);
        let encoded = encode_get_block_headers(&request);
        assert_eq!(encoded, [0xc7, 0x82, 0x04, 0x00, 0x81, 0x80, 0x80, 0x01]);
        let request = GetBlockHeaders::new(BlockId::Number(4096), 1u64, 10, false);
        let encoded = encode_get_block_headers(&request);
        assert_eq!(encoded, [0xc6, 0x82, 0x10, 0x00, 0x01, 0x0a, 0x80]);
    }

    #[test]
    fn test_decode_get_block_headers_with_hash_as_id() {
        let data: Vec<u8> = vec![
            228, 160, 229, 229, 95, 194, 152, 198, 135, 130, 236, 183, 27, 149, 246, 32, 35, 98,
            190, 1, 185, 199, 112, 109, 151, 50, 226, 8, 58, 130, 147, 155, 184, 73, 1, 128, 128,
        ];
        let expected_hash = BlockId::Hash(H256::from_slice(&data[2..34]));
        let expected = GetBlockHeaders::new(expected_hash, 1, 0, false);
        let decoded = decode_get_block_headers(&data).unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_get_block_headers_roundtrip() {
        let test_cases = vec![
            GetBlockHeaders::new(BlockId::Number(2283397), 100, 0, false),
            GetBlockHeaders::new(BlockId::Number(2700031), 1024, 8, true),
            GetBlockHeaders::new(BlockId::Hash(H256::repeat_byte(0x22)), 10, 1, false),
        ];
        for test_case in test_cases {
            let encoded = encode_get_block_headers(&test_case.clone());
            let decoded = decode_get_block_headers(&encoded).unwrap();
            assert_eq!(test_case, decoded);
        }
    }

    #[test]
    fn test_block_body_roundtrip() {
        let tx = Transaction::default();
        let block_body = BlockBody {
            transactions: vec![tx],
            ommers: vec![],
        };
        let encoded = encode_block_bodies(&[block_body.clone()]);
        let decoded = decode_block_bodies(&encoded).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].transactions.len(), 1);
    }

    #[test]
    fn test_hash_list_roundtrip() {
        let hashes = vec![H256::repeat_byte(1), H256::repeat_byte(2)];
        let encoded = encode_hash_list(&hashes);
        assert_eq!(decode_hash_list(&encoded).unwrap(), hashes);
    }

    #[test]
    fn test_request_id_envelope_roundtrip() {
        let hashes = vec![H256::repeat_byte(1), H256::repeat_byte(2)];
        let payload = encode_hash_list(&hashes);
        let wrapped = encode_with_request_id(1337, &payload);
        let (request_id, unwrapped) = decode_with_request_id(&wrapped).unwrap();
        assert_eq!(request_id, 1337);
        assert_eq!(decode_hash_list(&unwrapped).unwrap(), hashes);
    }

    #[test]
    fn test_request_id_envelope_rejects_wrong_arity() {
        let mut stream = RlpStream::new_list(3);
        stream.append(&1u64).append(&2u8).append(&3u8);
        assert!(decode_with_request_id(&stream.out()).is_err());
    }
}
