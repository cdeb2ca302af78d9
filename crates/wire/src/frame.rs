// Copyright 2020-2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Snappy framing for eth protocol payloads (devp2p p2p/5+, mandatory for
//! every eth/6x message). One frame, no chunking: each encoded RLP payload
//! is compressed as a single snappy block before being handed to the
//! transport, and decompressed as a single block on the way back in. Peers
//! that negotiated p2p/4 or earlier never frame at all, so every call site
//! gates on the negotiated devp2p `protocol_version`.

use snap::raw::{Decoder, Encoder};

const SNAPPY_MIN_PROTOCOL_VERSION: u8 = 5;

pub fn compress(data: &[u8], protocol_version: u8) -> Vec<u8> {
    if protocol_version < SNAPPY_MIN_PROTOCOL_VERSION {
        return data.to_vec();
    }
    Encoder::new()
        .compress_vec(data)
        .expect("snap only fails on sizes that overflow usize")
}

pub fn decompress(data: &[u8], protocol_version: u8) -> Result<Vec<u8>, snap::Error> {
    if protocol_version < SNAPPY_MIN_PROTOCOL_VERSION {
        return Ok(data.to_vec());
    }
    Decoder::new().decompress_vec(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(8);
        let compressed = compress(&data, 5);
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed, 5).unwrap(), data);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decompress(&[0xff, 0xff, 0xff], 5).is_err());
    }

    #[test]
    fn below_version_5_passes_through_uncompressed() {
        let data = b"hello".to_vec();
        let framed = compress(&data, 4);
        assert_eq!(framed, data);
        assert_eq!(decompress(&framed, 4).unwrap(), data);
    }
}
