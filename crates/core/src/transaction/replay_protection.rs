// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! EIP-155 replay protection: folding a chain id into a legacy transaction's
//! signature `v` value and recovering both back out of it.

pub type SigV = u8;
pub type SigVLegacy = u64;
pub type ChainId = u64;

/// Merge chain_id and signature V into the wire `v` value.
pub fn encode(v: SigV, chain_id: Option<ChainId>) -> SigVLegacy {
    let replay: u64 = if let Some(n) = chain_id { 35 + n * 2 } else { 27 };
    v as u64 + replay
}

/// Returns the standard (0/1) v from a replay-protected legacy v.
pub fn decode_v(v: SigVLegacy) -> SigV {
    if v == 27 {
        0
    } else if v == 28 {
        1
    } else if v >= 35 {
        ((v - 1) % 2) as u8
    } else {
        4 // invalid value, signature recovery will reject it downstream
    }
}

/// Returns the chain id encoded in a replay-protected legacy v, if any.
pub fn decode_chain_id(v: SigVLegacy) -> Option<ChainId> {
    if v >= 35 {
        Some((v - 35) / 2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_chain_id() {
        let v = encode(1, Some(4));
        assert_eq!(decode_v(v), 1);
        assert_eq!(decode_chain_id(v), Some(4));
    }

    #[test]
    fn roundtrip_without_chain_id() {
        let v = encode(0, None);
        assert_eq!(decode_v(v), 0);
        assert_eq!(decode_chain_id(v), None);
    }
}
