// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// When doing shift by 3 you get value increased by 12.5%
pub const BUMP_SCORE_BY_12_5_PERC: usize = 3;

/// max amount of transactions that we will keep before we recreate binary heap.
/// Recreating of binary heap is expensive and this is optimization.
pub const MAX_PENDING_TX_REMOVALS: usize = 100;

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Config {
    /// global transaction cap across all accounts
    pub max: usize,
    /// per-account transaction cap
    pub per_account: usize,
    /// how long an unmined transaction may sit in the pool before it is
    /// swept out by the periodic stall check
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max: 4096,
            per_account: 16,
            timeout: Duration::from_secs(3 * 60 * 60),
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
