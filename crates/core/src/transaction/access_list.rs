// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use crate::{Address, Keccak};
use serde::{Deserialize, Serialize};

pub type AccessList = Vec<AccessListItem>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<Keccak>,
}

impl AccessListItem {
    pub fn new(address: Address, storage_keys: Vec<Keccak>) -> Self {
        Self {
            address,
            storage_keys,
        }
    }
}
