// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

mod message;
mod peer;
#[allow(clippy::module_inception)]
mod peers;

pub use peers::{PeerMsg, Peers};
