// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Re-exports of the EIP-2124 fork id types. Computing a `ForkHash` from a
//! genesis hash and a hardfork activation table is the `Common` collaborator's
//! job (it owns the hardfork schedule); this crate only needs the wire shape.

pub use ethereum_forkid::{ForkHash, ForkId};
