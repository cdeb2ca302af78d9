// Copyright 2020 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

extern crate num;
#[macro_use]
extern crate num_derive;

extern crate ethereum_forkid;

#[macro_use]
extern crate log;

pub mod block_manager;
pub mod common_types;
pub mod frame;
pub mod scheduler;

pub use scheduler::Scheduler;
pub use scheduler::handshake::{ChainStatus, Handshake};

