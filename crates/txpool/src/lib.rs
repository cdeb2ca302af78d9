// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod pool;
mod peers;

pub use pool::announcer::{Announcer, MultiAnnouncer};
pub use config::*;
pub use error::*;
pub use pool::{Pool, PendingBlock, BlockInfo};
pub use peers::Peers;
