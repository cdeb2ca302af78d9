// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

#[macro_use]
extern crate log;

pub mod builder;
pub mod config;
pub mod error;
pub mod scheduler;

pub use builder::{BlockBuilder, CliqueOptions, HeaderData};
pub use config::Config;
pub use error::{BuilderError, Error};
pub use scheduler::Miner;
