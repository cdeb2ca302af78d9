// Copyright 2020 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

pub mod handshake;
pub mod peer_organizer;
pub mod protocol;
pub mod scheduler;

pub use handshake::{ChainStatus, Handshake};
pub use peer_organizer::PeerOrganizer;
pub use scheduler::Scheduler;
