// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use reth_core::H512;
use std::sync::Arc;

/// Node id of a connected peer: the uncompressed public key it presented
/// during the RLPx handshake.
pub type PeerId = H512;

/// A capability a peer advertised in its Hello message, e.g. `("eth", 66)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub version: u8,
}

/// Transport-level surface the wire crate drives; implemented by whatever
/// devp2p/RLPx stack actually owns the TCP sockets and handshakes. The wire
/// crate only ever sees this trait, never a concrete transport.
pub trait RlpxTransport: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn register_handler(&self, handler: Arc<dyn RlpxEventHandler>);
    fn send_message(&self, peer: &PeerId, capability: &Capability, message_id: u8, data: &[u8]);
    fn disconnect(&self, peer: &PeerId, reason: DisconnectReason);
    /// The devp2p p2p-layer version negotiated in Hello, not any eth
    /// sub-protocol version. Snappy framing is mandatory from p2p/5 on.
    fn protocol_version(&self) -> u8;
}

#[derive(Debug, Copy, Clone)]
pub enum DisconnectReason {
    ProtocolBreach,
    UselessPeer,
    Throttled,
    Timeout,
    SubprotocolError,
}

/// Inbound events the transport delivers into the wire crate's session
/// state machine.
pub trait RlpxEventHandler: Send + Sync {
    fn on_connect(&self, peer: &PeerId, capability: &Capability);
    fn on_message(&self, peer: &PeerId, capability: &Capability, message_id: u8, data: &[u8]);
    fn on_disconnect(&self, peer: &PeerId);
}

#[cfg(any(test, feature = "test_only"))]
pub mod test_double {
    use super::*;
    use parking_lot::Mutex;

    /// Records every send_message call instead of touching a socket, so
    /// session-state-machine tests can assert on what would have gone out.
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(PeerId, u8, Vec<u8>)>>,
        pub disconnected: Mutex<Vec<PeerId>>,
        pub protocol_version: u8,
    }

    impl Default for RecordingTransport {
        fn default() -> Self {
            RecordingTransport {
                sent: Mutex::new(Vec::new()),
                disconnected: Mutex::new(Vec::new()),
                protocol_version: 5,
            }
        }
    }

    impl RlpxTransport for RecordingTransport {
        fn start(&self) {}
        fn stop(&self) {}
        fn register_handler(&self, _handler: Arc<dyn RlpxEventHandler>) {}
        fn send_message(&self, peer: &PeerId, _capability: &Capability, message_id: u8, data: &[u8]) {
            self.sent.lock().push((*peer, message_id, data.to_vec()));
        }
        fn disconnect(&self, peer: &PeerId, _reason: DisconnectReason) {
            self.disconnected.lock().push(*peer);
        }
        fn protocol_version(&self) -> u8 {
            self.protocol_version
        }
    }
}
