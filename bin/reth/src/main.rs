// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use clique::SignerSet;
use crypto::publickey::{Generator, Random};
use ethereum_forkid::{ForkFilter, ForkHash, ForkId};
use log::*;
use reth_core::{Address, Block, BlockBody, BlockHeader, Bloom, Keccak, U256};
use reth_interfaces::{
    blockchain::{test_double::InMemoryBlockchain, Blockchain, BlockchainWriter},
    event_bus::EventBus,
    rlpx::{test_double::RecordingTransport, RlpxTransport},
    vm::{test_double::WorldStateTest, Vm, WorldState},
};
use reth_miner::Miner;
use reth_txpool::{MultiAnnouncer, Pool};
use reth_wire::{ChainStatus, Handshake, Scheduler};
use std::{
    str::FromStr,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

mod blockchain;
mod config;
mod vm;

use crate::{
    blockchain::EventPublishingBlockchain,
    config::{Config, Opts},
    vm::StubVm,
};

pub fn configure() -> Config {
    let opts = Opts::parse();
    let config: Config = std::fs::read_to_string(&opts.config)
        .ok()
        .and_then(|raw| toml::from_str(&raw).ok())
        .unwrap_or_default();
    config.apply_opts(&opts)
}

/// Collaborators the node runs against. The execution engine, persistent
/// storage and real devp2p transport are out of scope; this node wires the
/// wire scheduler and miner against the in-memory test doubles so the rest
/// of the process runs end to end.
pub struct Node {
    scheduler: Arc<Scheduler>,
    miner: Arc<Miner>,
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn genesis_block() -> Block {
    let header = BlockHeader {
        parent_hash: Keccak::zero(),
        ommers_hash: Keccak::zero(),
        beneficiary_address: Address::zero(),
        state_root: Keccak::zero(),
        transactions_root: Keccak::zero(),
        receipts_root: Keccak::zero(),
        logs_bloom: Bloom::zero(),
        difficulty: U256::from(1),
        number: 0,
        gas_limit: U256::from(8_000_000u64),
        gas_used: U256::zero(),
        timestamp: now_secs(),
        extra_data: Vec::new(),
        mix_hash: Keccak::zero(),
        nonce: 0,
        base_fee_per_gas: None,
    };
    Block { header, body: BlockBody::default() }
}

pub fn init(config: &Config) -> anyhow::Result<Node> {
    let genesis = genesis_block();
    let genesis_hash = genesis.hash();
    let event_bus = Arc::new(EventBus::default());

    let inner_chain = Arc::new(InMemoryBlockchain::new(genesis));
    let chain = Arc::new(EventPublishingBlockchain::new(inner_chain, event_bus.clone()));

    let world_state = Arc::new(WorldStateTest::new_empty());
    let vm = Arc::new(StubVm);
    let transport = Arc::new(RecordingTransport::default());

    let pool = Arc::new(Pool::new(
        Arc::new(reth_txpool::Config::default()),
        world_state.clone() as Arc<dyn WorldState>,
        Arc::new(MultiAnnouncer::new()),
    ));

    // No persisted identity for this collaborator set: the only grounded
    // KeyPair construction anywhere in the codebase is `Random.generate()`.
    let signer = Random.generate().map_err(|err| anyhow::anyhow!("failed to generate signer keypair: {}", err))?;
    let mut signer_addresses: Vec<Address> =
        config.signers.iter().map(|addr| Address::from_str(addr)).collect::<Result<_, _>>()?;
    if !signer_addresses.contains(&signer.address()) {
        signer_addresses.push(signer.address());
    }
    let signers = SignerSet::new(signer_addresses)?;

    let mut miner_config = reth_miner::Config::new(signer, signers, config.london_block);
    miner_config.period = Duration::from_secs(config.period_secs);

    let miner = Miner::new(
        miner_config,
        chain.clone() as Arc<dyn Blockchain>,
        chain.clone() as Arc<dyn BlockchainWriter>,
        pool,
        world_state as Arc<dyn WorldState>,
        vm as Arc<dyn Vm>,
        event_bus,
    );

    let fork_filter = ForkFilter::new(0u64, genesis_hash, Vec::<u64>::new());
    let handshake = Handshake::new(config.network_id, genesis_hash, fork_filter);
    let chain_status = ChainStatus {
        network_id: config.network_id,
        genesis_hash,
        best_hash: genesis_hash,
        total_difficulty: U256::from(1),
        fork_id: ForkId { hash: ForkHash([0; 4]), next: 0 },
    };
    let scheduler = Scheduler::new(transport as Arc<dyn RlpxTransport>, chain as Arc<dyn Blockchain>, handshake, chain_status);

    Ok(Node { scheduler, miner })
}

pub async fn run(node: Node) {
    node.scheduler.start();
    node.miner.start();

    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");

    node.miner.stop();
    node.scheduler.stop();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = configure();
    let level = log::Level::from_str(&config.log_level).unwrap_or(log::Level::Info);
    let _ = simple_logger::init_with_level(level);

    info!("starting reth on {}", config.listen_address);
    let node = init(&config)?;
    run(node).await;
    Ok(())
}
