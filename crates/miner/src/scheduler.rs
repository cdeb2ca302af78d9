// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

//! Miner scheduler: decides when to assemble the next Clique block and
//! drives the assembly loop. Ticks on a dedicated OS thread, the same shape
//! the eth session scheduler uses, so the rest of the node's async runtime
//! never blocks waiting on block production.

use crate::{
    builder::{BlockBuilder, CliqueOptions, HeaderData},
    config::Config,
    error::Error,
};
use log::*;
use rand::Rng;
use reth_core::{Address, BlockId, H256};
use reth_interfaces::{
    blockchain::{Blockchain, BlockchainWriter},
    event_bus::EventBus,
    txpool::TransactionPool,
    vm::{Vm, WorldState},
};
use reth_txpool::Pool;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex,
    },
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::runtime::Handle;

enum LoopMsg {
    ChainUpdated,
    Stop,
}

/// Drives Clique block assembly. `Blockchain`/`BlockchainWriter` give it the
/// chain facade (component E), `BlockBuilder` is component F, and this type
/// is component G of the assembly pipeline.
pub struct Miner {
    config: Config,
    chain: Arc<dyn Blockchain>,
    chain_writer: Arc<dyn BlockchainWriter>,
    pool: Arc<Pool>,
    world_state: Arc<dyn WorldState>,
    vm: Arc<dyn Vm>,
    event_bus: Arc<EventBus>,
    assembling: AtomicBool,
    interrupt: Arc<AtomicBool>,
    main_loop_trigger: Mutex<Option<Sender<LoopMsg>>>,
    thread_handle: Mutex<Option<thread::JoinHandle<()>>>,
    rt: Handle,
}

impl Miner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        chain: Arc<dyn Blockchain>,
        chain_writer: Arc<dyn BlockchainWriter>,
        pool: Arc<Pool>,
        world_state: Arc<dyn WorldState>,
        vm: Arc<dyn Vm>,
        event_bus: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Miner {
            config,
            chain,
            chain_writer,
            pool,
            world_state,
            vm,
            event_bus,
            assembling: AtomicBool::new(false),
            interrupt: Arc::new(AtomicBool::new(false)),
            main_loop_trigger: Mutex::new(None),
            thread_handle: Mutex::new(None),
            rt: Handle::current(),
        })
    }

    /// Subscribes to `CHAIN_UPDATED` and starts the assembly thread.
    pub fn start(self: &Arc<Self>) {
        let (tx, rx) = channel::<LoopMsg>();
        *self.main_loop_trigger.lock().unwrap() = Some(tx.clone());

        let mut chain_updates = self.event_bus.subscribe();
        let interrupt = self.interrupt.clone();
        self.rt.spawn(async move {
            while chain_updates.recv().await.is_ok() {
                interrupt.store(true, Ordering::SeqCst);
                if tx.send(LoopMsg::ChainUpdated).is_err() {
                    break;
                }
            }
        });

        let miner = self.clone();
        let handle = thread::Builder::new()
            .name("Miner".to_string())
            .spawn(move || miner.run_loop(rx))
            .expect("expect to spawn miner thread");
        *self.thread_handle.lock().unwrap() = Some(handle);
    }

    /// Cancels any pending timer and unsubscribes. An assembly already in
    /// flight unwinds on its own at the next `interrupt` check.
    pub fn stop(&self) {
        if let Some(tx) = self.main_loop_trigger.lock().unwrap().take() {
            let _ = tx.send(LoopMsg::Stop);
        }
        if let Some(handle) = self.thread_handle.lock().unwrap().take() {
            handle.join().expect("miner thread should end gracefully");
        }
    }

    fn run_loop(&self, rx: Receiver<LoopMsg>) {
        loop {
            let delay = self.next_delay();
            match rx.recv_timeout(delay) {
                Ok(LoopMsg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(LoopMsg::ChainUpdated) | Err(RecvTimeoutError::Timeout) => {}
            }
            self.interrupt.store(false, Ordering::SeqCst);
            self.rt.block_on(self.try_assemble());
        }
    }

    /// `max(0, latestBlock.timestamp + period - now)`, plus jitter when this
    /// signer is out-of-turn for the next block.
    fn next_delay(&self) -> Duration {
        let parent = match self.chain.header(BlockId::Latest) {
            Some(header) => header,
            None => return self.config.period,
        };
        let now = now_secs();
        let base = (parent.timestamp + self.config.period.as_secs()).saturating_sub(now);
        let mut delay = Duration::from_secs(base);

        let number = parent.number + 1;
        let signer_address = self.config.signer.address();
        if !self.config.signers.is_in_turn(number, &signer_address) {
            let span = self.config.signers.signers().len() as u64 * 500;
            let jitter_ms = if span == 0 { 0 } else { rand::thread_rng().gen_range(0..span) };
            delay += Duration::from_millis(jitter_ms);
        }
        delay
    }

    /// Reentrancy guard around one call to [`Self::assemble`].
    async fn try_assemble(&self) {
        if self.assembling.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.assemble().await {
            warn!("block assembly failed: {:#}", err);
        }
        self.assembling.store(false, Ordering::SeqCst);
    }

    async fn assemble(&self) -> Result<(), Error> {
        let parent = match self.chain.header(BlockId::Latest) {
            Some(header) => header,
            None => return Ok(()),
        };
        let number = parent.number + 1;
        let signer_address = self.config.signer.address();

        if self.recently_signed(&parent, &signer_address) {
            debug!("signer {:?} recently signed, sitting out block {}", signer_address, number);
            return Ok(());
        }

        let difficulty = self.config.signers.difficulty(number, &signer_address);

        let mut gas_limit = parent.gas_limit;
        let base_fee_per_gas = if Some(number) == self.config.london_block {
            gas_limit *= reth_core::U256::from(2);
            Some(self.config.initial_base_fee)
        } else if parent.base_fee_per_gas.is_some() {
            parent.next_base_fee()
        } else {
            None
        };

        let mut builder = BlockBuilder::open(
            parent.clone(),
            HeaderData { number, difficulty, gas_limit, base_fee_per_gas, timestamp: now_secs() },
            Some(CliqueOptions {
                signer_address,
                signer_secret: self.config.signer.secret().clone(),
                signers: Arc::new(self.config.signers.clone()),
            }),
            self.world_state.clone(),
            self.vm.clone(),
        );

        let (candidates, _block_info) = self.pool.new_pending_block().await;
        let mut included: Vec<H256> = Vec::new();
        for tx in candidates {
            if self.interrupt.load(Ordering::SeqCst) {
                builder.discard();
                return Ok(());
            }
            let hash = tx.hash();
            match builder.add_transaction((*tx).clone()).await {
                Ok(()) => included.push(hash),
                Err(err) if builder.is_full() => {
                    debug!("block {} full after {}", number, err);
                    break;
                }
                Err(err) => {
                    debug!("skipping tx {:?} in block {}: {}", hash, number, err);
                }
            }
        }

        if self.interrupt.load(Ordering::SeqCst) {
            builder.discard();
            return Ok(());
        }

        let block = builder.build()?;
        let sealed_number = block.header.number;
        self.chain_writer.insert_block(block).map_err(Error::ChainPutBlock)?;
        self.pool.remove(included).await;
        info!("sealed block {}", sealed_number);
        Ok(())
    }

    /// True if `signer` sealed any of the `floor(len(signers)/2)` blocks
    /// immediately preceding `parent`.
    fn recently_signed(&self, parent: &reth_core::BlockHeader, signer: &Address) -> bool {
        let cooldown = self.config.signers.signer_cooldown();
        if cooldown <= 1 {
            return false;
        }
        let recent_headers = self.chain.header_range(BlockId::Number(parent.number), (cooldown - 1) as u64, 0, true);
        let recent_signers: Vec<Address> = recent_headers.iter().filter_map(|h| clique::recover_signer(h).ok()).collect();
        self.config.signers.is_recently_signed(&recent_signers, signer)
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
