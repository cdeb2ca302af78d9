// Copyright 2021 Gnosis Ltd.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Clone)]
#[clap(version = "1.0", author = "Gnosis Devs")]
#[clap(setting = clap::AppSettings::ColoredHelp)]
pub struct Opts {
    /// Sets a custom config file.
    #[clap(short, long, default_value = "default.config.toml", about = "Config file")]
    pub config: String,
    /// Address the devp2p transport listens on.
    #[clap(short, long, about = "Listen address")]
    pub listen_address: Option<String>,
    /// A level of verbosity, and can be used multiple times.
    #[clap(long, about = "Log level: trace, debug, info, warn, error")]
    pub log_level: Option<String>,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub listen_address: String,
    pub log_level: String,
    /// EIP-155 network id sent in STATUS.
    pub network_id: u64,
    /// Fixed Clique authority set, hex-encoded addresses.
    pub signers: Vec<String>,
    /// Clique block period, in seconds.
    pub period_secs: u64,
    /// Block number at which EIP-1559 activates; absent if this chain never forks to London.
    pub london_block: Option<u64>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen_address: "0.0.0.0:30303".to_string(),
            log_level: "info".to_string(),
            network_id: 4,
            signers: Vec::new(),
            period_secs: 15,
            london_block: None,
        }
    }
}

impl Config {
    /// Merges CLI overrides (`Opts`) on top of the TOML-loaded defaults.
    pub fn apply_opts(mut self, opts: &Opts) -> Self {
        if let Some(listen_address) = &opts.listen_address {
            self.listen_address = listen_address.clone();
        }
        if let Some(log_level) = &opts.log_level {
            self.log_level = log_level.clone();
        }
        self
    }
}
