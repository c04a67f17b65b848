//! Normalizing a configuration into a run plan.
//!
//! A [`RunPlan`] is what the worker transport would consume: the resolved
//! configuration with its file-valued entries opened as live handles and
//! the command template rendered per worker. Launching the workers is a
//! separate component and not part of this crate.

use std::fs::File;

use anyhow::{bail, Result};
use tracing::info;

use crate::archive;
use crate::config::FleetConfig;
use crate::render_command;

/// A fully normalized configuration, ready to hand to a transport.
#[derive(Debug)]
pub struct RunPlan {
    pub config: FleetConfig,
    /// Open handle on the code archive, when one was configured.
    pub archive: Option<File>,
    /// Open handle on the read-only deploy key, when one was configured.
    pub read_key: Option<File>,
}

impl RunPlan {
    /// Open and validate the configuration's file entries.
    ///
    /// Entries absent from the configuration stay absent; nothing is
    /// opened for them.
    pub fn materialize(config: FleetConfig) -> Result<Self> {
        if config.num_clients == 0 {
            bail!("num_clients must be a positive integer");
        }
        let archive = match &config.files {
            Some(path) => Some(archive::open_tar(path)?),
            None => None,
        };
        let read_key = match &config.read_key {
            Some(path) => Some(archive::open_binary(path)?),
            None => None,
        };
        Ok(Self {
            config,
            archive,
            read_key,
        })
    }

    /// The command line each worker would run, indexed `0..num_clients`.
    ///
    /// Empty when no command template was configured.
    pub fn commands(&self) -> Vec<String> {
        match &self.config.command_str {
            Some(template) => (0..self.config.num_clients)
                .map(|index| render_command(template, index))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Run-mode entry point: normalize `config` into a plan.
pub fn prepare(config: FleetConfig) -> Result<RunPlan> {
    let plan = RunPlan::materialize(config)?;
    info!(
        "prepared run plan for {} worker(s) in {}",
        plan.config.num_clients, plan.config.base_dir
    );
    Ok(plan)
}
