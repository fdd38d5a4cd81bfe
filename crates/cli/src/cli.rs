// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::batch::{self, BatchCommands};
use crate::helpers::telemetry::setup_tracing;
use crate::inspect::{self, InspectCommands};
use crate::node::LedgerNode;
use crate::oracle::{self, OracleCommands};
use crate::{correct, reveal, submit};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use cb_config::{load_config, AppConfig};
use cb_events::BatchId;
use clap::{command, ArgAction, Parser, Subcommand};
use tracing::{info, instrument, Level};

#[derive(Parser, Debug)]
#[command(name = "cipherbatch")]
#[command(about = "Collect encrypted submissions in batches and reveal only their totals", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,

    /// Account the operation is performed as. Defaults to the configured owner.
    #[arg(long = "as", global = true, value_name = "ADDRESS")]
    caller: Option<Address>,

    /// Indicate error levels by adding additional `-v` arguments. Eg. `cipherbatch -vvv` will
    /// give you trace level output
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true
    )]
    pub verbose: u8,

    /// Silence all output. This argument cannot be used alongside `-v`
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "verbose",
        global = true
    )]
    quiet: bool,

    /// The node name (used for logs and open telemetry)
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Set the Open Telemetry collector grpc endpoint. Eg. http://localhost:4317
    #[arg(long = "otel", global = true)]
    pub otel: Option<String>,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,  //
                1 => Level::INFO,  // -v
                2 => Level::DEBUG, // -vv
                _ => Level::TRACE, // -vvv
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<()> {
        let config = self.load_config()?;

        setup_tracing(&config, self.log_level())?;
        info!("Config loaded from: {:?}", config.config_file());

        let caller = match self.caller {
            Some(caller) => caller,
            None => config
                .default_caller()
                .context("No caller given. Pass `--as <ADDRESS>` or configure an owner.")?,
        };

        let node = LedgerNode::load(&config).await?;
        let res = match self.command {
            Commands::Batch { command } => batch::execute(command, &node, caller).await,
            Commands::Submit {
                batch,
                participant,
                staked,
                tasks,
                eligible,
            } => {
                submit::execute(
                    &node,
                    caller,
                    batch,
                    participant.unwrap_or(caller),
                    staked,
                    tasks,
                    eligible,
                )
                .await
            }
            Commands::Correct {
                batch,
                staked,
                tasks,
                eligible_count,
            } => correct::execute(&node, caller, batch, staked, tasks, eligible_count).await,
            Commands::Reveal { batch } => reveal::execute(&node, caller, batch).await,
            Commands::Oracle { command } => oracle::execute(command, &node).await,
            Commands::Inspect { command } => inspect::execute(command, &node).await,
        };

        // Persist whatever committed even when the operation was rejected
        node.finish().await?;
        res
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        let config = load_config(&self.name(), self.config.clone(), self.otel.clone())?;
        Ok(config)
    }

    pub fn name(&self) -> String {
        // If no name is provided assume we are working with the default node
        self.name.clone().unwrap_or("_default".to_string())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Batch lifecycle commands
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },

    /// Encrypt and record a participant's values in the open batch
    Submit {
        /// The open batch
        #[arg(long)]
        batch: BatchId,

        /// Participant the values belong to. Defaults to the caller.
        #[arg(long)]
        participant: Option<Address>,

        /// Amount staked
        #[arg(long)]
        staked: u64,

        /// Number of completed tasks
        #[arg(long)]
        tasks: u64,

        /// Mark the participant as eligible
        #[arg(long)]
        eligible: bool,
    },

    /// Fold an out of band correction into a closed batch (owner only)
    Correct {
        #[arg(long)]
        batch: BatchId,

        #[arg(long)]
        staked: Option<u64>,

        #[arg(long)]
        tasks: Option<u64>,

        #[arg(long = "eligible-count")]
        eligible_count: Option<u64>,
    },

    /// Request decryption of a closed batch's totals
    Reveal {
        #[arg(long)]
        batch: BatchId,
    },

    /// Local oracle commands
    Oracle {
        #[command(subcommand)]
        command: OracleCommands,
    },

    /// Read recorded state
    Inspect {
        #[command(subcommand)]
        command: InspectCommands,
    },
}
