// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::node::LedgerNode;
use anyhow::Result;
use cb_compute::RelayPending;
use cb_ledger::GetContext;
use clap::Subcommand;
use tracing::warn;

#[derive(Subcommand, Debug)]
pub enum OracleCommands {
    /// Answer every decryption request that is still waiting for the oracle
    Relay,
}

pub async fn execute(command: OracleCommands, node: &LedgerNode) -> Result<()> {
    match command {
        OracleCommands::Relay => {
            let relay = node.relay();
            let delay = node.config.oracle().relay_delay_ms;
            if delay > 0 {
                actix::clock::sleep(std::time::Duration::from_millis(delay)).await;
            }
            let delivered = relay.send(RelayPending).await??;
            if delivered.is_empty() {
                println!("no pending requests");
            }
            for request_id in delivered {
                match node.ledger.send(GetContext(request_id)).await? {
                    Some(context) => match context.revealed {
                        Some(totals) => println!(
                            "{request_id} {}: staked={} tasks={} eligible={}",
                            context.batch_id,
                            totals.total_staked,
                            totals.total_task_completions,
                            totals.total_eligible_users
                        ),
                        None => println!("{request_id} {}: rejected", context.batch_id),
                    },
                    None => warn!("{request_id} has no decryption context"),
                }
            }
        }
    };

    Ok(())
}
