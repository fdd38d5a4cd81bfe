// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::print_json;
use crate::node::LedgerNode;
use anyhow::{anyhow, Result};
use cb_events::{BatchId, RequestId};
use cb_ledger::{GetAggregate, GetContext, ListContexts};
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum InspectCommands {
    /// Show the decryption context recorded for a request
    Request { request_id: RequestId },
    /// List every decryption request
    Requests,
    /// Show the encrypted aggregate handles of a batch
    Aggregate { batch_id: BatchId },
}

pub async fn execute(command: InspectCommands, node: &LedgerNode) -> Result<()> {
    match command {
        InspectCommands::Request { request_id } => {
            let context = node
                .ledger
                .send(GetContext(request_id))
                .await?
                .ok_or_else(|| anyhow!("No decryption context for {request_id}"))?;
            print_json(&context)?;
        }
        InspectCommands::Requests => {
            for (request_id, context) in node.ledger.send(ListContexts).await? {
                let state = match context.revealed {
                    Some(_) => "revealed",
                    None if context.processed => "processed",
                    None => "pending",
                };
                println!("{request_id} {} {state}", context.batch_id);
            }
        }
        InspectCommands::Aggregate { batch_id } => {
            let aggregate = node.ledger.send(GetAggregate(batch_id)).await?;
            print_json(&aggregate)?;
        }
    };

    Ok(())
}
