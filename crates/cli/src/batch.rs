// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::print_json;
use crate::node::LedgerNode;
use alloy_primitives::Address;
use anyhow::Result;
use cb_events::BatchId;
use cb_ledger::{CloseBatch, GetParticipants, GetStatus, OpenBatch};
use clap::Subcommand;
use serde::Serialize;

#[derive(Subcommand, Debug)]
pub enum BatchCommands {
    /// Open the next batch
    Open,
    /// Close the open batch
    Close,
    /// Show the lifecycle state, or the participants of one batch
    Status {
        #[arg(long)]
        batch: Option<BatchId>,
    },
}

#[derive(Serialize)]
struct BatchSummary {
    batch_id: BatchId,
    participants: Vec<Address>,
}

pub async fn execute(command: BatchCommands, node: &LedgerNode, caller: Address) -> Result<()> {
    match command {
        BatchCommands::Open => {
            let batch_id = node.ledger.send(OpenBatch { caller }).await??;
            println!("{batch_id}");
        }
        BatchCommands::Close => {
            let batch_id = node.ledger.send(CloseBatch { caller }).await??;
            println!("{batch_id}");
        }
        BatchCommands::Status { batch: None } => {
            let status = node.ledger.send(GetStatus).await?;
            print_json(&status)?;
        }
        BatchCommands::Status {
            batch: Some(batch_id),
        } => {
            let participants = node.ledger.send(GetParticipants(batch_id)).await?;
            print_json(&BatchSummary {
                batch_id,
                participants,
            })?;
        }
    };

    Ok(())
}
