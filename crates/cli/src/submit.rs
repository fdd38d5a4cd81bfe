// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::node::LedgerNode;
use alloy_primitives::Address;
use anyhow::Result;
use cb_events::BatchId;
use cb_ledger::{EncryptedFields, Submit};

pub async fn execute(
    node: &LedgerNode,
    caller: Address,
    batch_id: BatchId,
    participant: Address,
    staked: u64,
    tasks: u64,
    eligible: bool,
) -> Result<()> {
    let fields = EncryptedFields {
        staked: node.coprocessor.encrypt_u64(staked)?,
        tasks: node.coprocessor.encrypt_u64(tasks)?,
        eligible: node.coprocessor.encrypt_flag(eligible)?,
    };
    let overwritten = node
        .ledger
        .send(Submit {
            caller,
            batch_id,
            participant,
            fields,
        })
        .await??;

    if overwritten {
        println!("{participant} resubmitted to {batch_id}");
    } else {
        println!("{participant} submitted to {batch_id}");
    }
    Ok(())
}
