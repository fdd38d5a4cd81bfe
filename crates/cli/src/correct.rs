// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::node::LedgerNode;
use alloy_primitives::Address;
use anyhow::{bail, Result};
use cb_events::BatchId;
use cb_ledger::{ApplyCorrection, Correction};

pub async fn execute(
    node: &LedgerNode,
    caller: Address,
    batch_id: BatchId,
    staked: Option<u64>,
    tasks: Option<u64>,
    eligible_count: Option<u64>,
) -> Result<()> {
    let encrypt = |value: Option<u64>| value.map(|v| node.coprocessor.encrypt_u64(v)).transpose();
    let correction = Correction {
        staked: encrypt(staked)?,
        tasks: encrypt(tasks)?,
        eligible_count: encrypt(eligible_count)?,
    };
    if correction.is_empty() {
        bail!("Nothing to correct. Pass at least one of --staked, --tasks or --eligible-count.");
    }

    node.ledger
        .send(ApplyCorrection {
            caller,
            batch_id,
            correction,
        })
        .await??;
    println!("{batch_id} corrected");
    Ok(())
}
