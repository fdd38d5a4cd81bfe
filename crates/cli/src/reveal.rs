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
use cb_ledger::RequestReveal;

pub async fn execute(node: &LedgerNode, caller: Address, batch_id: BatchId) -> Result<()> {
    let request = node
        .ledger
        .send(RequestReveal { caller, batch_id })
        .await??;
    print_json(&request)?;
    Ok(())
}
