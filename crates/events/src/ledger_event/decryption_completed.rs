// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchId, RequestId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The revealed totals of a batch, in the order they were requested.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct DecryptionCompleted {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub total_staked: u64,
    pub total_task_completions: u64,
    pub total_eligible_users: u64,
}

impl Display for DecryptionCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request_id: {}, batch_id: {}, staked: {}, tasks: {}, eligible: {}",
            self.request_id,
            self.batch_id,
            self.total_staked,
            self.total_task_completions,
            self.total_eligible_users
        )
    }
}
