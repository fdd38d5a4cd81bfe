// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchId, Participant};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// An operator folded an out-of-band correction into a closed batch's aggregate.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct AggregateCorrected {
    pub batch_id: BatchId,
    pub corrected_by: Participant,
}

impl Display for AggregateCorrected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch_id: {}, corrected_by: {}",
            self.batch_id, self.corrected_by
        )
    }
}
