// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchId, Participant};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct SubmissionRecorded {
    pub participant: Participant,
    pub batch_id: BatchId,
    /// True when this submission replaced an earlier one from the same participant
    pub overwritten: bool,
}

impl Display for SubmissionRecorded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "participant: {}, batch_id: {}, overwritten: {}",
            self.participant, self.batch_id, self.overwritten
        )
    }
}
