// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use strum::{Display as StrumDisplay, EnumString};

/// Kinds of failure reported on the bus. The first group mirrors the ledger's rejection reasons
/// one to one, the rest come from infrastructure.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
pub enum LedgerErrorKind {
    Unauthorized,
    SystemPaused,
    RateLimited,
    BatchAlreadyOpen,
    BatchNotOpen,
    BatchStillOpen,
    InvalidBatchId,
    EmptyCorrection,
    ReplayAttempt,
    UnknownRequest,
    DuplicateRequest,
    StateMismatch,
    DecryptionFailed,
    DecodeFault,
    Compute,
    Data,
    Oracle,
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Display) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
