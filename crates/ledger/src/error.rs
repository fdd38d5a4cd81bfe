// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use cb_events::{BatchId, LedgerErrorKind, Participant, RequestId};
use thiserror::Error;

/// Every way a ledger operation can be rejected. A rejected operation leaves durable state as
/// it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0:#x} is not authorized")]
    Unauthorized(Participant),

    #[error("the ledger is paused")]
    SystemPaused,

    #[error("{0:#x} must wait before calling again")]
    RateLimited(Participant),

    #[error("{0} is already open")]
    BatchAlreadyOpen(BatchId),

    #[error("{0} is not the open batch")]
    BatchNotOpen(BatchId),

    #[error("{0} is still open")]
    BatchStillOpen(BatchId),

    #[error("{0} has not been allocated")]
    InvalidBatchId(BatchId),

    #[error("correction for {0} changes nothing")]
    EmptyCorrection(BatchId),

    #[error("{0} has already been finalized")]
    ReplayAttempt(RequestId),

    #[error("{0} is not a known decryption request")]
    UnknownRequest(RequestId),

    #[error("{0} was already issued")]
    DuplicateRequest(RequestId),

    #[error("aggregate for {0} changed since the decryption was requested")]
    StateMismatch(BatchId),

    #[error("attestation for {0} did not verify")]
    DecryptionFailed(RequestId),

    #[error("cleartext could not be decoded: {0}")]
    DecodeFault(String),

    #[error("confidential compute failed: {0}")]
    Compute(String),
}

impl LedgerError {
    pub fn kind(&self) -> LedgerErrorKind {
        match self {
            LedgerError::Unauthorized(_) => LedgerErrorKind::Unauthorized,
            LedgerError::SystemPaused => LedgerErrorKind::SystemPaused,
            LedgerError::RateLimited(_) => LedgerErrorKind::RateLimited,
            LedgerError::BatchAlreadyOpen(_) => LedgerErrorKind::BatchAlreadyOpen,
            LedgerError::BatchNotOpen(_) => LedgerErrorKind::BatchNotOpen,
            LedgerError::BatchStillOpen(_) => LedgerErrorKind::BatchStillOpen,
            LedgerError::InvalidBatchId(_) => LedgerErrorKind::InvalidBatchId,
            LedgerError::EmptyCorrection(_) => LedgerErrorKind::EmptyCorrection,
            LedgerError::ReplayAttempt(_) => LedgerErrorKind::ReplayAttempt,
            LedgerError::UnknownRequest(_) => LedgerErrorKind::UnknownRequest,
            LedgerError::DuplicateRequest(_) => LedgerErrorKind::DuplicateRequest,
            LedgerError::StateMismatch(_) => LedgerErrorKind::StateMismatch,
            LedgerError::DecryptionFailed(_) => LedgerErrorKind::DecryptionFailed,
            LedgerError::DecodeFault(_) => LedgerErrorKind::DecodeFault,
            LedgerError::Compute(_) => LedgerErrorKind::Compute,
        }
    }

    pub(crate) fn compute(err: impl std::fmt::Display) -> Self {
        LedgerError::Compute(err.to_string())
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
