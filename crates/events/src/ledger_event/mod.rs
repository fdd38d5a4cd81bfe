// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod aggregate_corrected;
mod batch_closed;
mod batch_opened;
mod decryption_completed;
mod decryption_requested;
mod ledger_error;
mod shutdown;
mod submission_recorded;

pub use aggregate_corrected::*;
pub use batch_closed::*;
pub use batch_opened::*;
pub use decryption_completed::*;
pub use decryption_requested::*;
pub use ledger_error::*;
pub use shutdown::*;
pub use submission_recorded::*;

use crate::{BatchId, ErrorEvent, Event, EventId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use strum::IntoStaticStr;

/// Macro to help define From traits for LedgerEventData
macro_rules! impl_from_event {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for LedgerEventData {
                fn from(data: $variant) -> Self {
                    LedgerEventData::$variant(data)
                }
            }
        )*
    };
}

/// Everything the ledger reports to external consumers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr)]
pub enum LedgerEventData {
    BatchOpened(BatchOpened),
    BatchClosed(BatchClosed),
    SubmissionRecorded(SubmissionRecorded),
    AggregateCorrected(AggregateCorrected),
    DecryptionRequested(DecryptionRequested),
    DecryptionCompleted(DecryptionCompleted),
    LedgerError(LedgerError),
    Shutdown(Shutdown),
}

impl_from_event!(
    BatchOpened,
    BatchClosed,
    SubmissionRecorded,
    AggregateCorrected,
    DecryptionRequested,
    DecryptionCompleted,
    LedgerError,
    Shutdown
);

impl LedgerEventData {
    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            LedgerEventData::BatchOpened(data) => Some(data.batch_id),
            LedgerEventData::BatchClosed(data) => Some(data.batch_id),
            LedgerEventData::SubmissionRecorded(data) => Some(data.batch_id),
            LedgerEventData::AggregateCorrected(data) => Some(data.batch_id),
            LedgerEventData::DecryptionRequested(data) => Some(data.batch_id),
            LedgerEventData::DecryptionCompleted(data) => Some(data.batch_id),
            LedgerEventData::LedgerError(_) | LedgerEventData::Shutdown(_) => None,
        }
    }
}

impl Display for LedgerEventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerEventData::BatchOpened(data) => data.fmt(f),
            LedgerEventData::BatchClosed(data) => data.fmt(f),
            LedgerEventData::SubmissionRecorded(data) => data.fmt(f),
            LedgerEventData::AggregateCorrected(data) => data.fmt(f),
            LedgerEventData::DecryptionRequested(data) => data.fmt(f),
            LedgerEventData::DecryptionCompleted(data) => data.fmt(f),
            LedgerEventData::LedgerError(data) => data.fmt(f),
            LedgerEventData::Shutdown(data) => data.fmt(f),
        }
    }
}

/// A sequenced observation as it travels over the EventBus.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct LedgerEvent {
    id: EventId,
    seq: u64,
    data: LedgerEventData,
}

impl LedgerEvent {
    pub fn new(seq: u64, data: impl Into<LedgerEventData>) -> Self {
        let data = data.into();
        // An encoding failure only weakens de-duplication, the sequence number still separates ids
        let payload = bincode::serialize(&data).unwrap_or_default();
        Self {
            id: EventId::from_parts(seq, &payload),
            seq,
            data,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

impl Event for LedgerEvent {
    type Id = EventId;
    type Data = LedgerEventData;

    fn event_type(&self) -> String {
        let name: &'static str = (&self.data).into();
        name.to_string()
    }

    fn event_id(&self) -> Self::Id {
        self.id.clone()
    }

    fn get_data(&self) -> &Self::Data {
        &self.data
    }

    fn into_data(self) -> Self::Data {
        self.data
    }
}

impl ErrorEvent for LedgerEvent {
    type ErrType = LedgerErrorKind;
    type Error = LedgerError;

    fn as_error(&self) -> Option<&Self::Error> {
        match &self.data {
            LedgerEventData::LedgerError(data) => Some(data),
            _ => None,
        }
    }
}

impl Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({})", self.event_type(), self.seq, self.data)
    }
}
