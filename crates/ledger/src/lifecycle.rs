// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{LedgerError, LedgerResult};
use anyhow::Result;
use cb_data::{AutoPersist, Persistable, Repository};
use cb_events::BatchId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NoBatch,
    Open(BatchId),
    Closed(BatchId),
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::NoBatch => write!(f, "no batch"),
            Phase::Open(id) => write!(f, "{id} open"),
            Phase::Closed(id) => write!(f, "{id} closed"),
        }
    }
}

/// Highest allocated batch and whether it is still collecting.
///
/// Only the most recently allocated batch can ever be open, so these two fields are enough to
/// answer every lifecycle question.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchState {
    highest: BatchId,
    open: bool,
}

impl BatchState {
    pub fn highest(&self) -> BatchId {
        self.highest
    }

    pub fn phase(&self) -> Phase {
        match (self.highest.is_none(), self.open) {
            (true, _) => Phase::NoBatch,
            (false, true) => Phase::Open(self.highest),
            (false, false) => Phase::Closed(self.highest),
        }
    }

    pub fn current_open(&self) -> Option<BatchId> {
        self.open.then_some(self.highest)
    }

    pub fn open_next(&self) -> LedgerResult<(Self, BatchId)> {
        if self.open {
            return Err(LedgerError::BatchAlreadyOpen(self.highest));
        }
        let id = self.highest.next();
        Ok((
            Self {
                highest: id,
                open: true,
            },
            id,
        ))
    }

    pub fn close(&self) -> LedgerResult<(Self, BatchId)> {
        if !self.open {
            return Err(LedgerError::BatchNotOpen(self.highest));
        }
        Ok((
            Self {
                highest: self.highest,
                open: false,
            },
            self.highest,
        ))
    }

    pub fn is_allocated(&self, batch_id: BatchId) -> bool {
        !batch_id.is_none() && batch_id <= self.highest
    }

    /// Submissions only go to the open batch
    pub fn ensure_open(&self, batch_id: BatchId) -> LedgerResult<()> {
        match self.current_open() {
            Some(open) if open == batch_id => Ok(()),
            _ => Err(LedgerError::BatchNotOpen(batch_id)),
        }
    }

    /// Reveals and corrections only target allocated batches that stopped collecting
    pub fn ensure_settled(&self, batch_id: BatchId) -> LedgerResult<()> {
        if !self.is_allocated(batch_id) {
            return Err(LedgerError::InvalidBatchId(batch_id));
        }
        if self.current_open() == Some(batch_id) {
            return Err(LedgerError::BatchStillOpen(batch_id));
        }
        Ok(())
    }
}

pub struct BatchLifecycle {
    state: Persistable<BatchState>,
}

impl BatchLifecycle {
    pub async fn load(repo: &Repository<BatchState>) -> Result<Self> {
        Ok(Self {
            state: repo.load_or_default(BatchState::default()).await?,
        })
    }

    pub fn state(&self) -> BatchState {
        self.state.get().unwrap_or_default()
    }

    pub fn open_batch(&mut self) -> LedgerResult<BatchId> {
        let (next, id) = self.state().open_next()?;
        self.state.set(next);
        Ok(id)
    }

    pub fn close_batch(&mut self) -> LedgerResult<BatchId> {
        let (next, id) = self.state().close()?;
        self.state.set(next);
        Ok(id)
    }
}
