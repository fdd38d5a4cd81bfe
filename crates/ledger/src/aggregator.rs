// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchAggregate, EncryptedFields, EncryptedValueStore, LedgerError, LedgerResult};
use cb_compute::{CipherHandle, ConfidentialCompute};
use cb_events::{BatchId, Participant};
use serde::{Deserialize, Serialize};

/// Encrypted deltas applied to a closed batch. The eligible delta is already a count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub staked: Option<CipherHandle>,
    pub tasks: Option<CipherHandle>,
    pub eligible_count: Option<CipherHandle>,
}

impl Correction {
    pub fn is_empty(&self) -> bool {
        self.staked.is_none() && self.tasks.is_none() && self.eligible_count.is_none()
    }
}

/// Keeps per batch encrypted totals in step with submissions.
///
/// A first submission is folded straight into the totals. A resubmission replaces the earlier
/// fields, and since there is no homomorphic subtraction the totals are rebuilt from zero over
/// the latest fields of every participant.
pub struct EncryptedAggregator<'a> {
    compute: &'a dyn ConfidentialCompute,
}

impl<'a> EncryptedAggregator<'a> {
    pub fn new(compute: &'a dyn ConfidentialCompute) -> Self {
        Self { compute }
    }

    fn add(&self, total: Option<CipherHandle>, delta: &CipherHandle) -> LedgerResult<CipherHandle> {
        let base = match total {
            Some(handle) => handle,
            None => self.compute.zero().map_err(LedgerError::compute)?,
        };
        self.compute
            .combine(&base, delta)
            .map_err(LedgerError::compute)
    }

    fn fold(
        &self,
        totals: BatchAggregate,
        fields: &EncryptedFields,
    ) -> LedgerResult<BatchAggregate> {
        let eligible = self
            .compute
            .flag_as_count(&fields.eligible)
            .map_err(LedgerError::compute)?;
        Ok(BatchAggregate {
            total_staked: Some(self.add(totals.total_staked, &fields.staked)?),
            total_task_completions: Some(self.add(totals.total_task_completions, &fields.tasks)?),
            total_eligible_users: Some(self.add(totals.total_eligible_users, &eligible)?),
        })
    }

    /// Record a submission and update the totals. Returns whether an earlier submission by the
    /// same participant was overwritten. Nothing is written if any compute step fails.
    pub fn submit(
        &self,
        store: &mut EncryptedValueStore,
        batch_id: BatchId,
        participant: Participant,
        fields: EncryptedFields,
    ) -> LedgerResult<bool> {
        let overwritten = store.submission_exists(batch_id, &participant);

        let totals = if overwritten {
            let mut totals = BatchAggregate::default();
            for existing in store.participants(batch_id) {
                let latest = if existing == participant {
                    fields
                } else {
                    store.submission(batch_id, &existing).ok_or_else(|| {
                        LedgerError::Compute(format!(
                            "{batch_id} lists {existing:#x} without a submission"
                        ))
                    })?
                };
                totals = self.fold(totals, &latest)?;
            }
            totals
        } else {
            self.fold(store.aggregate(batch_id), &fields)?
        };

        store.set_submission(batch_id, participant, fields);
        store.add_participant(batch_id, participant);
        store.set_aggregate(batch_id, totals);
        Ok(overwritten)
    }

    /// Combine the correction into the batch totals
    pub fn apply_correction(
        &self,
        store: &mut EncryptedValueStore,
        batch_id: BatchId,
        correction: &Correction,
    ) -> LedgerResult<BatchAggregate> {
        let current = store.aggregate(batch_id);
        let apply = |total: Option<CipherHandle>, delta: Option<CipherHandle>| match delta {
            Some(delta) => self.add(total, &delta).map(Some),
            None => Ok(total),
        };
        let corrected = BatchAggregate {
            total_staked: apply(current.total_staked, correction.staked)?,
            total_task_completions: apply(current.total_task_completions, correction.tasks)?,
            total_eligible_users: apply(current.total_eligible_users, correction.eligible_count)?,
        };
        store.set_aggregate(batch_id, corrected);
        Ok(corrected)
    }
}
