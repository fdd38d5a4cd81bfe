// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::BatchRepositoryFactory;
use anyhow::Result;
use cb_compute::CipherHandle;
use cb_data::{AutoPersist, DataStore, Persistable, RepositoriesFactory};
use cb_events::{BatchId, Participant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One participant's encrypted contribution to a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedFields {
    pub staked: CipherHandle,
    pub tasks: CipherHandle,
    /// Encrypted boolean
    pub eligible: CipherHandle,
}

/// Encrypted running totals of a batch. `None` until the first contribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchAggregate {
    pub total_staked: Option<CipherHandle>,
    pub total_task_completions: Option<CipherHandle>,
    pub total_eligible_users: Option<CipherHandle>,
}

/// Keyed storage for submissions, participant sets and aggregates.
///
/// Everything is held in memory and written through to the data store, so reads are synchronous
/// and the ledger can run a whole operation without yielding.
pub struct EncryptedValueStore {
    store: DataStore,
    participants: BTreeMap<BatchId, Persistable<Vec<Participant>>>,
    submissions: BTreeMap<(BatchId, Participant), Persistable<EncryptedFields>>,
    aggregates: BTreeMap<BatchId, Persistable<BatchAggregate>>,
}

impl EncryptedValueStore {
    pub fn new(store: &DataStore) -> Self {
        Self {
            store: store.clone(),
            participants: BTreeMap::new(),
            submissions: BTreeMap::new(),
            aggregates: BTreeMap::new(),
        }
    }

    /// Load every batch up to and including `highest`
    pub async fn load(store: &DataStore, highest: BatchId) -> Result<Self> {
        let mut this = Self::new(store);
        let repositories = store.repositories();
        for id in 1..=highest.value() {
            let batch_id = BatchId::new(id);

            let participants = repositories.participants(batch_id).load().await?;
            for participant in participants.get().unwrap_or_default() {
                let submission = repositories
                    .submission(batch_id, &participant)
                    .load()
                    .await?;
                if submission.has() {
                    this.submissions.insert((batch_id, participant), submission);
                }
            }
            if participants.has() {
                this.participants.insert(batch_id, participants);
            }

            let aggregate = repositories.aggregate(batch_id).load().await?;
            if aggregate.has() {
                this.aggregates.insert(batch_id, aggregate);
            }
        }
        debug!(
            "loaded {} submissions across {} batches",
            this.submissions.len(),
            highest.value()
        );
        Ok(this)
    }

    /// Participants in the order they first submitted
    pub fn participants(&self, batch_id: BatchId) -> Vec<Participant> {
        self.participants
            .get(&batch_id)
            .and_then(|p| p.get())
            .unwrap_or_default()
    }

    pub fn has_participant(&self, batch_id: BatchId, participant: &Participant) -> bool {
        self.participants
            .get(&batch_id)
            .map(|p| p.try_with(|list| Ok(list.contains(participant))).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Append unless already present. Returns whether the participant was new.
    pub fn add_participant(&mut self, batch_id: BatchId, participant: Participant) -> bool {
        if self.has_participant(batch_id, &participant) {
            return false;
        }
        let mut list = self.participants(batch_id);
        list.push(participant);
        match self.participants.get_mut(&batch_id) {
            Some(existing) => existing.set(list),
            None => {
                let created = self
                    .store
                    .repositories()
                    .participants(batch_id)
                    .send(Some(list));
                self.participants.insert(batch_id, created);
            }
        }
        true
    }

    pub fn submission(
        &self,
        batch_id: BatchId,
        participant: &Participant,
    ) -> Option<EncryptedFields> {
        self.submissions
            .get(&(batch_id, *participant))
            .and_then(|s| s.get())
    }

    pub fn submission_exists(&self, batch_id: BatchId, participant: &Participant) -> bool {
        self.submission(batch_id, participant).is_some()
    }

    /// Last write wins
    pub fn set_submission(
        &mut self,
        batch_id: BatchId,
        participant: Participant,
        fields: EncryptedFields,
    ) {
        match self.submissions.get_mut(&(batch_id, participant)) {
            Some(existing) => existing.set(fields),
            None => {
                let created = self
                    .store
                    .repositories()
                    .submission(batch_id, &participant)
                    .send(Some(fields));
                self.submissions.insert((batch_id, participant), created);
            }
        }
    }

    pub fn aggregate(&self, batch_id: BatchId) -> BatchAggregate {
        self.aggregates
            .get(&batch_id)
            .and_then(|a| a.get())
            .unwrap_or_default()
    }

    pub fn aggregate_exists(&self, batch_id: BatchId) -> bool {
        self.aggregates.get(&batch_id).is_some_and(|a| a.has())
    }

    pub fn set_aggregate(&mut self, batch_id: BatchId, aggregate: BatchAggregate) {
        match self.aggregates.get_mut(&batch_id) {
            Some(existing) => existing.set(aggregate),
            None => {
                let created = self
                    .store
                    .repositories()
                    .aggregate(batch_id)
                    .send(Some(aggregate));
                self.aggregates.insert(batch_id, created);
            }
        }
    }
}
