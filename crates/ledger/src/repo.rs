// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchAggregate, BatchState, DecryptionContext, EncryptedFields};
use cb_config::StoreKeys;
use cb_data::{Repositories, Repository};
use cb_events::{BatchId, Participant, RequestId};

pub trait LifecycleRepositoryFactory {
    fn lifecycle(&self) -> Repository<BatchState>;
}

impl LifecycleRepositoryFactory for Repositories {
    fn lifecycle(&self) -> Repository<BatchState> {
        Repository::new(self.store.scope(StoreKeys::lifecycle()))
    }
}

pub trait BatchRepositoryFactory {
    fn participants(&self, batch_id: BatchId) -> Repository<Vec<Participant>>;
    fn submission(&self, batch_id: BatchId, participant: &Participant)
        -> Repository<EncryptedFields>;
    fn aggregate(&self, batch_id: BatchId) -> Repository<BatchAggregate>;
}

impl BatchRepositoryFactory for Repositories {
    fn participants(&self, batch_id: BatchId) -> Repository<Vec<Participant>> {
        Repository::new(self.store.scope(StoreKeys::participants(batch_id)))
    }

    fn submission(
        &self,
        batch_id: BatchId,
        participant: &Participant,
    ) -> Repository<EncryptedFields> {
        Repository::new(self.store.scope(StoreKeys::submission(batch_id, participant)))
    }

    fn aggregate(&self, batch_id: BatchId) -> Repository<BatchAggregate> {
        Repository::new(self.store.scope(StoreKeys::aggregate(batch_id)))
    }
}

pub trait ContextRepositoryFactory {
    fn context(&self, request_id: &RequestId) -> Repository<DecryptionContext>;
    fn context_index(&self) -> Repository<Vec<RequestId>>;
}

impl ContextRepositoryFactory for Repositories {
    fn context(&self, request_id: &RequestId) -> Repository<DecryptionContext> {
        Repository::new(self.store.scope(StoreKeys::context(request_id)))
    }

    fn context_index(&self) -> Repository<Vec<RequestId>> {
        Repository::new(self.store.scope(StoreKeys::context_index()))
    }
}
