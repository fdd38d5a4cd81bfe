// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{ContextRepositoryFactory, RevealHandles, RevealedTotals};
use alloy_primitives::B256;
use anyhow::Result;
use cb_data::{AutoPersist, DataStore, Persistable, RepositoriesFactory};
use cb_events::{BatchId, RequestId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation record for an outstanding or finished decryption request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionContext {
    pub batch_id: BatchId,
    pub digest: B256,
    pub processed: bool,
    /// The handles the request was issued for
    pub handles: RevealHandles,
    pub revealed: Option<RevealedTotals>,
}

impl DecryptionContext {
    pub fn new(batch_id: BatchId, digest: B256, handles: RevealHandles) -> Self {
        Self {
            batch_id,
            digest,
            processed: false,
            handles,
            revealed: None,
        }
    }
}

/// Contexts by request id plus an index of every id ever issued. Contexts are never removed.
pub struct ContextStore {
    store: DataStore,
    index: Persistable<Vec<RequestId>>,
    contexts: BTreeMap<RequestId, Persistable<DecryptionContext>>,
}

impl ContextStore {
    pub async fn load(store: &DataStore) -> Result<Self> {
        let repositories = store.repositories();
        let index = repositories.context_index().load_or_default(vec![]).await?;
        let mut contexts = BTreeMap::new();
        for request_id in index.get().unwrap_or_default() {
            let context = repositories.context(&request_id).load().await?;
            if context.has() {
                contexts.insert(request_id, context);
            }
        }
        Ok(Self {
            store: store.clone(),
            index,
            contexts,
        })
    }

    pub fn get(&self, request_id: &RequestId) -> Option<DecryptionContext> {
        self.contexts.get(request_id).and_then(|c| c.get())
    }

    pub fn exists(&self, request_id: &RequestId) -> bool {
        self.contexts.contains_key(request_id)
    }

    /// Callers check [ContextStore::exists] first. An existing context is left untouched.
    pub fn insert(&mut self, request_id: RequestId, context: DecryptionContext) {
        if self.exists(&request_id) {
            return;
        }
        let created = self
            .store
            .repositories()
            .context(&request_id)
            .send(Some(context));
        self.contexts.insert(request_id, created);
        let mut ids = self.index.get().unwrap_or_default();
        ids.push(request_id);
        self.index.set(ids);
    }

    /// Flip `processed` and keep the totals. Returns false when the context is missing or was
    /// already processed.
    pub fn finalize(&mut self, request_id: &RequestId, totals: RevealedTotals) -> bool {
        let Some(context) = self.contexts.get_mut(request_id) else {
            return false;
        };
        context
            .try_mutate_with(|ctx| {
                if ctx.processed {
                    anyhow::bail!("already processed");
                }
                ctx.processed = true;
                ctx.revealed = Some(totals);
                Ok(())
            })
            .is_ok()
    }

    /// Every context in issue order
    pub fn list(&self) -> Vec<(RequestId, DecryptionContext)> {
        self.index
            .get()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.get(&id).map(|ctx| (id, ctx)))
            .collect()
    }
}
