// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    ContextStore, DecryptionContext, EncryptedValueStore, LedgerError, LedgerResult,
    RevealHandles,
};
use alloy_primitives::{Address, B256};
use cb_compute::{CallbackTarget, ConfidentialCompute};
use cb_events::{BatchId, RequestId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What was issued for a reveal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRequest {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub digest: B256,
    pub handles: RevealHandles,
}

/// Issues decryption requests and records what they were bound to
pub struct DecryptionCoordinator<'a> {
    service: Address,
    compute: &'a dyn ConfidentialCompute,
}

impl<'a> DecryptionCoordinator<'a> {
    pub fn new(service: Address, compute: &'a dyn ConfidentialCompute) -> Self {
        Self { service, compute }
    }

    /// Snapshot the batch totals, bind them with a digest and ask the oracle to decrypt them.
    /// The lifecycle checks have already passed when this runs.
    pub fn request_reveal(
        &self,
        values: &EncryptedValueStore,
        contexts: &mut ContextStore,
        batch_id: BatchId,
    ) -> LedgerResult<RevealRequest> {
        let handles = RevealHandles::snapshot(&values.aggregate(batch_id), self.compute)?;
        let digest = handles.digest(self.service);

        let request_id = self
            .compute
            .request_decryption(&handles.to_array(), &CallbackTarget::new(self.service))
            .map_err(LedgerError::compute)?;

        if contexts.exists(&request_id) {
            return Err(LedgerError::DuplicateRequest(request_id));
        }

        contexts.insert(
            request_id,
            DecryptionContext::new(batch_id, digest, handles),
        );
        info!("requested decryption {request_id} for {batch_id}");

        Ok(RevealRequest {
            request_id,
            batch_id,
            digest,
            handles,
        })
    }
}
