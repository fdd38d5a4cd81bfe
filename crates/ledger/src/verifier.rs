// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    ContextStore, EncryptedValueStore, LedgerError, LedgerResult, RevealHandles, RevealedTotals,
};
use alloy_primitives::Address;
use cb_compute::ConfidentialCompute;
use cb_events::{BatchId, RequestId};
use tracing::{info, warn};

/// A reveal that made it through every check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalizedReveal {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub totals: RevealedTotals,
}

/// Validates oracle replies against the recorded request.
///
/// Checks run in a fixed order: replay, state binding, attestation, decoding. Nothing is
/// written until all of them pass.
pub struct CallbackVerifier<'a> {
    service: Address,
    compute: &'a dyn ConfidentialCompute,
}

impl<'a> CallbackVerifier<'a> {
    pub fn new(service: Address, compute: &'a dyn ConfidentialCompute) -> Self {
        Self { service, compute }
    }

    pub fn on_decryption_ready(
        &self,
        values: &EncryptedValueStore,
        contexts: &mut ContextStore,
        request_id: RequestId,
        cleartext: &[u8],
        attestation: &[u8],
    ) -> LedgerResult<FinalizedReveal> {
        let Some(context) = contexts.get(&request_id) else {
            return Err(LedgerError::UnknownRequest(request_id));
        };
        if context.processed {
            return Err(LedgerError::ReplayAttempt(request_id));
        }

        let current = RevealHandles::snapshot(&values.aggregate(context.batch_id), self.compute)?;
        if current.digest(self.service) != context.digest {
            warn!("aggregate for {} moved while {request_id} was pending", context.batch_id);
            return Err(LedgerError::StateMismatch(context.batch_id));
        }

        match self
            .compute
            .verify_attestation(&request_id, cleartext, attestation)
        {
            Ok(true) => (),
            Ok(false) | Err(_) => return Err(LedgerError::DecryptionFailed(request_id)),
        }

        let totals = RevealedTotals::decode(cleartext)?;

        self.compute
            .acknowledge(&request_id)
            .map_err(LedgerError::compute)?;
        if !contexts.finalize(&request_id, totals) {
            return Err(LedgerError::ReplayAttempt(request_id));
        }
        info!("{request_id} finalized for {}", context.batch_id);

        Ok(FinalizedReveal {
            request_id,
            batch_id: context.batch_id,
            totals,
        })
    }
}
