// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use cb_events::{BatchId, Participant, RequestId};

/// Root keys for everything the ledger and the local coprocessor persist
pub struct StoreKeys;

impl StoreKeys {
    pub fn lifecycle() -> String {
        String::from("//lifecycle")
    }

    pub fn participants(batch_id: BatchId) -> String {
        format!("//participants/{}", batch_id.value())
    }

    pub fn submission(batch_id: BatchId, participant: &Participant) -> String {
        format!("//submissions/{}/{participant:#x}", batch_id.value())
    }

    pub fn aggregate(batch_id: BatchId) -> String {
        format!("//aggregates/{}", batch_id.value())
    }

    pub fn context(request_id: &RequestId) -> String {
        format!("//contexts/{:#x}", request_id.as_b256())
    }

    pub fn context_index() -> String {
        String::from("//context_index")
    }

    /// Ciphertexts clients encrypted. Written outside any ledger operation.
    pub fn coprocessor_inputs() -> String {
        String::from("//coprocessor/inputs")
    }

    /// Ciphertexts produced by homomorphic operations
    pub fn coprocessor_derived() -> String {
        String::from("//coprocessor/derived")
    }

    pub fn coprocessor_requests() -> String {
        String::from("//coprocessor/requests")
    }

    /// Requests whose reply the ledger accepted
    pub fn coprocessor_acknowledged() -> String {
        String::from("//coprocessor/acknowledged")
    }
}
