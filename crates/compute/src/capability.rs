// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::CipherHandle;
use alloy_primitives::{Address, B256};
use anyhow::Result;
use cb_events::RequestId;
use serde::{Deserialize, Serialize};

/// Where the oracle delivers its reply
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackTarget {
    pub address: Address,
    pub entry_point: String,
}

impl CallbackTarget {
    pub const ENTRY_POINT: &'static str = "on_decryption_ready";

    pub fn new(address: Address) -> Self {
        Self {
            address,
            entry_point: Self::ENTRY_POINT.to_string(),
        }
    }
}

/// Reply from the oracle for a decryption request
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OracleReply {
    pub request_id: RequestId,
    /// ABI layout: one 32 byte big endian word per requested handle
    pub cleartext: Vec<u8>,
    pub attestation: Vec<u8>,
}

/// Homomorphic operations and asynchronous decryption.
///
/// Implementations never reveal plaintext through this interface. The only way out is a
/// decryption request that is answered later through an [OracleReply].
pub trait ConfidentialCompute: Send + Sync {
    /// Handle of an encrypted zero. Stable for the life of the service.
    fn zero(&self) -> Result<CipherHandle>;

    fn combine(&self, a: &CipherHandle, b: &CipherHandle) -> Result<CipherHandle>;

    /// Turn an encrypted boolean into an encrypted 0 or 1
    fn flag_as_count(&self, flag: &CipherHandle) -> Result<CipherHandle>;

    fn is_initialized(&self, handle: &CipherHandle) -> bool;

    /// Canonical 32 byte wire form
    fn export_handle(&self, handle: &CipherHandle) -> B256;

    fn request_decryption(&self, ordered: &[B256], callback: &CallbackTarget) -> Result<RequestId>;

    fn verify_attestation(
        &self,
        request_id: &RequestId,
        cleartext: &[u8],
        attestation: &[u8],
    ) -> Result<bool>;

    /// The reply for `request_id` was accepted, so the request is no longer pending
    fn acknowledge(&self, _request_id: &RequestId) -> Result<()> {
        Ok(())
    }

    /// Keep everything changed since the last commit or discard. The ledger calls this when an
    /// operation succeeds and [ConfidentialCompute::discard] when it is rejected.
    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn discard(&self) -> Result<()> {
        Ok(())
    }
}
