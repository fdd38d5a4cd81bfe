// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{BatchAggregate, LedgerError, LedgerResult};
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::SolValue;
use cb_compute::{CipherHandle, ConfidentialCompute};
use serde::{Deserialize, Serialize};

/// The three aggregate handles in the order the oracle decrypts them
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealHandles {
    pub total_staked: B256,
    pub total_task_completions: B256,
    pub total_eligible_users: B256,
}

impl RevealHandles {
    /// Export the current aggregate. Unset or unknown handles become the zero handle.
    pub fn snapshot(
        aggregate: &BatchAggregate,
        compute: &dyn ConfidentialCompute,
    ) -> LedgerResult<Self> {
        let zero = compute.zero().map_err(LedgerError::compute)?;
        let export = |handle: Option<CipherHandle>| {
            let handle = handle
                .filter(|h| compute.is_initialized(h))
                .unwrap_or(zero);
            compute.export_handle(&handle)
        };
        Ok(Self {
            total_staked: export(aggregate.total_staked),
            total_task_completions: export(aggregate.total_task_completions),
            total_eligible_users: export(aggregate.total_eligible_users),
        })
    }

    pub fn to_array(&self) -> [B256; 3] {
        [
            self.total_staked,
            self.total_task_completions,
            self.total_eligible_users,
        ]
    }

    /// keccak256(abi.encode(bytes32[] handles, address service))
    pub fn digest(&self, service: Address) -> B256 {
        keccak256(Self::encode_binding(&self.to_array(), service))
    }

    fn encode_binding(handles: &[B256], service: Address) -> Vec<u8> {
        (handles.to_vec(), service).abi_encode_params()
    }
}

impl From<[B256; 3]> for RevealHandles {
    fn from([total_staked, total_task_completions, total_eligible_users]: [B256; 3]) -> Self {
        Self {
            total_staked,
            total_task_completions,
            total_eligible_users,
        }
    }
}

/// Decrypted totals of a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealedTotals {
    pub total_staked: u64,
    pub total_task_completions: u64,
    pub total_eligible_users: u64,
}

impl RevealedTotals {
    pub const ENCODED_LEN: usize = 3 * 32;

    /// Exactly three big endian ABI words, each of which must fit in 64 bits
    pub fn decode(cleartext: &[u8]) -> LedgerResult<Self> {
        if cleartext.len() != Self::ENCODED_LEN {
            return Err(LedgerError::DecodeFault(format!(
                "expected {} bytes but got {}",
                Self::ENCODED_LEN,
                cleartext.len()
            )));
        }
        let mut words = [0u64; 3];
        for (i, chunk) in cleartext.chunks_exact(32).enumerate() {
            let word = U256::try_from_be_slice(chunk)
                .ok_or_else(|| LedgerError::DecodeFault(format!("word {i} is malformed")))?;
            if word > U256::from(u64::MAX) {
                return Err(LedgerError::DecodeFault(format!(
                    "word {i} does not fit in 64 bits"
                )));
            }
            words[i] = word.as_limbs()[0];
        }
        Ok(words.into())
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_array()
            .iter()
            .flat_map(|v| U256::from(*v).to_be_bytes::<32>())
            .collect()
    }

    pub fn to_array(&self) -> [u64; 3] {
        [
            self.total_staked,
            self.total_task_completions,
            self.total_eligible_users,
        ]
    }
}

impl From<[u64; 3]> for RevealedTotals {
    fn from([total_staked, total_task_completions, total_eligible_users]: [u64; 3]) -> Self {
        Self {
            total_staked,
            total_task_completions,
            total_eligible_users,
        }
    }
}
