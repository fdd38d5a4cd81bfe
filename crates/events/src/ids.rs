// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Identity of a submitter. Participants are keyed by their account address.
pub type Participant = Address;

/// Batch identifier. Allocated densely starting at 1; zero never names a batch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BatchId(u64);

impl BatchId {
    /// The sentinel used before any batch has been allocated.
    pub const NONE: BatchId = BatchId(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The identifier allocated after this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for BatchId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for BatchId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

/// Correlation identifier issued by the confidential compute service when a decryption is
/// requested. The ledger treats it as opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(B256);

impl RequestId {
    pub fn new(id: B256) -> Self {
        Self(id)
    }

    pub fn as_b256(&self) -> &B256 {
        &self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<B256> for RequestId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

/// Accepts the bare hex form as well as the `req:` prefixed display form
impl FromStr for RequestId {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("req:").unwrap_or(s);
        Ok(Self(B256::from_str(hex)?))
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:0x{}", hex::encode(self.0))
    }
}
