// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque reference to a value held in encrypted form by the compute service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CipherHandle(B256);

impl CipherHandle {
    pub fn new(raw: B256) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> B256 {
        self.0
    }
}

impl From<B256> for CipherHandle {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl Display for CipherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ct:{}", hex::encode(&self.0[..6]))
    }
}
