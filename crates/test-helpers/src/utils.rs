// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use rand::RngCore;
use tracing_subscriber::{fmt, EnvFilter};

pub fn rand_addr() -> Address {
    let mut raw = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut raw);
    Address::from(raw)
}

/// Route tracing output through the test writer until the guard drops
pub fn test_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}
