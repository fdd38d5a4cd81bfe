// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use cb_config::StoreKeys;
use cb_data::{DataStore, Repositories};

/// Scopes of the coprocessor's append logs
pub trait CoprocessorRepositoryFactory {
    /// Client ciphertexts. Writes go straight to the backend since they belong to no ledger
    /// operation.
    fn coprocessor_inputs(&self) -> DataStore;
    fn coprocessor_derived(&self) -> DataStore;
    fn coprocessor_requests(&self) -> DataStore;
    fn coprocessor_acknowledged(&self) -> DataStore;
}

impl CoprocessorRepositoryFactory for Repositories {
    fn coprocessor_inputs(&self) -> DataStore {
        self.store
            .scope(StoreKeys::coprocessor_inputs())
            .unbuffered()
    }

    fn coprocessor_derived(&self) -> DataStore {
        self.store.scope(StoreKeys::coprocessor_derived())
    }

    fn coprocessor_requests(&self) -> DataStore {
        self.store.scope(StoreKeys::coprocessor_requests())
    }

    fn coprocessor_acknowledged(&self) -> DataStore {
        self.store.scope(StoreKeys::coprocessor_acknowledged())
    }
}
