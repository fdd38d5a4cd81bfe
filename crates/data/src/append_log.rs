// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DataStore, PersistableData};
use anyhow::{anyhow, Result};
use std::marker::PhantomData;

/// Entries stored one key each under a scope, with the entry count kept beside them.
///
/// Appending costs two small writes however long the log is. Entries are never rewritten.
#[derive(Debug)]
pub struct AppendLog<T> {
    store: DataStore,
    len: u64,
    _entry: PhantomData<T>,
}

impl<T> AppendLog<T>
where
    T: PersistableData,
{
    /// Open the log at the scope and read back every entry
    pub async fn load(store: DataStore) -> Result<(Self, Vec<T>)> {
        let len = store.scope("len").read::<u64>().await?.unwrap_or(0);
        let mut entries = Vec::with_capacity(len as usize);
        for index in 0..len {
            let entry = store.scope(index.to_string()).read().await?.ok_or_else(|| {
                anyhow!("{} is missing entry {index} of {len}", store.get_scope())
            })?;
            entries.push(entry);
        }
        let log = Self {
            store,
            len,
            _entry: PhantomData,
        };
        Ok((log, entries))
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn append(&mut self, entry: &T) {
        self.store.scope(self.len.to_string()).write(entry);
        self.len += 1;
        self.store.scope("len").write(self.len);
    }

    /// Forget the entries past `len`. Only valid when their writes were discarded before they
    /// reached the backend.
    pub fn rewind(&mut self, len: u64) {
        self.len = self.len.min(len);
    }
}
