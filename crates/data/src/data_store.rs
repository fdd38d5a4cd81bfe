// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::borrow::Cow;

use crate::{Flush, Get, Insert, InsertSync, Remove, WriteBuffer};
use crate::{InMemStore, IntoKey, SledStore};
use actix::{Addr, Recipient};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Clone, Debug)]
pub enum StoreAddr {
    InMem(Addr<InMemStore>),
    Sled(Addr<SledStore>),
}

impl StoreAddr {
    pub fn to_maybe_in_mem(&self) -> Option<&Addr<InMemStore>> {
        match self {
            StoreAddr::InMem(ref store) => Some(store),
            _ => None,
        }
    }
}

/// Scopable proxy for the key value store.
///
/// Reads go straight to the backend. Buffered writes and removals go through whatever recipient
/// was wired in, usually a [WriteBuffer] so that a unit of work lands as a single batch.
#[derive(Clone, Debug)]
pub struct DataStore {
    scope: Vec<u8>,
    addr: StoreAddr,
    get: Recipient<Get>,
    insert: Recipient<Insert>,
    insert_sync: Recipient<InsertSync>,
    remove: Recipient<Remove>,
    flush: Recipient<Flush>,
}

impl DataStore {
    /// Read data at the scope location
    pub async fn read<T>(&self) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(bytes) = self.get.send(Get::new(&self.scope)).await? else {
            return Ok(None);
        };

        // A null value does not deserialize
        if bytes == [0] {
            return Ok(None);
        }

        Ok(Some(bincode::deserialize(&bytes)?))
    }

    /// Writes data to the scope location
    pub fn write<T: Serialize>(&self, value: T) {
        let Ok(serialized) = bincode::serialize(&value) else {
            let str_key = self.get_scope();
            error!("Could not serialize value passed to {}", str_key);
            return;
        };
        self.insert.do_send(Insert::new(&self.scope, serialized))
    }

    /// Writes data straight to the backend and waits for it to be accepted
    pub async fn write_sync<T: Serialize>(&self, value: T) -> Result<()> {
        let serialized = bincode::serialize(&value).with_context(|| {
            anyhow!("Could not serialize value passed to {}", self.get_scope())
        })?;

        self.insert_sync
            .send(InsertSync::new(&self.scope, serialized))
            .await??;
        Ok(())
    }

    /// Removes data from the scope location
    pub fn clear(&self) {
        self.remove.do_send(Remove::new(&self.scope))
    }

    /// Wait until every write queued before this call is durable
    pub async fn flush(&self) -> Result<()> {
        self.flush.send(Flush).await?
    }

    pub fn get_scope(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.scope)
    }

    pub fn get_addr(&self) -> &StoreAddr {
        &self.addr
    }

    /// Nest the scope. A slash is inserted when the key does not start with one.
    pub fn scope<K: IntoKey>(&self, key: K) -> Self {
        let mut scope = self.scope.clone();
        let encoded_key = key.into_key();
        if !encoded_key.starts_with(b"/") {
            scope.extend("/".into_key());
        }
        scope.extend(encoded_key);
        Self {
            scope,
            ..self.clone()
        }
    }

    /// Replace the scope entirely
    pub fn base<K: IntoKey>(&self, key: K) -> Self {
        Self {
            scope: key.into_key(),
            ..self.clone()
        }
    }

    /// Same scope, but writes skip any buffer and go straight to the backend
    pub fn unbuffered(&self) -> Self {
        let (insert, remove, flush): (Recipient<Insert>, Recipient<Remove>, Recipient<Flush>) =
            match &self.addr {
                StoreAddr::InMem(addr) => (
                    addr.clone().recipient(),
                    addr.clone().recipient(),
                    addr.clone().recipient(),
                ),
                StoreAddr::Sled(addr) => (
                    addr.clone().recipient(),
                    addr.clone().recipient(),
                    addr.clone().recipient(),
                ),
            };
        Self {
            insert,
            remove,
            flush,
            ..self.clone()
        }
    }

    pub fn from_sled_store(addr: &Addr<SledStore>, write_buffer: &Addr<WriteBuffer>) -> Self {
        Self {
            addr: StoreAddr::Sled(addr.clone()),
            get: addr.clone().recipient(),
            insert: write_buffer.clone().recipient(),
            insert_sync: addr.clone().recipient(),
            remove: write_buffer.clone().recipient(),
            flush: write_buffer.clone().recipient(),
            scope: vec![],
        }
    }

    pub fn from_in_mem(addr: &Addr<InMemStore>, write_buffer: &Addr<WriteBuffer>) -> Self {
        Self {
            addr: StoreAddr::InMem(addr.clone()),
            get: addr.clone().recipient(),
            insert: write_buffer.clone().recipient(),
            insert_sync: addr.clone().recipient(),
            remove: write_buffer.clone().recipient(),
            flush: write_buffer.clone().recipient(),
            scope: vec![],
        }
    }
}

impl From<&Addr<SledStore>> for DataStore {
    fn from(addr: &Addr<SledStore>) -> Self {
        Self {
            addr: StoreAddr::Sled(addr.clone()),
            get: addr.clone().recipient(),
            insert: addr.clone().recipient(),
            insert_sync: addr.clone().recipient(),
            remove: addr.clone().recipient(),
            flush: addr.clone().recipient(),
            scope: vec![],
        }
    }
}

impl From<&Addr<InMemStore>> for DataStore {
    fn from(addr: &Addr<InMemStore>) -> Self {
        Self {
            addr: StoreAddr::InMem(addr.clone()),
            get: addr.clone().recipient(),
            insert: addr.clone().recipient(),
            insert_sync: addr.clone().recipient(),
            remove: addr.clone().recipient(),
            flush: addr.clone().recipient(),
            scope: vec![],
        }
    }
}
