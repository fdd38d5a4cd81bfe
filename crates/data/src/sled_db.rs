// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use sled::{Batch, Tree};
use std::path::Path;

use crate::{
    sled_utils::{clear_all_caches, get_or_open_db_tree},
    DataOp, Get, Insert, Remove, WriteBatch,
};

pub struct SledDb {
    db: Tree,
}

impl SledDb {
    pub fn new(path: &Path, tree: &str) -> Result<Self> {
        let db = get_or_open_db_tree(path, tree)?;
        Ok(Self { db })
    }

    pub fn close_all_connections() {
        clear_all_caches()
    }

    pub fn insert(&mut self, msg: Insert) -> Result<()> {
        self.db
            .insert(msg.key(), msg.value().to_vec())
            .context("Could not insert data into db")?;

        Ok(())
    }

    /// Apply every operation of the batch atomically
    pub fn apply_batch(&mut self, msg: WriteBatch) -> Result<()> {
        let mut batch = Batch::default();
        for op in msg.ops() {
            match op {
                DataOp::Insert(insert) => {
                    batch.insert(insert.key().as_slice(), insert.value().as_slice())
                }
                DataOp::Remove(remove) => batch.remove(remove.key().as_slice()),
            }
        }
        self.db
            .apply_batch(batch)
            .context("Could not apply write batch to db")?;
        Ok(())
    }

    pub fn remove(&mut self, msg: Remove) -> Result<()> {
        self.db
            .remove(msg.key())
            .context("Could not remove data from db")?;
        Ok(())
    }

    pub fn get(&self, event: Get) -> Result<Option<Vec<u8>>> {
        let key = event.key();
        let str_key = String::from_utf8_lossy(key).into_owned();
        let res = self
            .db
            .get(key)
            .with_context(|| format!("Failed to fetch {}", str_key))?;

        Ok(res.map(|v| v.to_vec()))
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("Could not flush db")?;
        Ok(())
    }
}
