// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{DataOp, Flush, Get, Insert, InsertSync, Remove, WriteBatch};
use actix::{Actor, Handler, Message};
use anyhow::{Context, Result};
use std::collections::BTreeMap;

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash)]
#[rtype(result = "Vec<DataOp>")]
pub struct GetLog;

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash)]
#[rtype(result = "anyhow::Result<Vec<u8>>")]
pub struct GetDump;

/// Volatile store used for tests and for runs with the in memory switch set. When `capture` is
/// on every applied operation is appended to a log that tests can inspect.
pub struct InMemStore {
    db: BTreeMap<Vec<u8>, Vec<u8>>,
    log: Vec<DataOp>,
    capture: bool,
}

impl Actor for InMemStore {
    type Context = actix::Context<Self>;
}

impl InMemStore {
    pub fn new(capture: bool) -> Self {
        Self {
            db: BTreeMap::new(),
            capture,
            log: vec![],
        }
    }

    /// Rebuild a store from the output of `GetDump`
    pub fn from_dump(db: Vec<u8>, capture: bool) -> Result<Self> {
        Ok(Self {
            db: bincode::deserialize(&db).context("Error deserializing BTreeMap")?,
            capture,
            log: vec![],
        })
    }

    pub fn get_dump(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.db).context("Error serializing BTreeMap")
    }

    fn apply(&mut self, op: DataOp) {
        match &op {
            DataOp::Insert(insert) => {
                self.db.insert(insert.key().clone(), insert.value().clone());
            }
            DataOp::Remove(remove) => {
                self.db.remove(remove.key());
            }
        }
        if self.capture {
            self.log.push(op);
        }
    }
}

impl Handler<Insert> for InMemStore {
    type Result = ();
    fn handle(&mut self, event: Insert, _: &mut Self::Context) {
        self.apply(DataOp::Insert(event));
    }
}

impl Handler<InsertSync> for InMemStore {
    type Result = Result<()>;
    fn handle(&mut self, event: InsertSync, _: &mut Self::Context) -> Self::Result {
        self.apply(DataOp::Insert(event.into()));
        Ok(())
    }
}

impl Handler<WriteBatch> for InMemStore {
    type Result = ();
    fn handle(&mut self, msg: WriteBatch, _: &mut Self::Context) -> Self::Result {
        for op in msg.ops() {
            self.apply(op.clone());
        }
    }
}

impl Handler<Remove> for InMemStore {
    type Result = ();
    fn handle(&mut self, event: Remove, _: &mut Self::Context) {
        self.apply(DataOp::Remove(event));
    }
}

impl Handler<Get> for InMemStore {
    type Result = Option<Vec<u8>>;
    fn handle(&mut self, event: Get, _: &mut Self::Context) -> Option<Vec<u8>> {
        self.db.get(event.key()).cloned()
    }
}

impl Handler<Flush> for InMemStore {
    type Result = Result<()>;
    fn handle(&mut self, _: Flush, _: &mut Self::Context) -> Self::Result {
        Ok(())
    }
}

impl Handler<GetLog> for InMemStore {
    type Result = Vec<DataOp>;
    fn handle(&mut self, _: GetLog, _: &mut Self::Context) -> Vec<DataOp> {
        self.log.clone()
    }
}

impl Handler<GetDump> for InMemStore {
    type Result = anyhow::Result<Vec<u8>>;
    fn handle(&mut self, _: GetDump, _: &mut Self::Context) -> Self::Result {
        self.get_dump()
    }
}
