// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Flush, Get, Insert, InsertSync, Remove, SledDb, WriteBatch};
use actix::{Actor, ActorContext, Addr, Handler};
use anyhow::{anyhow, Result};
use cb_events::{prelude::*, BusHandle, LedgerErrorKind, LedgerEvent, LedgerEventData};
use std::path::Path;
use tracing::{error, info};

/// Durable backend. Failures on fire and forget writes are reported on the bus.
pub struct SledStore {
    db: Option<SledDb>,
    bus: BusHandle,
}

impl Actor for SledStore {
    type Context = actix::Context<Self>;
}

impl SledStore {
    pub fn new(bus: &BusHandle, path: &Path) -> Result<Addr<Self>> {
        info!("Starting SledStore with {:?}", path);
        let db = SledDb::new(path, "datastore")?;

        let store = Self {
            db: Some(db),
            bus: bus.clone(),
        }
        .start();

        bus.subscribe("Shutdown", store.clone().recipient());

        Ok(store)
    }
}

impl Handler<Insert> for SledStore {
    type Result = ();

    fn handle(&mut self, event: Insert, _: &mut Self::Context) -> Self::Result {
        if let Some(ref mut db) = self.db {
            if let Err(err) = db.insert(event) {
                self.bus.err(LedgerErrorKind::Data, err)
            }
        }
    }
}

impl Handler<WriteBatch> for SledStore {
    type Result = ();

    fn handle(&mut self, batch: WriteBatch, _: &mut Self::Context) -> Self::Result {
        if let Some(ref mut db) = self.db {
            if let Err(err) = db.apply_batch(batch) {
                self.bus.err(LedgerErrorKind::Data, err)
            }
        }
    }
}

impl Handler<InsertSync> for SledStore {
    type Result = Result<()>;

    fn handle(&mut self, event: InsertSync, _: &mut Self::Context) -> Self::Result {
        let db = self.db.as_mut().ok_or(anyhow!("db has been closed"))?;
        db.insert(event.into())
    }
}

impl Handler<Remove> for SledStore {
    type Result = ();

    fn handle(&mut self, event: Remove, _: &mut Self::Context) -> Self::Result {
        if let Some(ref mut db) = self.db {
            if let Err(err) = db.remove(event) {
                self.bus.err(LedgerErrorKind::Data, err)
            }
        }
    }
}

impl Handler<Get> for SledStore {
    type Result = Option<Vec<u8>>;

    fn handle(&mut self, event: Get, _: &mut Self::Context) -> Self::Result {
        let Some(ref db) = self.db else {
            error!("Attempt to get data from dropped db");
            return None;
        };
        match db.get(event) {
            Ok(v) => v,
            Err(err) => {
                self.bus.err(LedgerErrorKind::Data, err);
                None
            }
        }
    }
}

impl Handler<Flush> for SledStore {
    type Result = Result<()>;

    fn handle(&mut self, _: Flush, _: &mut Self::Context) -> Self::Result {
        match self.db {
            Some(ref db) => db.flush(),
            None => Ok(()),
        }
    }
}

impl Handler<LedgerEvent> for SledStore {
    type Result = ();
    fn handle(&mut self, msg: LedgerEvent, ctx: &mut Self::Context) -> Self::Result {
        if let LedgerEventData::Shutdown(_) = msg.get_data() {
            if let Some(db) = self.db.take() {
                if let Err(err) = db.flush() {
                    error!("Could not flush db on shutdown: {err}");
                }
            }
            ctx.stop()
        }
    }
}
