// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr, Handler};
use anyhow::{Context, Result};
use cb_events::{prelude::*, BusHandle, DecryptionCompleted, LedgerEvent, LedgerEventData};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{error, info, trace};

/// Appends every completed reveal to a file as one JSON line
pub struct RevealWriter {
    path: PathBuf,
}

impl RevealWriter {
    pub fn attach(path: &Path, bus: &BusHandle) -> Addr<Self> {
        let addr = Self {
            path: path.to_owned(),
        }
        .start();
        bus.subscribe("DecryptionCompleted", addr.clone().recipient());
        addr
    }

    fn append(&self, data: &DecryptionCompleted) -> Result<()> {
        let abs_path = if self.path.is_absolute() {
            self.path.clone()
        } else {
            std::env::current_dir()?.join(&self.path)
        };
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_vec(data)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&abs_path)
            .with_context(|| format!("could not open {}", abs_path.display()))?;
        file.write_all(&line)?;
        trace!(path = ?abs_path, "reveal appended");
        Ok(())
    }
}

impl Actor for RevealWriter {
    type Context = actix::Context<Self>;
}

impl Handler<LedgerEvent> for RevealWriter {
    type Result = ();
    fn handle(&mut self, msg: LedgerEvent, _: &mut Self::Context) -> Self::Result {
        let LedgerEventData::DecryptionCompleted(data) = msg.into_data() else {
            return;
        };
        info!(path = ?&self.path, "writing revealed totals for {}", data.batch_id);
        if let Err(e) = self.append(&data) {
            error!("{e}");
        }
    }
}
