// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr};
use anyhow::Result;
use cb_compute::{LocalCoprocessor, OracleRelay};
use cb_config::AppConfig;
use cb_data::{DataStore, ForwardTo, InMemStore, SledDb, SledStore, WriteBuffer};
use cb_events::{prelude::*, BusHandle, Shutdown};
use cb_ledger::{BatchLedger, BatchLedgerParams, ConfigAccessControl, DecryptionReady, RevealWriter};
use cb_logger::SimpleLogger;
use std::{sync::Arc, time::Duration};
use tracing::info;

// Lets bus subscribers handle the last observations before the process exits
const DRAIN_DELAY: Duration = Duration::from_millis(50);

/// Everything one cli invocation needs: the ledger loaded from the configured store, its bus and
/// the local coprocessor standing in for the oracle.
pub struct LedgerNode {
    pub config: AppConfig,
    pub bus: BusHandle,
    pub store: DataStore,
    pub coprocessor: LocalCoprocessor,
    pub ledger: Addr<BatchLedger>,
}

impl LedgerNode {
    pub async fn load(config: &AppConfig) -> Result<Self> {
        let bus = BusHandle::start_new();
        SimpleLogger::attach(&config.name(), &bus);

        let buffer = WriteBuffer::new().start();
        let store = if config.use_in_mem_store() {
            let mem = InMemStore::new(false).start();
            buffer.send(ForwardTo::new(&mem)).await?;
            DataStore::from_in_mem(&mem, &buffer)
        } else {
            let sled = SledStore::new(&bus, &config.db_file())?;
            buffer.send(ForwardTo::new(&sled)).await?;
            DataStore::from_sled_store(&sled, &buffer)
        };

        if let Some(path) = config.reveal_write_path() {
            RevealWriter::attach(&path, &bus);
        }

        let coprocessor =
            LocalCoprocessor::load(&store, &config.oracle().attestation_secret).await?;

        let ledger = BatchLedger::attach(
            BatchLedgerParams {
                service: config.address(),
                bus: bus.clone(),
                access: Box::new(ConfigAccessControl::from_config(config)),
                compute: Arc::new(coprocessor.clone()),
                buffer: Some(buffer),
            },
            &store,
        )
        .await?;

        Ok(Self {
            config: config.clone(),
            bus,
            store,
            coprocessor,
            ledger,
        })
    }

    /// Start a relay that answers on behalf of the oracle
    pub fn relay(&self) -> Addr<OracleRelay<DecryptionReady>> {
        OracleRelay::attach(
            &self.bus,
            &self.coprocessor,
            self.ledger.clone().recipient(),
            Duration::from_millis(self.config.oracle().relay_delay_ms),
        )
    }

    /// Flush committed writes and close the store
    pub async fn finish(self) -> Result<()> {
        self.store.flush().await?;
        actix::clock::sleep(DRAIN_DELAY).await;
        self.bus.publish(Shutdown);
        SledDb::close_all_connections();
        info!("done");
        Ok(())
    }
}
