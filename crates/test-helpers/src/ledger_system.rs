// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr};
use alloy_primitives::{address, Address};
use anyhow::Result;
use cb_compute::{LocalCoprocessor, OracleRelay};
use cb_data::{DataStore, ForwardTo, InMemStore, SledStore, WriteBuffer};
use cb_events::{
    prelude::*, BusHandle, HistoryCollector, LedgerErrorKind, LedgerEvent, LedgerEventData,
    Shutdown, TakeEvents,
};
use cb_ledger::{
    BatchLedger, BatchLedgerParams, ConfigAccessControl, DecryptionReady, EncryptedFields,
};
use cb_logger::SimpleLogger;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

pub const OWNER: Address = address!("0x1000000000000000000000000000000000000001");
pub const SUBMITTER: Address = address!("0x2000000000000000000000000000000000000002");
pub const SERVICE: Address = address!("0x5e41ce0000000000000000000000000000000005");
pub const ORACLE_SECRET: &str = "test-oracle-secret";

/// Builds a ledger with its bus, store and local coprocessor wired up the way the node runs it.
/// ```ignore
/// let system = LedgerSystemBuilder::new()
///     .with_relay(Duration::from_millis(10))
///     .build()
///     .await?;
/// ```
pub struct LedgerSystemBuilder {
    service: Address,
    access: Option<ConfigAccessControl>,
    relay_delay: Option<Duration>,
    sled_path: Option<PathBuf>,
    logging: bool,
}

impl Default for LedgerSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerSystemBuilder {
    pub fn new() -> Self {
        Self {
            service: SERVICE,
            access: None,
            relay_delay: None,
            sled_path: None,
            logging: false,
        }
    }

    pub fn with_service(mut self, service: Address) -> Self {
        self.service = service;
        self
    }

    pub fn with_access(mut self, access: ConfigAccessControl) -> Self {
        self.access = Some(access);
        self
    }

    /// Deliver oracle replies automatically after the delay
    pub fn with_relay(mut self, delay: Duration) -> Self {
        self.relay_delay = Some(delay);
        self
    }

    /// Persist to a sled database at the path instead of memory
    pub fn with_sled(mut self, path: &Path) -> Self {
        self.sled_path = Some(path.to_owned());
        self
    }

    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    pub async fn build(self) -> Result<LedgerSystem> {
        let bus = BusHandle::start_new();
        let history = bus.history();
        let errors = bus.errors();

        let buffer = WriteBuffer::new().start();
        let store = match &self.sled_path {
            Some(path) => {
                let sled = SledStore::new(&bus, path)?;
                buffer.send(ForwardTo::new(&sled)).await?;
                DataStore::from_sled_store(&sled, &buffer)
            }
            None => {
                let mem = InMemStore::new(false).start();
                buffer.send(ForwardTo::new(&mem)).await?;
                DataStore::from_in_mem(&mem, &buffer)
            }
        };

        if self.logging {
            SimpleLogger::attach("test", &bus);
        }

        let coprocessor = LocalCoprocessor::load(&store, ORACLE_SECRET).await?;
        let access = self.access.unwrap_or_else(|| {
            ConfigAccessControl::new(Some(OWNER), [SUBMITTER], false, Duration::ZERO)
        });
        let ledger = BatchLedger::attach(
            BatchLedgerParams {
                service: self.service,
                bus: bus.clone(),
                access: Box::new(access),
                compute: Arc::new(coprocessor.clone()),
                buffer: Some(buffer),
            },
            &store,
        )
        .await?;

        let relay = self.relay_delay.map(|delay| {
            OracleRelay::<DecryptionReady>::attach(
                &bus,
                &coprocessor,
                ledger.clone().recipient(),
                delay,
            )
        });

        Ok(LedgerSystem {
            service: self.service,
            ledger,
            coprocessor,
            relay,
            bus,
            store,
            history,
            errors,
        })
    }
}

pub struct LedgerSystem {
    pub service: Address,
    pub ledger: Addr<BatchLedger>,
    pub coprocessor: LocalCoprocessor,
    pub relay: Option<Addr<OracleRelay<DecryptionReady>>>,
    pub bus: BusHandle,
    pub store: DataStore,
    history: Addr<HistoryCollector<LedgerEvent>>,
    errors: Addr<HistoryCollector<LedgerEvent>>,
}

impl LedgerSystem {
    /// Client side encryption of one participant's fields
    pub fn encrypt(&self, staked: u64, tasks: u64, eligible: bool) -> Result<EncryptedFields> {
        Ok(EncryptedFields {
            staked: self.coprocessor.encrypt_u64(staked)?,
            tasks: self.coprocessor.encrypt_u64(tasks)?,
            eligible: self.coprocessor.encrypt_flag(eligible)?,
        })
    }

    /// Wait for the next `count` observations, errors included
    pub async fn take_events(&self, count: usize) -> Result<Vec<LedgerEventData>> {
        let events = self
            .history
            .send(TakeEvents::<LedgerEvent>::new(count))
            .await?;
        Ok(events.into_iter().map(|e| e.into_data()).collect())
    }

    pub async fn take_event_types(&self, count: usize) -> Result<Vec<String>> {
        let events = self
            .history
            .send(TakeEvents::<LedgerEvent>::new(count))
            .await?;
        Ok(events.iter().map(|e| e.event_type()).collect())
    }

    /// Wait for the next `count` reported error kinds
    pub async fn take_errors(&self, count: usize) -> Result<Vec<LedgerErrorKind>> {
        let events = self
            .errors
            .send(TakeEvents::<LedgerEvent>::new(count))
            .await?;
        Ok(events
            .iter()
            .filter_map(|e| e.as_error().map(|err| err.kind))
            .collect())
    }

    /// Wait until everything committed so far has reached the backend
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.flush().await?;
        self.bus.publish(Shutdown);
        Ok(())
    }
}
