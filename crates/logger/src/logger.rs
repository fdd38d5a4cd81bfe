// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr, Context, Handler};
use cb_events::{prelude::*, BusHandle, LedgerEvent, LedgerEventData};
use std::marker::PhantomData;
use tracing::{error, info};

pub trait EventLogging: Event {
    fn log(&self, logger_name: &str);
}

/// Logs every observation that crosses the bus
pub struct SimpleLogger<E: EventLogging> {
    name: String,
    _p: PhantomData<E>,
}

impl SimpleLogger<LedgerEvent> {
    pub fn attach(name: &str, bus: &BusHandle) -> Addr<Self> {
        let addr = Self {
            name: name.to_owned(),
            _p: PhantomData,
        }
        .start();
        bus.subscribe("*", addr.clone().recipient());
        info!(node=%name, "logger ready");
        addr
    }
}

impl<E: EventLogging> Actor for SimpleLogger<E> {
    type Context = Context<Self>;
}

impl<E: EventLogging> Handler<E> for SimpleLogger<E> {
    type Result = ();

    fn handle(&mut self, msg: E, _: &mut Self::Context) -> Self::Result {
        msg.log(&self.name);
    }
}

impl EventLogging for LedgerEvent {
    fn log(&self, logger_name: &str) {
        match self.get_data() {
            LedgerEventData::LedgerError(err) => {
                error!(me = logger_name, kind = %err.kind, "{}", err.message)
            }
            data => match data.batch_id() {
                Some(batch_id) => {
                    info!(me = logger_name, evt = %self, batch = %batch_id, "observed")
                }
                None => info!(me = logger_name, evt = %self, "observed"),
            },
        };
    }
}
