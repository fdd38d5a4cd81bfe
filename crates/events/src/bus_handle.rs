// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::fmt::Display;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use actix::{Actor, Addr, Recipient};
use derivative::Derivative;

use crate::{
    traits::{ErrorDispatcher, EventPublisher, EventSubscriber},
    EventBus, HistoryCollector, LedgerError, LedgerErrorKind, LedgerEvent, LedgerEventData,
    Subscribe,
};

/// Cloneable handle to the bus that stamps every published payload with the next number of a
/// process wide output sequence.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct BusHandle {
    bus: Addr<EventBus<LedgerEvent>>,
    #[derivative(Debug = "ignore")]
    seq: Arc<AtomicU64>,
}

impl BusHandle {
    pub fn new(bus: Addr<EventBus<LedgerEvent>>) -> Self {
        Self {
            bus,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a fresh bus and return a handle to it
    pub fn start_new() -> Self {
        Self::new(EventBus::<LedgerEvent>::default().start())
    }

    pub fn bus(&self) -> &Addr<EventBus<LedgerEvent>> {
        &self.bus
    }

    pub fn history(&self) -> Addr<HistoryCollector<LedgerEvent>> {
        EventBus::<LedgerEvent>::history(&self.bus)
    }

    pub fn errors(&self) -> Addr<HistoryCollector<LedgerEvent>> {
        EventBus::<LedgerEvent>::error(&self.bus)
    }

    /// Wrap the data in a sequenced event without sending it
    pub fn event_from(&self, data: impl Into<LedgerEventData>) -> LedgerEvent {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        LedgerEvent::new(seq, data)
    }
}

impl EventPublisher<LedgerEvent> for BusHandle {
    fn publish(&self, data: impl Into<LedgerEventData>) {
        let evt = self.event_from(data);
        self.bus.do_send(evt);
    }
}

impl ErrorDispatcher<LedgerEvent> for BusHandle {
    fn err(&self, err_type: LedgerErrorKind, error: impl Display) {
        self.publish(LedgerError::new(err_type, error));
    }
}

impl EventSubscriber<LedgerEvent> for BusHandle {
    fn subscribe(&self, event_type: &str, recipient: Recipient<LedgerEvent>) {
        self.bus.do_send(Subscribe::new(event_type, recipient))
    }

    fn subscribe_all(&self, event_types: &[&str], recipient: Recipient<LedgerEvent>) {
        for event_type in event_types.iter() {
            self.bus
                .do_send(Subscribe::new(*event_type, recipient.clone()));
        }
    }
}
