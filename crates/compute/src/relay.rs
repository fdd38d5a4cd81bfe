// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{LocalCoprocessor, OracleReply};
use actix::prelude::*;
use anyhow::Result;
use cb_events::{prelude::*, BusHandle, LedgerErrorKind, LedgerEvent, LedgerEventData, RequestId};
use std::time::Duration;
use tracing::{info, warn};

/// Plays the part of the external oracle for local deployments.
///
/// Watches for decryption requests on the bus, waits for the configured delay and then delivers
/// the coprocessor's reply to `target`.
pub struct OracleRelay<M>
where
    M: Message + From<OracleReply> + Send + 'static,
    M::Result: Send,
{
    coprocessor: LocalCoprocessor,
    target: Recipient<M>,
    bus: BusHandle,
    delay: Duration,
}

impl<M> OracleRelay<M>
where
    M: Message + From<OracleReply> + Send + 'static,
    M::Result: Send,
{
    pub fn new(
        bus: &BusHandle,
        coprocessor: &LocalCoprocessor,
        target: Recipient<M>,
        delay: Duration,
    ) -> Self {
        Self {
            coprocessor: coprocessor.clone(),
            target,
            bus: bus.clone(),
            delay,
        }
    }

    /// Start the relay and subscribe it to decryption requests
    pub fn attach(
        bus: &BusHandle,
        coprocessor: &LocalCoprocessor,
        target: Recipient<M>,
        delay: Duration,
    ) -> Addr<Self> {
        let addr = Self::new(bus, coprocessor, target, delay).start();
        bus.subscribe("DecryptionRequested", addr.clone().recipient());
        addr
    }

    fn deliver(&self, request_id: &RequestId) -> Result<()> {
        let reply = self.coprocessor.fulfil(request_id)?;
        info!("relaying oracle reply for {request_id}");
        self.target.do_send(M::from(reply));
        Ok(())
    }
}

impl<M> Actor for OracleRelay<M>
where
    M: Message + From<OracleReply> + Send + 'static,
    M::Result: Send,
{
    type Context = Context<Self>;
}

impl<M> Handler<LedgerEvent> for OracleRelay<M>
where
    M: Message + From<OracleReply> + Send + 'static,
    M::Result: Send,
{
    type Result = ();
    fn handle(&mut self, msg: LedgerEvent, ctx: &mut Self::Context) -> Self::Result {
        let LedgerEventData::DecryptionRequested(data) = msg.into_data() else {
            return;
        };
        let request_id = data.request_id;
        ctx.run_later(self.delay, move |act, _| {
            if let Err(err) = act.deliver(&request_id) {
                warn!("could not relay {request_id}: {err}");
                act.bus.err(LedgerErrorKind::Oracle, err);
            }
        });
    }
}

/// Deliver every request whose reply has not been accepted yet. Resolves once each reply has
/// been handled by the target. Replies the target rejects are delivered again next time.
#[derive(Message, Debug, Clone, Copy)]
#[rtype(result = "anyhow::Result<Vec<RequestId>>")]
pub struct RelayPending;

impl<M> Handler<RelayPending> for OracleRelay<M>
where
    M: Message + From<OracleReply> + Send + 'static,
    M::Result: Send,
{
    type Result = ResponseFuture<Result<Vec<RequestId>>>;
    fn handle(&mut self, _: RelayPending, _: &mut Self::Context) -> Self::Result {
        let coprocessor = self.coprocessor.clone();
        let target = self.target.clone();
        Box::pin(async move {
            let pending = coprocessor.pending_requests()?;
            for request_id in pending.iter() {
                let reply = coprocessor.fulfil(request_id)?;
                target.send(M::from(reply)).await?;
            }
            Ok(pending)
        })
    }
}
