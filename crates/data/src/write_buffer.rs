// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{dev::ToEnvelope, Actor, Addr, Handler, Message, Recipient, ResponseFuture};
use anyhow::Result;
use tracing::trace;

use crate::{CommitSnapshot, DataOp, DiscardSnapshot, Flush, Insert, Remove, WriteBatch};

/// Collects the writes of one unit of work and forwards them to the backend as a single
/// [WriteBatch] on [CommitSnapshot].
pub struct WriteBuffer {
    dest: Option<ForwardTo>,
    buffer: Vec<DataOp>,
}

impl Actor for WriteBuffer {
    type Context = actix::Context<Self>;
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self {
            dest: None,
            buffer: Vec::new(),
        }
    }
}

impl Handler<ForwardTo> for WriteBuffer {
    type Result = ();
    fn handle(&mut self, msg: ForwardTo, _: &mut Self::Context) -> Self::Result {
        self.dest = Some(msg)
    }
}

impl Handler<Insert> for WriteBuffer {
    type Result = ();
    fn handle(&mut self, msg: Insert, _: &mut Self::Context) -> Self::Result {
        self.buffer.push(DataOp::Insert(msg));
    }
}

impl Handler<Remove> for WriteBuffer {
    type Result = ();
    fn handle(&mut self, msg: Remove, _: &mut Self::Context) -> Self::Result {
        self.buffer.push(DataOp::Remove(msg));
    }
}

impl Handler<CommitSnapshot> for WriteBuffer {
    type Result = ();
    fn handle(&mut self, _: CommitSnapshot, _: &mut Self::Context) -> Self::Result {
        let Some(ref dest) = self.dest else {
            return;
        };
        if self.buffer.is_empty() {
            return;
        }
        let ops = std::mem::take(&mut self.buffer);
        trace!("committing {} buffered operations", ops.len());
        dest.batch.do_send(WriteBatch::new(ops));
    }
}

impl Handler<DiscardSnapshot> for WriteBuffer {
    type Result = ();
    fn handle(&mut self, _: DiscardSnapshot, _: &mut Self::Context) -> Self::Result {
        if !self.buffer.is_empty() {
            trace!("discarding {} buffered operations", self.buffer.len());
            self.buffer.clear();
        }
    }
}

// Batches already sent sit ahead of this flush in the backend mailbox
impl Handler<Flush> for WriteBuffer {
    type Result = ResponseFuture<Result<()>>;
    fn handle(&mut self, _: Flush, _: &mut Self::Context) -> Self::Result {
        let dest = self.dest.as_ref().map(|d| d.flush.clone());
        Box::pin(async move {
            match dest {
                Some(flush) => flush.send(Flush).await?,
                None => Ok(()),
            }
        })
    }
}

#[derive(Message)]
#[rtype("()")]
pub struct ForwardTo {
    batch: Recipient<WriteBatch>,
    flush: Recipient<Flush>,
}

impl ForwardTo {
    pub fn new<A>(dest: &Addr<A>) -> Self
    where
        A: Actor + Handler<WriteBatch> + Handler<Flush>,
        A::Context: ToEnvelope<A, WriteBatch> + ToEnvelope<A, Flush>,
    {
        Self {
            batch: dest.clone().recipient(),
            flush: dest.clone().recipient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GetLog, InMemStore};

    #[actix::test]
    async fn commit_forwards_one_batch_and_discard_drops() -> Result<()> {
        let store = InMemStore::new(true).start();
        let buffer = WriteBuffer::new().start();
        buffer.send(ForwardTo::new(&store)).await?;

        buffer.send(Insert::new("//a", vec![1])).await?;
        buffer.send(DiscardSnapshot).await?;
        buffer.send(Insert::new("//b", vec![2])).await?;
        buffer.send(Remove::new("//c")).await?;
        buffer.send(CommitSnapshot).await?;
        buffer.send(Flush).await??;

        let log = store.send(GetLog).await?;
        assert_eq!(
            log,
            vec![
                DataOp::Insert(Insert::new("//b", vec![2])),
                DataOp::Remove(Remove::new("//c")),
            ]
        );
        Ok(())
    }
}
