// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    check_guards, AccessControl, BatchAggregate, BatchLifecycle, CallbackVerifier, ContextStore,
    Correction, DecryptionContext, DecryptionCoordinator, EncryptedAggregator, EncryptedFields,
    EncryptedValueStore, Guard, LedgerError, LedgerResult, LifecycleRepositoryFactory, Phase,
    RevealRequest, RevealedTotals,
};
use actix::prelude::*;
use alloy_primitives::Address;
use anyhow::Result;
use cb_compute::{ConfidentialCompute, OracleReply};
use cb_data::{CommitSnapshot, DataStore, DiscardSnapshot, RepositoriesFactory, WriteBuffer};
use cb_events::{
    prelude::*, AggregateCorrected, BatchClosed, BatchId, BatchOpened, BusHandle,
    DecryptionCompleted, DecryptionRequested, LedgerEventData, Participant, RequestId,
    SubmissionRecorded,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

const OPERATOR_GUARDS: &[Guard] = &[Guard::Authorized, Guard::NotPaused];
const SUBMIT_GUARDS: &[Guard] = &[Guard::Authorized, Guard::NotPaused, Guard::Cooldown];
const CORRECTION_GUARDS: &[Guard] = &[Guard::Owner, Guard::NotPaused];
const REVEAL_GUARDS: &[Guard] = &[Guard::Authorized, Guard::NotPaused, Guard::Cooldown];

/// Sequences every state changing operation on the batch ledger.
///
/// Handlers run to completion over in-memory state. The writes of one operation are held in the
/// [WriteBuffer] and go to the backend as a single batch once the operation succeeds. A failed
/// operation discards them, along with whatever the compute capability staged for it, and is
/// reported on the bus with its error kind.
pub struct BatchLedger {
    service: Address,
    bus: BusHandle,
    access: Box<dyn AccessControl>,
    compute: Arc<dyn ConfidentialCompute>,
    lifecycle: BatchLifecycle,
    values: EncryptedValueStore,
    contexts: ContextStore,
    buffer: Option<Addr<WriteBuffer>>,
}

pub struct BatchLedgerParams {
    /// Identity the digest binds to and the oracle calls back
    pub service: Address,
    pub bus: BusHandle,
    pub access: Box<dyn AccessControl>,
    pub compute: Arc<dyn ConfidentialCompute>,
    /// Set when the store routes its writes through a buffer
    pub buffer: Option<Addr<WriteBuffer>>,
}

impl BatchLedger {
    pub async fn load(params: BatchLedgerParams, store: &DataStore) -> Result<Self> {
        let repositories = store.repositories();
        let lifecycle = BatchLifecycle::load(&repositories.lifecycle()).await?;
        let highest = lifecycle.state().highest();
        let values = EncryptedValueStore::load(store, highest).await?;
        let contexts = ContextStore::load(store).await?;
        info!(
            "ledger loaded at {highest} ({}) with {} decryption contexts",
            lifecycle.state().phase(),
            contexts.list().len()
        );
        Ok(Self {
            service: params.service,
            bus: params.bus,
            access: params.access,
            compute: params.compute,
            lifecycle,
            values,
            contexts,
            buffer: params.buffer,
        })
    }

    pub async fn attach(params: BatchLedgerParams, store: &DataStore) -> Result<Addr<Self>> {
        Ok(Self::load(params, store).await?.start())
    }

    pub fn service(&self) -> Address {
        self.service
    }

    /// Run one operation. Its writes are committed and its observations published only when it
    /// succeeds.
    fn run<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> LedgerResult<(T, Vec<LedgerEventData>)>,
    ) -> LedgerResult<T> {
        match op(self) {
            Ok((value, events)) => {
                if let Err(err) = self.compute.commit() {
                    error!("compute could not keep its staged work: {err}");
                }
                if let Some(buffer) = &self.buffer {
                    buffer.do_send(CommitSnapshot);
                }
                for event in events {
                    self.bus.publish(event);
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(discard) = self.compute.discard() {
                    error!("compute could not drop its staged work: {discard}");
                }
                if let Some(buffer) = &self.buffer {
                    buffer.do_send(DiscardSnapshot);
                }
                warn!("rejected: {err}");
                self.bus.err(err.kind(), &err);
                Err(err)
            }
        }
    }

    fn guard(&self, guards: &[Guard], caller: &Participant) -> LedgerResult<()> {
        check_guards(self.access.as_ref(), guards, caller)
    }
}

impl Actor for BatchLedger {
    type Context = Context<Self>;
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "LedgerResult<BatchId>")]
pub struct OpenBatch {
    pub caller: Participant,
}

impl Handler<OpenBatch> for BatchLedger {
    type Result = LedgerResult<BatchId>;
    fn handle(&mut self, msg: OpenBatch, _: &mut Self::Context) -> Self::Result {
        self.run(|act| {
            act.guard(OPERATOR_GUARDS, &msg.caller)?;
            let batch_id = act.lifecycle.open_batch()?;
            info!("{batch_id} opened by {}", msg.caller);
            Ok((batch_id, vec![BatchOpened { batch_id }.into()]))
        })
    }
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "LedgerResult<BatchId>")]
pub struct CloseBatch {
    pub caller: Participant,
}

impl Handler<CloseBatch> for BatchLedger {
    type Result = LedgerResult<BatchId>;
    fn handle(&mut self, msg: CloseBatch, _: &mut Self::Context) -> Self::Result {
        self.run(|act| {
            act.guard(OPERATOR_GUARDS, &msg.caller)?;
            let batch_id = act.lifecycle.close_batch()?;
            let participants = act.values.participants(batch_id).len() as u64;
            info!("{batch_id} closed with {participants} participants");
            Ok((
                batch_id,
                vec![BatchClosed {
                    batch_id,
                    participants,
                }
                .into()],
            ))
        })
    }
}

/// Record a participant's encrypted fields in the open batch. Resolves to whether an earlier
/// submission was overwritten.
#[derive(Message, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "LedgerResult<bool>")]
pub struct Submit {
    pub caller: Participant,
    pub batch_id: BatchId,
    pub participant: Participant,
    pub fields: EncryptedFields,
}

impl Handler<Submit> for BatchLedger {
    type Result = LedgerResult<bool>;
    fn handle(&mut self, msg: Submit, _: &mut Self::Context) -> Self::Result {
        self.run(|act| {
            act.guard(SUBMIT_GUARDS, &msg.caller)?;
            act.lifecycle.state().ensure_open(msg.batch_id)?;
            let overwritten = EncryptedAggregator::new(act.compute.as_ref()).submit(
                &mut act.values,
                msg.batch_id,
                msg.participant,
                msg.fields,
            )?;
            act.access.record_call(&msg.caller);
            Ok((
                overwritten,
                vec![SubmissionRecorded {
                    participant: msg.participant,
                    batch_id: msg.batch_id,
                    overwritten,
                }
                .into()],
            ))
        })
    }
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "LedgerResult<BatchAggregate>")]
pub struct ApplyCorrection {
    pub caller: Participant,
    pub batch_id: BatchId,
    pub correction: Correction,
}

impl Handler<ApplyCorrection> for BatchLedger {
    type Result = LedgerResult<BatchAggregate>;
    fn handle(&mut self, msg: ApplyCorrection, _: &mut Self::Context) -> Self::Result {
        self.run(|act| {
            act.guard(CORRECTION_GUARDS, &msg.caller)?;
            act.lifecycle.state().ensure_settled(msg.batch_id)?;
            if msg.correction.is_empty() {
                return Err(LedgerError::EmptyCorrection(msg.batch_id));
            }
            let corrected = EncryptedAggregator::new(act.compute.as_ref()).apply_correction(
                &mut act.values,
                msg.batch_id,
                &msg.correction,
            )?;
            info!("{} corrected by {}", msg.batch_id, msg.caller);
            Ok((
                corrected,
                vec![AggregateCorrected {
                    batch_id: msg.batch_id,
                    corrected_by: msg.caller,
                }
                .into()],
            ))
        })
    }
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "LedgerResult<RevealRequest>")]
pub struct RequestReveal {
    pub caller: Participant,
    pub batch_id: BatchId,
}

impl Handler<RequestReveal> for BatchLedger {
    type Result = LedgerResult<RevealRequest>;
    fn handle(&mut self, msg: RequestReveal, _: &mut Self::Context) -> Self::Result {
        self.run(|act| {
            act.guard(REVEAL_GUARDS, &msg.caller)?;
            act.lifecycle.state().ensure_settled(msg.batch_id)?;
            let request = DecryptionCoordinator::new(act.service, act.compute.as_ref())
                .request_reveal(&act.values, &mut act.contexts, msg.batch_id)?;
            act.access.record_call(&msg.caller);
            Ok((
                request,
                vec![DecryptionRequested {
                    request_id: request.request_id,
                    batch_id: request.batch_id,
                    digest: request.digest,
                }
                .into()],
            ))
        })
    }
}

/// The oracle's reply to a decryption request. Trusted through its attestation only, so no
/// caller guards apply.
#[derive(Message, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "LedgerResult<RevealedTotals>")]
pub struct DecryptionReady {
    pub request_id: RequestId,
    pub cleartext: Vec<u8>,
    pub attestation: Vec<u8>,
}

impl From<OracleReply> for DecryptionReady {
    fn from(value: OracleReply) -> Self {
        Self {
            request_id: value.request_id,
            cleartext: value.cleartext,
            attestation: value.attestation,
        }
    }
}

impl Handler<DecryptionReady> for BatchLedger {
    type Result = LedgerResult<RevealedTotals>;
    fn handle(&mut self, msg: DecryptionReady, _: &mut Self::Context) -> Self::Result {
        self.run(|act| {
            let reveal = CallbackVerifier::new(act.service, act.compute.as_ref())
                .on_decryption_ready(
                    &act.values,
                    &mut act.contexts,
                    msg.request_id,
                    &msg.cleartext,
                    &msg.attestation,
                )?;
            let totals = reveal.totals;
            Ok((
                totals,
                vec![DecryptionCompleted {
                    request_id: reveal.request_id,
                    batch_id: reveal.batch_id,
                    total_staked: totals.total_staked,
                    total_task_completions: totals.total_task_completions,
                    total_eligible_users: totals.total_eligible_users,
                }
                .into()],
            ))
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatus {
    pub phase: Phase,
    pub current: Option<BatchId>,
    pub highest: BatchId,
}

#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "LedgerStatus")]
pub struct GetStatus;

impl Handler<GetStatus> for BatchLedger {
    type Result = MessageResult<GetStatus>;
    fn handle(&mut self, _: GetStatus, _: &mut Self::Context) -> Self::Result {
        let state = self.lifecycle.state();
        MessageResult(LedgerStatus {
            phase: state.phase(),
            current: state.current_open(),
            highest: state.highest(),
        })
    }
}

#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "Vec<Participant>")]
pub struct GetParticipants(pub BatchId);

impl Handler<GetParticipants> for BatchLedger {
    type Result = Vec<Participant>;
    fn handle(&mut self, msg: GetParticipants, _: &mut Self::Context) -> Self::Result {
        self.values.participants(msg.0)
    }
}

#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "BatchAggregate")]
pub struct GetAggregate(pub BatchId);

impl Handler<GetAggregate> for BatchLedger {
    type Result = MessageResult<GetAggregate>;
    fn handle(&mut self, msg: GetAggregate, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.values.aggregate(msg.0))
    }
}

#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "Option<DecryptionContext>")]
pub struct GetContext(pub RequestId);

impl Handler<GetContext> for BatchLedger {
    type Result = Option<DecryptionContext>;
    fn handle(&mut self, msg: GetContext, _: &mut Self::Context) -> Self::Result {
        self.contexts.get(&msg.0)
    }
}

#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "Vec<(RequestId, DecryptionContext)>")]
pub struct ListContexts;

impl Handler<ListContexts> for BatchLedger {
    type Result = Vec<(RequestId, DecryptionContext)>;
    fn handle(&mut self, _: ListContexts, _: &mut Self::Context) -> Self::Result {
        self.contexts.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigAccessControl;
    use alloy_primitives::address;
    use cb_compute::LocalCoprocessor;
    use cb_data::{DataOp, ForwardTo, GetLog, InMemStore};
    use cb_events::{LedgerErrorKind, LedgerEvent, TakeEvents};
    use std::time::Duration;

    const OWNER: Address = address!("0x00000000000000000000000000000000000000aa");
    const SUBMITTER: Address = address!("0x00000000000000000000000000000000000000bb");
    const STRANGER: Address = address!("0x00000000000000000000000000000000000000cc");
    const SERVICE: Address = address!("0x00000000000000000000000000000000000000ee");

    struct Setup {
        ledger: Addr<BatchLedger>,
        cop: LocalCoprocessor,
        bus: BusHandle,
        mem: Addr<InMemStore>,
        store: DataStore,
    }

    async fn setup_with(access: ConfigAccessControl) -> Result<Setup> {
        let mem = InMemStore::new(true).start();
        let buffer = WriteBuffer::new().start();
        buffer.send(ForwardTo::new(&mem)).await?;
        let store = DataStore::from_in_mem(&mem, &buffer);
        let bus = BusHandle::start_new();
        let cop = LocalCoprocessor::load(&store, "secret").await?;
        let ledger = BatchLedger::attach(
            BatchLedgerParams {
                service: SERVICE,
                bus: bus.clone(),
                access: Box::new(access),
                compute: Arc::new(cop.clone()),
                buffer: Some(buffer),
            },
            &store,
        )
        .await?;
        Ok(Setup {
            ledger,
            cop,
            bus,
            mem,
            store,
        })
    }

    async fn setup() -> Result<Setup> {
        setup_with(ConfigAccessControl::new(
            Some(OWNER),
            [SUBMITTER],
            false,
            Duration::ZERO,
        ))
        .await
    }

    fn fields(
        cop: &LocalCoprocessor,
        staked: u64,
        tasks: u64,
        eligible: bool,
    ) -> Result<EncryptedFields> {
        Ok(EncryptedFields {
            staked: cop.encrypt_u64(staked)?,
            tasks: cop.encrypt_u64(tasks)?,
            eligible: cop.encrypt_flag(eligible)?,
        })
    }

    #[actix::test]
    async fn lifecycle_operations_publish_observations() -> Result<()> {
        let s = setup().await?;
        let history = s.bus.history();

        assert_eq!(s.ledger.send(OpenBatch { caller: OWNER }).await??, BatchId::new(1));
        assert_eq!(
            s.ledger.send(OpenBatch { caller: OWNER }).await?,
            Err(LedgerError::BatchAlreadyOpen(BatchId::new(1)))
        );
        let submitted = fields(&s.cop, 5, 1, true)?;
        let overwritten = s
            .ledger
            .send(Submit {
                caller: SUBMITTER,
                batch_id: BatchId::new(1),
                participant: SUBMITTER,
                fields: submitted,
            })
            .await??;
        assert!(!overwritten);
        s.ledger.send(CloseBatch { caller: OWNER }).await??;

        let status = s.ledger.send(GetStatus).await?;
        assert_eq!(status.phase, Phase::Closed(BatchId::new(1)));
        assert_eq!(status.highest, BatchId::new(1));

        let events: Vec<String> = history
            .send(TakeEvents::<LedgerEvent>::new(4))
            .await?
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            events,
            vec![
                "BatchOpened",
                "LedgerError",
                "SubmissionRecorded",
                "BatchClosed"
            ]
        );
        Ok(())
    }

    #[actix::test]
    async fn guards_run_before_lifecycle_checks() -> Result<()> {
        let s = setup().await?;
        let errors = s.bus.errors();

        assert_eq!(
            s.ledger.send(OpenBatch { caller: STRANGER }).await?,
            Err(LedgerError::Unauthorized(STRANGER))
        );
        // Submitting to a batch that does not exist is still an authorization failure first
        let submitted = fields(&s.cop, 1, 1, false)?;
        assert_eq!(
            s.ledger
                .send(Submit {
                    caller: STRANGER,
                    batch_id: BatchId::new(7),
                    participant: STRANGER,
                    fields: submitted,
                })
                .await?,
            Err(LedgerError::Unauthorized(STRANGER))
        );
        s.ledger.send(OpenBatch { caller: SUBMITTER }).await??;
        s.ledger.send(CloseBatch { caller: SUBMITTER }).await??;
        assert_eq!(
            s.ledger
                .send(ApplyCorrection {
                    caller: SUBMITTER,
                    batch_id: BatchId::new(1),
                    correction: Correction::default(),
                })
                .await?,
            Err(LedgerError::Unauthorized(SUBMITTER))
        );

        let kinds: Vec<LedgerErrorKind> = errors
            .send(TakeEvents::<LedgerEvent>::new(3))
            .await?
            .iter()
            .filter_map(|e| e.as_error().map(|e| e.kind))
            .collect();
        assert_eq!(kinds, vec![LedgerErrorKind::Unauthorized; 3]);
        Ok(())
    }

    #[actix::test]
    async fn paused_ledger_rejects_everything_but_callbacks() -> Result<()> {
        let s = setup_with(ConfigAccessControl::new(
            Some(OWNER),
            [],
            true,
            Duration::ZERO,
        ))
        .await?;
        assert_eq!(
            s.ledger.send(OpenBatch { caller: OWNER }).await?,
            Err(LedgerError::SystemPaused)
        );
        let id = RequestId::new(alloy_primitives::B256::repeat_byte(3));
        assert_eq!(
            s.ledger
                .send(DecryptionReady {
                    request_id: id,
                    cleartext: vec![],
                    attestation: vec![],
                })
                .await?,
            Err(LedgerError::UnknownRequest(id))
        );
        Ok(())
    }

    #[actix::test]
    async fn cooldown_applies_per_caller() -> Result<()> {
        let s = setup_with(ConfigAccessControl::new(
            Some(OWNER),
            [SUBMITTER],
            false,
            Duration::from_secs(3600),
        ))
        .await?;
        s.ledger.send(OpenBatch { caller: OWNER }).await??;
        let batch_id = BatchId::new(1);
        let first = fields(&s.cop, 1, 1, true)?;
        let second = fields(&s.cop, 2, 2, true)?;
        s.ledger
            .send(Submit {
                caller: SUBMITTER,
                batch_id,
                participant: SUBMITTER,
                fields: first,
            })
            .await??;
        assert_eq!(
            s.ledger
                .send(Submit {
                    caller: SUBMITTER,
                    batch_id,
                    participant: SUBMITTER,
                    fields: second,
                })
                .await?,
            Err(LedgerError::RateLimited(SUBMITTER))
        );
        // a different caller is not held back
        s.ledger
            .send(Submit {
                caller: OWNER,
                batch_id,
                participant: OWNER,
                fields: second,
            })
            .await??;
        Ok(())
    }

    #[actix::test]
    async fn failed_operations_leave_nothing_on_disk() -> Result<()> {
        let s = setup().await?;
        s.ledger.send(OpenBatch { caller: OWNER }).await??;
        s.store.flush().await?;
        let committed = s.mem.send(GetLog).await?.len();

        // Unknown handles fail inside the aggregator after the guards passed
        let bogus = EncryptedFields {
            staked: alloy_primitives::B256::repeat_byte(0x42).into(),
            tasks: alloy_primitives::B256::repeat_byte(0x43).into(),
            eligible: alloy_primitives::B256::repeat_byte(0x44).into(),
        };
        let res = s
            .ledger
            .send(Submit {
                caller: OWNER,
                batch_id: BatchId::new(1),
                participant: OWNER,
                fields: bogus,
            })
            .await?;
        assert!(matches!(res, Err(LedgerError::Compute(_))));
        assert!(s.ledger.send(GetParticipants(BatchId::new(1))).await?.is_empty());

        // a later success must not carry the failed writes along
        s.ledger.send(CloseBatch { caller: OWNER }).await??;
        s.store.flush().await?;
        let log = s.mem.send(GetLog).await?;
        assert!(log.len() > committed);
        assert!(!log.iter().any(|op| {
            let key = match op {
                DataOp::Insert(insert) => insert.key(),
                DataOp::Remove(remove) => remove.key(),
            };
            String::from_utf8_lossy(key).contains("submissions")
        }));
        Ok(())
    }

    #[actix::test]
    async fn reveal_round_trip_through_the_coprocessor() -> Result<()> {
        let s = setup().await?;
        s.ledger.send(OpenBatch { caller: OWNER }).await??;
        for (who, staked, tasks, eligible) in
            [(OWNER, 100, 3, true), (SUBMITTER, 50, 2, false)]
        {
            let submitted = fields(&s.cop, staked, tasks, eligible)?;
            s.ledger
                .send(Submit {
                    caller: who,
                    batch_id: BatchId::new(1),
                    participant: who,
                    fields: submitted,
                })
                .await??;
        }
        s.ledger.send(CloseBatch { caller: OWNER }).await??;

        let request = s
            .ledger
            .send(RequestReveal {
                caller: OWNER,
                batch_id: BatchId::new(1),
            })
            .await??;
        let reply = s.cop.fulfil(&request.request_id)?;
        let totals = s.ledger.send(DecryptionReady::from(reply)).await??;
        assert_eq!(totals.to_array(), [150, 5, 1]);

        let context = s
            .ledger
            .send(GetContext(request.request_id))
            .await?
            .ok_or_else(|| anyhow::anyhow!("context missing"))?;
        assert!(context.processed);
        assert_eq!(context.revealed, Some(totals));
        assert_eq!(context.digest, request.digest);
        Ok(())
    }

    async fn closed_batch(s: &Setup, staked: u64) -> Result<BatchId> {
        let batch_id = s.ledger.send(OpenBatch { caller: OWNER }).await??;
        let submitted = fields(&s.cop, staked, 1, true)?;
        s.ledger
            .send(Submit {
                caller: OWNER,
                batch_id,
                participant: OWNER,
                fields: submitted,
            })
            .await??;
        s.ledger.send(CloseBatch { caller: OWNER }).await??;
        Ok(batch_id)
    }

    #[actix::test]
    async fn empty_correction_is_rejected() -> Result<()> {
        let s = setup().await?;
        let batch_id = closed_batch(&s, 10).await?;
        let before = s.ledger.send(GetAggregate(batch_id)).await?;

        assert_eq!(
            s.ledger
                .send(ApplyCorrection {
                    caller: OWNER,
                    batch_id,
                    correction: Correction::default(),
                })
                .await?,
            Err(LedgerError::EmptyCorrection(batch_id))
        );
        assert_eq!(s.ledger.send(GetAggregate(batch_id)).await?, before);

        let delta = s.cop.encrypt_u64(5)?;
        let corrected = s
            .ledger
            .send(ApplyCorrection {
                caller: OWNER,
                batch_id,
                correction: Correction {
                    staked: Some(delta),
                    ..Correction::default()
                },
            })
            .await??;
        assert_ne!(corrected.total_staked, before.total_staked);
        assert_eq!(corrected.total_task_completions, before.total_task_completions);
        Ok(())
    }

    #[actix::test]
    async fn rejected_callback_leaves_the_coprocessor_untouched() -> Result<()> {
        let s = setup().await?;
        let first = closed_batch(&s, 10).await?;
        let second = closed_batch(&s, 20).await?;
        let a = s
            .ledger
            .send(RequestReveal {
                caller: OWNER,
                batch_id: first,
            })
            .await??;
        let b = s
            .ledger
            .send(RequestReveal {
                caller: OWNER,
                batch_id: second,
            })
            .await??;

        let mut tampered = s.cop.fulfil(&a.request_id)?;
        tampered.cleartext[31] ^= 1;
        assert_eq!(
            s.ledger.send(DecryptionReady::from(tampered)).await?,
            Err(LedgerError::DecryptionFailed(a.request_id))
        );
        let reply = s.cop.fulfil(&b.request_id)?;
        s.ledger.send(DecryptionReady::from(reply)).await??;

        assert_eq!(s.cop.pending_requests()?, vec![a.request_id]);
        s.store.flush().await?;
        let reloaded = LocalCoprocessor::load(&s.store, "secret").await?;
        assert_eq!(reloaded.pending_requests()?, vec![a.request_id]);

        // the genuine reply is still accepted
        let reply = reloaded.fulfil(&a.request_id)?;
        let totals = s.ledger.send(DecryptionReady::from(reply)).await??;
        assert_eq!(totals.to_array(), [10, 1, 1]);
        assert!(s.cop.pending_requests()?.is_empty());
        Ok(())
    }

    #[actix::test]
    async fn rejected_correction_derives_nothing() -> Result<()> {
        let s = setup().await?;
        let batch_id = closed_batch(&s, 10).await?;
        let before = s.ledger.send(GetAggregate(batch_id)).await?;
        s.store.flush().await?;
        let committed = s.mem.send(GetLog).await?.len();

        // the staked delta combines before the flag in the tasks slot fails
        let correction = Correction {
            staked: Some(s.cop.encrypt_u64(1)?),
            tasks: Some(s.cop.encrypt_flag(true)?),
            eligible_count: None,
        };
        let res = s
            .ledger
            .send(ApplyCorrection {
                caller: OWNER,
                batch_id,
                correction,
            })
            .await?;
        assert!(matches!(res, Err(LedgerError::Compute(_))));
        assert_eq!(s.ledger.send(GetAggregate(batch_id)).await?, before);

        s.ledger.send(OpenBatch { caller: OWNER }).await??;
        s.store.flush().await?;
        let log = s.mem.send(GetLog).await?;
        assert!(!log[committed..].iter().any(|op| {
            let DataOp::Insert(insert) = op else {
                return false;
            };
            String::from_utf8_lossy(insert.key()).contains("coprocessor/derived")
        }));
        Ok(())
    }
}
