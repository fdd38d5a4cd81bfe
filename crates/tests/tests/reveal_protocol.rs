// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::{B256, U256};
use anyhow::{Context, Result};
use cb_compute::ConfidentialCompute;
use cb_events::{BatchId, DecryptionCompleted, LedgerErrorKind, LedgerEventData};
use cb_ledger::{
    ApplyCorrection, CloseBatch, Correction, DecryptionReady, GetContext, LedgerError, OpenBatch,
    RequestReveal, RevealHandles, RevealRequest, Submit,
};
use cb_test_helpers::{LedgerSystem, LedgerSystemBuilder, OWNER, SUBMITTER};
use std::time::Duration;

/// Open batch 1, record one submission from each known caller and close it
async fn settled_batch(system: &LedgerSystem) -> Result<BatchId> {
    let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    for (participant, staked, tasks, eligible) in
        [(OWNER, 1_000, 4, true), (SUBMITTER, 250, 1, false)]
    {
        let fields = system.encrypt(staked, tasks, eligible)?;
        system
            .ledger
            .send(Submit {
                caller: participant,
                batch_id,
                participant,
                fields,
            })
            .await??;
    }
    system.ledger.send(CloseBatch { caller: OWNER }).await??;
    Ok(batch_id)
}

async fn request_reveal(system: &LedgerSystem, batch_id: BatchId) -> Result<RevealRequest> {
    Ok(system
        .ledger
        .send(RequestReveal {
            caller: OWNER,
            batch_id,
        })
        .await??)
}

async fn oracle_reply(system: &LedgerSystem, request: &RevealRequest) -> Result<DecryptionReady> {
    Ok(system.coprocessor.fulfil(&request.request_id)?.into())
}

#[actix::test]
async fn reveal_completes_with_decoded_totals() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let batch_id = settled_batch(&system).await?;

    let request = request_reveal(&system, batch_id).await?;
    assert_eq!(request.batch_id, BatchId::new(1));
    assert_eq!(request.digest, request.handles.digest(system.service));

    let reply = oracle_reply(&system, &request).await?;
    let totals = system.ledger.send(reply).await??;
    assert_eq!(totals.to_array(), [1_250, 5, 1]);

    let events = system.take_events(6).await?;
    assert_eq!(
        events.last(),
        Some(&LedgerEventData::DecryptionCompleted(DecryptionCompleted {
            request_id: request.request_id,
            batch_id,
            total_staked: 1_250,
            total_task_completions: 5,
            total_eligible_users: 1,
        }))
    );
    Ok(())
}

#[actix::test]
async fn second_callback_is_a_replay() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let batch_id = settled_batch(&system).await?;
    let request = request_reveal(&system, batch_id).await?;
    let reply = oracle_reply(&system, &request).await?;

    system.ledger.send(reply.clone()).await??;
    assert_eq!(
        system.ledger.send(reply.clone()).await?,
        Err(LedgerError::ReplayAttempt(request.request_id))
    );

    // The replay guard fires before the attestation is even looked at
    let forged = DecryptionReady {
        attestation: vec![0; 32],
        ..reply
    };
    assert_eq!(
        system.ledger.send(forged).await?,
        Err(LedgerError::ReplayAttempt(request.request_id))
    );
    assert_eq!(
        system.take_errors(2).await?,
        vec![LedgerErrorKind::ReplayAttempt; 2]
    );
    Ok(())
}

#[actix::test]
async fn correction_between_request_and_callback_is_detected() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let first = settled_batch(&system).await?;
    let request = request_reveal(&system, first).await?;

    // Unrelated activity on the next batch does not disturb batch 1
    let second = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    let fields = system.encrypt(9, 9, true)?;
    system
        .ledger
        .send(Submit {
            caller: SUBMITTER,
            batch_id: second,
            participant: SUBMITTER,
            fields,
        })
        .await??;

    let correction = Correction {
        staked: Some(system.coprocessor.encrypt_u64(5)?),
        ..Correction::default()
    };
    system
        .ledger
        .send(ApplyCorrection {
            caller: OWNER,
            batch_id: first,
            correction,
        })
        .await??;

    let reply = oracle_reply(&system, &request).await?;
    assert_eq!(
        system.ledger.send(reply).await?,
        Err(LedgerError::StateMismatch(first))
    );

    let context = system
        .ledger
        .send(GetContext(request.request_id))
        .await?
        .context("context was not recorded")?;
    assert!(!context.processed);
    assert_eq!(context.revealed, None);
    Ok(())
}

#[actix::test]
async fn submissions_to_another_batch_keep_a_pending_reveal_valid() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let first = settled_batch(&system).await?;
    let request = request_reveal(&system, first).await?;

    let second = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    let fields = system.encrypt(1, 1, true)?;
    system
        .ledger
        .send(Submit {
            caller: OWNER,
            batch_id: second,
            participant: OWNER,
            fields,
        })
        .await??;

    let reply = oracle_reply(&system, &request).await?;
    let totals = system.ledger.send(reply).await??;
    assert_eq!(totals.to_array(), [1_250, 5, 1]);
    Ok(())
}

#[actix::test]
async fn reveal_of_the_open_batch_is_refused() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    settled_batch(&system).await?;
    let open = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    assert_eq!(open, BatchId::new(2));

    assert_eq!(
        system
            .ledger
            .send(RequestReveal {
                caller: OWNER,
                batch_id: open,
            })
            .await?,
        Err(LedgerError::BatchStillOpen(open))
    );
    Ok(())
}

#[actix::test]
async fn reveal_of_an_unallocated_batch_is_refused() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    settled_batch(&system).await?;

    for batch_id in [BatchId::new(99), BatchId::NONE] {
        assert_eq!(
            system
                .ledger
                .send(RequestReveal {
                    caller: OWNER,
                    batch_id,
                })
                .await?,
            Err(LedgerError::InvalidBatchId(batch_id))
        );
    }
    assert_eq!(
        system.take_errors(2).await?,
        vec![LedgerErrorKind::InvalidBatchId; 2]
    );
    Ok(())
}

#[actix::test]
async fn bad_attestation_fails_without_consuming_the_request() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let batch_id = settled_batch(&system).await?;
    let request = request_reveal(&system, batch_id).await?;
    let reply = oracle_reply(&system, &request).await?;

    let mut tampered = reply.clone();
    tampered.cleartext[31] ^= 1;
    assert_eq!(
        system.ledger.send(tampered).await?,
        Err(LedgerError::DecryptionFailed(request.request_id))
    );

    // the genuine reply still goes through afterwards
    system.ledger.send(reply).await??;
    Ok(())
}

#[actix::test]
async fn malformed_cleartext_is_a_decode_fault() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let batch_id = settled_batch(&system).await?;
    let request = request_reveal(&system, batch_id).await?;

    let short = vec![0u8; 64];
    let mut oversized = vec![0u8; 96];
    oversized[..32].copy_from_slice(&(U256::from(u64::MAX) + U256::from(1)).to_be_bytes::<32>());

    for cleartext in [short, oversized] {
        let attestation = system.coprocessor.attest(&request.request_id, &cleartext);
        let res = system
            .ledger
            .send(DecryptionReady {
                request_id: request.request_id,
                cleartext,
                attestation,
            })
            .await?;
        assert!(matches!(res, Err(LedgerError::DecodeFault(_))), "{res:?}");
    }
    Ok(())
}

#[actix::test]
async fn unknown_request_is_rejected() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let request_id = cb_events::RequestId::new(B256::repeat_byte(0xab));
    assert_eq!(
        system
            .ledger
            .send(DecryptionReady {
                request_id,
                cleartext: vec![0; 96],
                attestation: vec![],
            })
            .await?,
        Err(LedgerError::UnknownRequest(request_id))
    );
    Ok(())
}

#[actix::test]
async fn empty_batch_reveals_zero_totals() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    system.ledger.send(CloseBatch { caller: OWNER }).await??;

    let request = request_reveal(&system, batch_id).await?;
    let zero = system.coprocessor.zero()?.raw();
    assert_eq!(request.handles, RevealHandles::from([zero; 3]));

    let reply = oracle_reply(&system, &request).await?;
    let totals = system.ledger.send(reply).await??;
    assert_eq!(totals.to_array(), [0, 0, 0]);
    Ok(())
}

#[actix::test]
async fn relay_delivers_the_reply_after_a_delay() -> Result<()> {
    let system = LedgerSystemBuilder::new()
        .with_relay(Duration::from_millis(20))
        .build()
        .await?;
    let batch_id = settled_batch(&system).await?;
    let request = request_reveal(&system, batch_id).await?;

    let types = system.take_event_types(6).await?;
    assert_eq!(
        types,
        vec![
            "BatchOpened",
            "SubmissionRecorded",
            "SubmissionRecorded",
            "BatchClosed",
            "DecryptionRequested",
            "DecryptionCompleted",
        ]
    );
    let context = system
        .ledger
        .send(GetContext(request.request_id))
        .await?
        .context("context missing")?;
    assert!(context.processed);
    Ok(())
}
