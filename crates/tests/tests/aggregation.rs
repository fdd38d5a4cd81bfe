// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use cb_events::BatchId;
use cb_ledger::{
    CloseBatch, ConfigAccessControl, DecryptionReady, GetParticipants, LedgerError, OpenBatch,
    RequestReveal, Submit,
};
use cb_test_helpers::{rand_addr, LedgerSystem, LedgerSystemBuilder, OWNER};
use std::time::Duration;

async fn submit(
    system: &LedgerSystem,
    batch_id: BatchId,
    participant: alloy_primitives::Address,
    values: (u64, u64, bool),
) -> Result<bool> {
    let fields = system.encrypt(values.0, values.1, values.2)?;
    Ok(system
        .ledger
        .send(Submit {
            caller: OWNER,
            batch_id,
            participant,
            fields,
        })
        .await??)
}

async fn reveal(system: &LedgerSystem, batch_id: BatchId) -> Result<[u64; 3]> {
    let request = system
        .ledger
        .send(RequestReveal {
            caller: OWNER,
            batch_id,
        })
        .await??;
    let reply: DecryptionReady = system.coprocessor.fulfil(&request.request_id)?.into();
    Ok(system.ledger.send(reply).await??.to_array())
}

#[actix::test]
async fn resubmission_replaces_earlier_fields() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    let (alice, bob) = (rand_addr(), rand_addr());

    assert!(!submit(&system, batch_id, alice, (100, 2, true)).await?);
    assert!(!submit(&system, batch_id, bob, (40, 1, true)).await?);
    // alice changes her mind and is no longer eligible
    assert!(submit(&system, batch_id, alice, (70, 3, false)).await?);

    assert_eq!(
        system.ledger.send(GetParticipants(batch_id)).await?,
        vec![alice, bob]
    );

    system.ledger.send(CloseBatch { caller: OWNER }).await??;
    assert_eq!(reveal(&system, batch_id).await?, [110, 4, 1]);
    Ok(())
}

#[actix::test]
async fn submissions_only_reach_the_open_batch() -> Result<()> {
    let system = LedgerSystemBuilder::new().build().await?;
    let participant = rand_addr();

    // nothing allocated yet
    let res = submit(&system, BatchId::new(1), participant, (1, 1, true)).await;
    assert_eq!(
        res.map_err(|e| e.downcast::<LedgerError>().ok()),
        Err(Some(LedgerError::BatchNotOpen(BatchId::new(1))))
    );

    let first = system.ledger.send(OpenBatch { caller: OWNER }).await??;
    system.ledger.send(CloseBatch { caller: OWNER }).await??;
    let second = system.ledger.send(OpenBatch { caller: OWNER }).await??;

    for batch_id in [first, BatchId::new(3)] {
        let res = submit(&system, batch_id, participant, (1, 1, true)).await;
        assert_eq!(
            res.map_err(|e| e.downcast::<LedgerError>().ok()),
            Err(Some(LedgerError::BatchNotOpen(batch_id)))
        );
    }
    submit(&system, second, participant, (1, 1, true)).await?;
    Ok(())
}

#[actix::test]
async fn batches_accumulate_independently() -> Result<()> {
    let system = LedgerSystemBuilder::new()
        .with_access(ConfigAccessControl::new(
            Some(OWNER),
            [],
            false,
            Duration::ZERO,
        ))
        .build()
        .await?;

    let mut expected = Vec::new();
    for round in 1..=3u64 {
        let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
        assert_eq!(batch_id, BatchId::new(round));
        for n in 0..round {
            submit(&system, batch_id, rand_addr(), (round * 10, n, n % 2 == 0)).await?;
        }
        system.ledger.send(CloseBatch { caller: OWNER }).await??;
        expected.push((batch_id, [round * round * 10, (0..round).sum(), round.div_ceil(2)]));
    }

    for (batch_id, totals) in expected {
        assert_eq!(reveal(&system, batch_id).await?, totals);
    }
    Ok(())
}
