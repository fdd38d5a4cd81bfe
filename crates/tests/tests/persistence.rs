// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context, Result};
use cb_compute::RelayPending;
use cb_events::BatchId;
use cb_ledger::{
    CloseBatch, DecryptionReady, GetContext, GetParticipants, GetStatus, LedgerError, OpenBatch,
    Phase, RequestReveal, Submit,
};
use cb_test_helpers::{LedgerSystemBuilder, OWNER, SUBMITTER};
use std::time::Duration;
use tempfile::tempdir;

#[actix::test]
#[serial_test::serial]
async fn pending_reveal_survives_a_restart() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("db");

    let (request, reply) = {
        let system = LedgerSystemBuilder::new().with_sled(&path).build().await?;
        let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
        let fields = system.encrypt(300, 6, true)?;
        system
            .ledger
            .send(Submit {
                caller: SUBMITTER,
                batch_id,
                participant: SUBMITTER,
                fields,
            })
            .await??;
        system.ledger.send(CloseBatch { caller: OWNER }).await??;
        let request = system
            .ledger
            .send(RequestReveal {
                caller: OWNER,
                batch_id,
            })
            .await??;
        let reply: DecryptionReady = system.coprocessor.fulfil(&request.request_id)?.into();
        system.shutdown().await?;
        (request, reply)
    };

    let system = LedgerSystemBuilder::new().with_sled(&path).build().await?;
    let status = system.ledger.send(GetStatus).await?;
    assert_eq!(status.phase, Phase::Closed(BatchId::new(1)));
    assert_eq!(
        system.ledger.send(GetParticipants(BatchId::new(1))).await?,
        vec![SUBMITTER]
    );

    // The digest recomputed from the reloaded aggregate matches the one recorded before
    let totals = system.ledger.send(reply.clone()).await??;
    assert_eq!(totals.to_array(), [300, 6, 1]);
    system.shutdown().await?;

    let system = LedgerSystemBuilder::new().with_sled(&path).build().await?;
    let context = system
        .ledger
        .send(GetContext(request.request_id))
        .await?
        .context("context lost on restart")?;
    assert!(context.processed);
    assert_eq!(
        system.ledger.send(reply).await?,
        Err(LedgerError::ReplayAttempt(request.request_id))
    );
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn relay_answers_requests_left_over_from_a_previous_run() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("db");

    let request = {
        let system = LedgerSystemBuilder::new().with_sled(&path).build().await?;
        let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
        system.ledger.send(CloseBatch { caller: OWNER }).await??;
        let request = system
            .ledger
            .send(RequestReveal {
                caller: OWNER,
                batch_id,
            })
            .await??;
        system.shutdown().await?;
        request
    };

    let system = LedgerSystemBuilder::new()
        .with_sled(&path)
        .with_relay(Duration::from_secs(3600))
        .build()
        .await?;
    let relay = system.relay.clone().context("relay not started")?;
    let delivered = relay.send(RelayPending).await??;
    assert_eq!(delivered, vec![request.request_id]);

    let context = system
        .ledger
        .send(GetContext(request.request_id))
        .await?
        .context("context missing")?;
    assert_eq!(context.revealed.map(|t| t.to_array()), Some([0, 0, 0]));
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn rejected_callback_leaves_the_request_pending_across_a_restart() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("db");

    let (tampered, answered) = {
        let system = LedgerSystemBuilder::new().with_sled(&path).build().await?;
        let mut requests = vec![];
        for staked in [40, 60] {
            let batch_id = system.ledger.send(OpenBatch { caller: OWNER }).await??;
            let fields = system.encrypt(staked, 1, true)?;
            system
                .ledger
                .send(Submit {
                    caller: OWNER,
                    batch_id,
                    participant: OWNER,
                    fields,
                })
                .await??;
            system.ledger.send(CloseBatch { caller: OWNER }).await??;
            let request = system
                .ledger
                .send(RequestReveal {
                    caller: OWNER,
                    batch_id,
                })
                .await??;
            requests.push(request.request_id);
        }
        let (tampered, answered) = (requests[0], requests[1]);

        let mut reply: DecryptionReady = system.coprocessor.fulfil(&tampered)?.into();
        reply.cleartext[31] ^= 1;
        assert_eq!(
            system.ledger.send(reply).await?,
            Err(LedgerError::DecryptionFailed(tampered))
        );
        let reply: DecryptionReady = system.coprocessor.fulfil(&answered)?.into();
        system.ledger.send(reply).await??;

        assert_eq!(system.coprocessor.pending_requests()?, vec![tampered]);
        system.shutdown().await?;
        (tampered, answered)
    };

    let system = LedgerSystemBuilder::new()
        .with_sled(&path)
        .with_relay(Duration::from_secs(3600))
        .build()
        .await?;
    assert_eq!(system.coprocessor.pending_requests()?, vec![tampered]);

    let relay = system.relay.clone().context("relay not started")?;
    assert_eq!(relay.send(RelayPending).await??, vec![tampered]);
    let context = system
        .ledger
        .send(GetContext(tampered))
        .await?
        .context("context missing")?;
    assert_eq!(context.revealed.map(|t| t.to_array()), Some([40, 1, 1]));

    let context = system
        .ledger
        .send(GetContext(answered))
        .await?
        .context("context missing")?;
    assert_eq!(context.revealed.map(|t| t.to_array()), Some([60, 1, 1]));
    assert!(relay.send(RelayPending).await??.is_empty());
    Ok(())
}
