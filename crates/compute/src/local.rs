// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Software stand in for the confidential compute service.
//!
//! Handles are random 32 byte identifiers pointing at cleartext the coprocessor keeps to itself.
//! Nothing here is confidential. It exists so that the ledger can run end to end without an
//! external service while still going through the same request/reply protocol.
//!
//! Client encryptions are written as they happen. Everything the ledger causes (derived
//! ciphertexts, issued requests, acknowledgements) is staged until the ledger commits or
//! discards the operation, so a rejected operation leaves no trace in memory or on disk.

use crate::{
    CallbackTarget, CipherHandle, ConfidentialCompute, CoprocessorRepositoryFactory, OracleReply,
};
use alloy_primitives::{B256, U256};
use anyhow::{anyhow, bail, Result};
use cb_data::{AppendLog, DataStore, PersistableData, RepositoriesFactory};
use cb_events::RequestId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, trace};
use zeroize::Zeroizing;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plain {
    Count(u64),
    Flag(bool),
}

impl Plain {
    fn as_word(&self) -> U256 {
        match self {
            Plain::Count(v) => U256::from(*v),
            Plain::Flag(b) => U256::from(*b as u64),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub handles: Vec<B256>,
    pub callback: CallbackTarget,
}

type Ciphertext = (B256, Plain);

/// What the ledger operation in progress added
#[derive(Debug, Default)]
struct Staged {
    values: Vec<B256>,
    requests: Vec<RequestId>,
    acknowledged: Vec<RequestId>,
}

struct CoprocessorState {
    values: BTreeMap<B256, Plain>,
    requests: BTreeMap<RequestId, PendingRequest>,
    acknowledged: BTreeSet<RequestId>,
    inputs: AppendLog<Ciphertext>,
    derived: AppendLog<Ciphertext>,
    issued: AppendLog<(RequestId, PendingRequest)>,
    acknowledgements: AppendLog<RequestId>,
    staged: Staged,
}

impl CoprocessorState {
    fn value(&self, handle: &B256) -> Result<Plain> {
        self.values
            .get(handle)
            .copied()
            .ok_or_else(|| anyhow!("unknown ciphertext handle 0x{}", hex::encode(handle)))
    }

    fn derive(&mut self, value: Plain) -> CipherHandle {
        let handle = random_b256();
        self.values.insert(handle, value);
        self.derived.append(&(handle, value));
        self.staged.values.push(handle);
        CipherHandle::new(handle)
    }

    fn commit(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        trace!(
            "kept {} ciphertexts, {} requests and {} acknowledgements",
            staged.values.len(),
            staged.requests.len(),
            staged.acknowledged.len()
        );
    }

    fn discard(&mut self) {
        let staged = std::mem::take(&mut self.staged);
        for handle in staged.values.iter() {
            self.values.remove(handle);
        }
        for request_id in staged.requests.iter() {
            self.requests.remove(request_id);
        }
        for request_id in staged.acknowledged.iter() {
            self.acknowledged.remove(request_id);
        }
        rewind_by(&mut self.derived, staged.values.len());
        rewind_by(&mut self.issued, staged.requests.len());
        rewind_by(&mut self.acknowledgements, staged.acknowledged.len());
    }
}

fn rewind_by<T: PersistableData>(log: &mut AppendLog<T>, count: usize) {
    let len = log.len().saturating_sub(count as u64);
    log.rewind(len);
}

fn zero_handle() -> B256 {
    B256::from_slice(&Sha256::digest(b"cipherbatch/zero"))
}

fn random_b256() -> B256 {
    let mut raw = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut raw);
    B256::from(raw)
}

#[derive(Clone)]
pub struct LocalCoprocessor {
    state: Arc<Mutex<CoprocessorState>>,
    secret: Arc<Zeroizing<Vec<u8>>>,
}

impl LocalCoprocessor {
    /// Load persisted state. `store` must route its buffered writes through the same buffer as
    /// the ledger so that staged work lands with the ledger operation that caused it.
    pub async fn load(store: &DataStore, secret: &str) -> Result<Self> {
        let repositories = store.repositories();
        let (inputs, created) = AppendLog::load(repositories.coprocessor_inputs()).await?;
        let (derived, computed) = AppendLog::load(repositories.coprocessor_derived()).await?;
        let (issued, requests) = AppendLog::load(repositories.coprocessor_requests()).await?;
        let (acknowledgements, acknowledged) =
            AppendLog::load(repositories.coprocessor_acknowledged()).await?;

        let mut values: BTreeMap<B256, Plain> = created.into_iter().chain(computed).collect();
        values.insert(zero_handle(), Plain::Count(0));
        let requests: BTreeMap<RequestId, PendingRequest> = requests.into_iter().collect();
        let acknowledged: BTreeSet<RequestId> = acknowledged.into_iter().collect();

        info!(
            "local coprocessor loaded {} ciphertexts and {} requests ({} answered)",
            values.len(),
            requests.len(),
            acknowledged.len()
        );
        let state = CoprocessorState {
            values,
            requests,
            acknowledged,
            inputs,
            derived,
            issued,
            acknowledgements,
            staged: Staged::default(),
        };
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            secret: Arc::new(Zeroizing::new(secret.as_bytes().to_vec())),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, CoprocessorState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("coprocessor state lock poisoned"))
    }

    fn encrypt(&self, value: Plain) -> Result<CipherHandle> {
        let handle = random_b256();
        let mut state = self.lock()?;
        state.values.insert(handle, value);
        state.inputs.append(&(handle, value));
        Ok(CipherHandle::new(handle))
    }

    /// Client side encryption of an amount
    pub fn encrypt_u64(&self, value: u64) -> Result<CipherHandle> {
        self.encrypt(Plain::Count(value))
    }

    /// Client side encryption of a boolean
    pub fn encrypt_flag(&self, value: bool) -> Result<CipherHandle> {
        self.encrypt(Plain::Flag(value))
    }

    /// sha256(secret || request id || cleartext)
    pub fn attest(&self, request_id: &RequestId, cleartext: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_slice());
        hasher.update(request_id.as_slice());
        hasher.update(cleartext);
        hasher.finalize().to_vec()
    }

    /// Requests no reply has been accepted for, in request id order
    pub fn pending_requests(&self) -> Result<Vec<RequestId>> {
        let state = self.lock()?;
        Ok(state
            .requests
            .keys()
            .filter(|id| !state.acknowledged.contains(id))
            .copied()
            .collect())
    }

    pub fn request(&self, request_id: &RequestId) -> Result<Option<PendingRequest>> {
        Ok(self.lock()?.requests.get(request_id).cloned())
    }

    /// Decrypt the handles of a request and attest the result. The request stays pending until
    /// the ledger accepts the reply.
    pub fn fulfil(&self, request_id: &RequestId) -> Result<OracleReply> {
        let state = self.lock()?;
        let Some(request) = state.requests.get(request_id) else {
            bail!("no decryption request {request_id}");
        };

        let mut cleartext = Vec::with_capacity(request.handles.len() * 32);
        for handle in request.handles.iter() {
            let word = state.value(handle)?.as_word();
            cleartext.extend_from_slice(&word.to_be_bytes::<32>());
        }
        debug!("fulfilled {request_id} for {}", request.callback.address);
        drop(state);

        let attestation = self.attest(request_id, &cleartext);
        Ok(OracleReply {
            request_id: *request_id,
            cleartext,
            attestation,
        })
    }
}

impl ConfidentialCompute for LocalCoprocessor {
    fn zero(&self) -> Result<CipherHandle> {
        Ok(CipherHandle::new(zero_handle()))
    }

    fn combine(&self, a: &CipherHandle, b: &CipherHandle) -> Result<CipherHandle> {
        let mut state = self.lock()?;
        let (Plain::Count(x), Plain::Count(y)) = (state.value(&a.raw())?, state.value(&b.raw())?)
        else {
            bail!("combine expects two encrypted amounts");
        };
        let sum = x
            .checked_add(y)
            .ok_or_else(|| anyhow!("encrypted sum overflowed"))?;
        Ok(state.derive(Plain::Count(sum)))
    }

    fn flag_as_count(&self, flag: &CipherHandle) -> Result<CipherHandle> {
        let mut state = self.lock()?;
        let Plain::Flag(b) = state.value(&flag.raw())? else {
            bail!("flag_as_count expects an encrypted boolean");
        };
        Ok(state.derive(Plain::Count(b as u64)))
    }

    fn is_initialized(&self, handle: &CipherHandle) -> bool {
        self.lock()
            .map(|state| state.values.contains_key(&handle.raw()))
            .unwrap_or(false)
    }

    fn export_handle(&self, handle: &CipherHandle) -> B256 {
        handle.raw()
    }

    fn request_decryption(&self, ordered: &[B256], callback: &CallbackTarget) -> Result<RequestId> {
        let mut state = self.lock()?;
        for handle in ordered {
            state.value(handle)?;
        }
        let request_id = RequestId::new(random_b256());
        let request = PendingRequest {
            handles: ordered.to_vec(),
            callback: callback.clone(),
        };
        state.issued.append(&(request_id, request.clone()));
        state.requests.insert(request_id, request);
        state.staged.requests.push(request_id);
        Ok(request_id)
    }

    fn verify_attestation(
        &self,
        request_id: &RequestId,
        cleartext: &[u8],
        attestation: &[u8],
    ) -> Result<bool> {
        Ok(self.attest(request_id, cleartext).as_slice() == attestation)
    }

    fn acknowledge(&self, request_id: &RequestId) -> Result<()> {
        let mut state = self.lock()?;
        if !state.requests.contains_key(request_id) {
            bail!("no decryption request {request_id}");
        }
        if state.acknowledged.insert(*request_id) {
            state.acknowledgements.append(request_id);
            state.staged.acknowledged.push(*request_id);
        }
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.lock()?.commit();
        Ok(())
    }

    fn discard(&self) -> Result<()> {
        self.lock()?.discard();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::Actor;
    use alloy_primitives::Address;
    use cb_data::{
        CommitSnapshot, DataOp, DiscardSnapshot, ForwardTo, GetLog, InMemStore, WriteBuffer,
    };

    async fn coprocessor() -> Result<LocalCoprocessor> {
        let store = DataStore::from(&InMemStore::new(false).start());
        LocalCoprocessor::load(&store, "secret").await
    }

    fn callback() -> CallbackTarget {
        CallbackTarget::new(Address::ZERO)
    }

    #[actix::test]
    async fn combines_and_decrypts_in_order() -> Result<()> {
        let cop = coprocessor().await?;
        let a = cop.encrypt_u64(40)?;
        let b = cop.encrypt_u64(2)?;
        let sum = cop.combine(&a, &b)?;
        let flag = cop.flag_as_count(&cop.encrypt_flag(true)?)?;
        let zero = cop.zero()?;

        let ordered = [sum, flag, zero].map(|h| cop.export_handle(&h));
        let id = cop.request_decryption(&ordered, &callback())?;
        cop.commit()?;
        assert_eq!(cop.pending_requests()?, vec![id]);

        let reply = cop.fulfil(&id)?;
        assert_eq!(reply.cleartext.len(), 96);
        assert_eq!(reply.cleartext[31], 42);
        assert_eq!(reply.cleartext[63], 1);
        assert_eq!(reply.cleartext[95], 0);
        assert!(cop.verify_attestation(&id, &reply.cleartext, &reply.attestation)?);
        assert!(!cop.verify_attestation(&id, &reply.cleartext[..64], &reply.attestation)?);

        // answering alone does not settle the request
        assert_eq!(cop.pending_requests()?, vec![id]);
        cop.acknowledge(&id)?;
        cop.commit()?;
        assert!(cop.pending_requests()?.is_empty());
        Ok(())
    }

    #[actix::test]
    async fn rejects_mismatched_kinds_and_unknown_handles() -> Result<()> {
        let cop = coprocessor().await?;
        let flag = cop.encrypt_flag(false)?;
        let amount = cop.encrypt_u64(1)?;

        assert!(cop.combine(&flag, &amount).is_err());
        assert!(cop.flag_as_count(&amount).is_err());

        let unknown = CipherHandle::new(B256::repeat_byte(7));
        assert!(!cop.is_initialized(&unknown));
        assert!(cop.request_decryption(&[unknown.raw()], &callback()).is_err());
        assert!(cop.acknowledge(&RequestId::new(B256::ZERO)).is_err());
        Ok(())
    }

    #[actix::test]
    async fn zero_is_stable_across_loads() -> Result<()> {
        let first = coprocessor().await?.zero()?;
        let second = coprocessor().await?.zero()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[actix::test]
    async fn discarded_work_is_gone_from_memory_and_disk() -> Result<()> {
        let mem = InMemStore::new(false).start();
        let buffer = WriteBuffer::new().start();
        buffer.send(ForwardTo::new(&mem)).await?;
        let store = DataStore::from_in_mem(&mem, &buffer);
        let cop = LocalCoprocessor::load(&store, "secret").await?;

        let input = cop.encrypt_u64(9)?;
        let kept = cop.request_decryption(&[input.raw()], &callback())?;
        cop.commit()?;
        buffer.send(CommitSnapshot).await?;

        // one rejected operation: a derived value, a new request and an acknowledgement
        let doubled = cop.combine(&input, &input)?;
        let dropped = cop.request_decryption(&[doubled.raw()], &callback())?;
        cop.acknowledge(&kept)?;
        cop.discard()?;
        buffer.send(DiscardSnapshot).await?;

        assert!(!cop.is_initialized(&doubled));
        assert_eq!(cop.request(&dropped)?, None);
        assert_eq!(cop.pending_requests()?, vec![kept]);

        store.flush().await?;
        let reloaded = LocalCoprocessor::load(&store, "secret").await?;
        assert!(reloaded.is_initialized(&input));
        assert!(!reloaded.is_initialized(&doubled));
        assert_eq!(reloaded.pending_requests()?, vec![kept]);

        // work after the discard reuses the rewound slots
        let redone = cop.combine(&input, &input)?;
        cop.commit()?;
        buffer.send(CommitSnapshot).await?;
        store.flush().await?;
        let reloaded = LocalCoprocessor::load(&store, "secret").await?;
        assert!(reloaded.is_initialized(&redone));
        assert!(!reloaded.is_initialized(&doubled));
        Ok(())
    }

    #[actix::test]
    async fn each_operation_writes_a_constant_amount() -> Result<()> {
        let mem = InMemStore::new(true).start();
        let store = DataStore::from(&mem);
        let cop = LocalCoprocessor::load(&store, "secret").await?;

        let one = cop.encrypt_u64(1)?;
        let mut total = one;
        for _ in 0..50 {
            total = cop.combine(&total, &one)?;
        }
        let before = mem.send(GetLog).await?.len();

        cop.combine(&total, &one)?;
        let log = mem.send(GetLog).await?;
        let written = &log[before..];
        assert_eq!(written.len(), 2);
        for op in written {
            let DataOp::Insert(insert) = op else {
                panic!("unexpected removal");
            };
            assert!(insert.value().len() < 64, "{} bytes", insert.value().len());
        }
        Ok(())
    }
}
