// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{LedgerError, LedgerResult};
use cb_config::AppConfig;
use cb_events::Participant;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Identity, pause and rate limit policy consulted before guarded operations
pub trait AccessControl: Send {
    fn is_authorized(&self, caller: &Participant) -> bool;
    fn is_owner(&self, caller: &Participant) -> bool;
    fn is_paused(&self) -> bool;
    fn cooldown_elapsed(&self, caller: &Participant) -> bool;
    /// Start the caller's cooldown
    fn record_call(&mut self, caller: &Participant);
}

/// A single precondition. Guards run in the order given and the first failure wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    Authorized,
    Owner,
    NotPaused,
    Cooldown,
}

impl Guard {
    pub fn check(&self, access: &dyn AccessControl, caller: &Participant) -> LedgerResult<()> {
        let passed = match self {
            Guard::Authorized => access.is_authorized(caller),
            Guard::Owner => access.is_owner(caller),
            Guard::NotPaused => !access.is_paused(),
            Guard::Cooldown => access.cooldown_elapsed(caller),
        };
        if passed {
            return Ok(());
        }
        Err(match self {
            Guard::Authorized | Guard::Owner => LedgerError::Unauthorized(*caller),
            Guard::NotPaused => LedgerError::SystemPaused,
            Guard::Cooldown => LedgerError::RateLimited(*caller),
        })
    }
}

pub fn check_guards(
    access: &dyn AccessControl,
    guards: &[Guard],
    caller: &Participant,
) -> LedgerResult<()> {
    guards.iter().try_for_each(|g| g.check(access, caller))
}

/// Access policy read from configuration. The owner is authorized for everything. Cooldowns are
/// tracked in memory for the life of the process.
#[derive(Debug, Clone)]
pub struct ConfigAccessControl {
    owner: Option<Participant>,
    submitters: HashSet<Participant>,
    paused: bool,
    cooldown: Duration,
    last_call: HashMap<Participant, Instant>,
}

impl ConfigAccessControl {
    pub fn new(
        owner: Option<Participant>,
        submitters: impl IntoIterator<Item = Participant>,
        paused: bool,
        cooldown: Duration,
    ) -> Self {
        Self {
            owner,
            submitters: submitters.into_iter().collect(),
            paused,
            cooldown,
            last_call: HashMap::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.owner(),
            config.submitters().iter().copied(),
            config.paused(),
            config.cooldown(),
        )
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

impl AccessControl for ConfigAccessControl {
    fn is_authorized(&self, caller: &Participant) -> bool {
        self.is_owner(caller) || self.submitters.contains(caller)
    }

    fn is_owner(&self, caller: &Participant) -> bool {
        self.owner.as_ref() == Some(caller)
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn cooldown_elapsed(&self, caller: &Participant) -> bool {
        self.last_call
            .get(caller)
            .map_or(true, |last| last.elapsed() >= self.cooldown)
    }

    fn record_call(&mut self, caller: &Participant) {
        if !self.cooldown.is_zero() {
            self.last_call.insert(*caller, Instant::now());
        }
    }
}
