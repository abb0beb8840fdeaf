use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::sync::futures::Notified;
use uuid::Uuid;

use crate::protocol::oplock_break::SMBOplockLevel;
use crate::server::oplock::grant::{SMBOplockBreak, SMBOplockGrant};
use crate::server::open::Open;

/// Per-resource oplock state: the grant list and break bookkeeping behind a
/// mutex, plus a notifier standing in for a condition variable.
///
/// The mutex is only held for short sections. Longer waits (for the
/// exclusive token, or for a break acknowledgement) drop it and sleep on
/// `changed`, which every state transition broadcasts.
pub struct SMBOplock<O: Open> {
    state: Mutex<SMBOplockState<O>>,
    changed: Notify,
}

pub(crate) struct SMBOplockState<O: Open> {
    /// Holder of the exclusive token, cleared only by complete_acquire.
    pub(super) exclusive_owner: Option<Uuid>,
    /// Level II break requested while the token was held.
    pub(super) pending_break: Option<SMBOplockBreak>,
    pub(super) breaking: Option<SMBOplockBreak>,
    grants: Vec<Weak<O>>,
    pub(super) hook_installed: bool,
}

impl<O: Open> SMBOplock<O> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SMBOplockState {
                exclusive_owner: None,
                pending_break: None,
                breaking: None,
                grants: Vec::new(),
                hook_installed: false,
            }),
            changed: Notify::new(),
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SMBOplockState<O>> {
        self.state.lock().await
    }

    /// Lock the state once no other operation holds the exclusive token.
    /// `owner` is the token the caller itself holds, if any.
    pub(crate) async fn lock_exclusive(&self, owner: Option<Uuid>) -> MutexGuard<'_, SMBOplockState<O>> {
        let mut state = self.state.lock().await;
        while state.excludes(owner) {
            let changed = self.changed.notified();
            drop(state);
            changed.await;
            state = self.state.lock().await;
        }
        state
    }

    /// Register for the next broadcast. Must be called before the guard that
    /// observed the awaited condition is dropped.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    pub(crate) fn broadcast(&self) {
        self.changed.notify_waiters();
    }

    pub async fn snapshot(&self) -> SMBOplockSnapshot {
        let state = self.state.lock().await;
        SMBOplockSnapshot {
            levels: state.live_grants()
                .map(|(_, grant)| grant.level())
                .collect(),
            breaking: state.breaking,
            pending_break: state.pending_break,
            hook_installed: state.hook_installed,
            exclusive_held: state.exclusive_owner.is_some(),
        }
    }
}

impl<O: Open> Default for SMBOplock<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Open> SMBOplockState<O> {
    fn excludes(&self, owner: Option<Uuid>) -> bool {
        match self.exclusive_owner {
            Some(holder) => owner != Some(holder),
            None => false,
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Opens still alive, in grant order, with their current grant.
    pub(super) fn live_grants(&self) -> impl Iterator<Item=(Arc<O>, SMBOplockGrant)> + '_ {
        self.grants.iter()
            .filter_map(Weak::upgrade)
            .filter_map(|open| {
                let grant = open.oplock().grant()?;
                Some((open, grant))
            })
    }

    pub(super) fn head(&self) -> Option<(Arc<O>, SMBOplockGrant)> {
        self.live_grants().next()
    }

    /// The exclusive or batch grant, if one exists. It is always the only
    /// grant, so only the head needs checking.
    pub(super) fn exclusive_grant(&self) -> Option<(Arc<O>, SMBOplockGrant)> {
        self.head().filter(|(_, grant)| grant.level().is_exclusive())
    }

    pub(super) fn holds(&self, open: &Arc<O>) -> bool {
        self.grants.iter().any(|entry| std::ptr::eq(entry.as_ptr(), Arc::as_ptr(open)))
    }

    pub(super) fn push(&mut self, open: &Arc<O>) {
        self.grants.push(Arc::downgrade(open));
    }

    pub(super) fn remove(&mut self, open: &Arc<O>) -> bool {
        let before = self.grants.len();
        self.grants.retain(|entry| !std::ptr::eq(entry.as_ptr(), Arc::as_ptr(open)));
        self.grants.len() != before
    }

    /// Drop entries whose open went away without a release. Returns how many
    /// were removed.
    pub(super) fn prune_dead(&mut self) -> usize {
        let before = self.grants.len();
        self.grants.retain(|entry| entry.strong_count() > 0);
        before - self.grants.len()
    }
}

/// Point-in-time view of a resource's oplock state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SMBOplockSnapshot {
    pub levels: Vec<SMBOplockLevel>,
    pub breaking: Option<SMBOplockBreak>,
    pub pending_break: Option<SMBOplockBreak>,
    pub hook_installed: bool,
    pub exclusive_held: bool,
}

impl SMBOplockSnapshot {
    /// At most one exclusive/batch grant and never alongside level II grants;
    /// the notify hook is installed exactly when grants exist; a break is only
    /// in progress against an exclusive/batch grant.
    pub fn is_consistent(&self) -> bool {
        let exclusive = self.levels.iter().filter(|level| level.is_exclusive()).count();
        let grants_ok = exclusive == 0 || self.levels.len() == 1;
        let break_ok = self.breaking.is_none() || exclusive == 1;
        grants_ok && break_ok && self.hook_installed == !self.levels.is_empty()
    }

    pub fn grant_count(&self) -> usize {
        self.levels.len()
    }
}
