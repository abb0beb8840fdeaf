use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use smb_core::logging::{debug, trace, warn};

use crate::protocol::oplock_break::SMBOplockLevel;
use crate::server::oplock::grant::{SMBExclusiveToken, SMBOplockBreak};
use crate::server::oplock::state::SMBOplockState;
use crate::server::oplock::SMBOplockManager;
use crate::server::open::Open;
use crate::server::resource::SMBOplockResource;

impl<O: Open> SMBOplockManager<O> {
    /// Apply a client's acknowledgement of a break on `open`, or a local one
    /// for a handle that survived a failed send.
    ///
    /// Acks with no break in progress, or for an open without a grant, are
    /// ignored. A level II ack for a break to none drops the grant and sends
    /// the break to none again.
    pub async fn ack(&self, resource: &Arc<SMBOplockResource<O>>, open: &Arc<O>, brk: SMBOplockBreak) {
        let mut state = self.lock_state(resource, None).await;
        let Some(breaking) = state.breaking else {
            debug!(path = resource.path(), file_id = ?open.file_id(), "oplock ack with no break in progress");
            return;
        };
        let Some(grant) = open.oplock().grant().filter(|_| state.holds(open)) else {
            debug!(path = resource.path(), file_id = ?open.file_id(), "oplock ack for open without a grant");
            return;
        };

        let level = match (breaking, brk) {
            (SMBOplockBreak::ToLevelII, SMBOplockBreak::ToLevelII) => SMBOplockLevel::II,
            (SMBOplockBreak::ToNone, SMBOplockBreak::ToLevelII) => {
                // The client may have raced an escalation; the open isn't
                // rechecked for closing before the second break.
                self.schedule_break(resource, open, grant, SMBOplockBreak::ToNone);
                SMBOplockLevel::None
            }
            (_, SMBOplockBreak::ToNone) => SMBOplockLevel::None,
        };

        if level == SMBOplockLevel::None {
            self.remove_grant(&mut state, resource, open);
        } else {
            open.oplock().update(|grant| {
                grant.set_level(level);
                grant.set_breaking(None);
            });
        }
        trace!(path = resource.path(), file_id = ?open.file_id(), ?level, "oplock break acknowledged");

        state.breaking = None;
        resource.oplock().broadcast();
    }

    /// Hand back the exclusive token from [`acquire`](Self::acquire) once the
    /// create response is on the wire, replaying any level II break deferred
    /// in the meantime.
    pub async fn complete_acquire(&self, resource: &Arc<SMBOplockResource<O>>, token: SMBExclusiveToken) {
        let mut state = resource.oplock().lock().await;
        if state.exclusive_owner != Some(token.id()) {
            warn!(path = resource.path(), token = %token.id(), "completion with a stale exclusive token");
            return;
        }
        state.exclusive_owner = None;

        if state.pending_break.take().is_some() {
            debug!(path = resource.path(), "replaying deferred level II break");
            self.prune(&mut state, resource);
            self.break_level_ii_locked(&mut state, resource);
        }
        resource.oplock().broadcast();
    }

    /// Drop `open`'s grant on close, ending the break in progress on it.
    /// Opens without a grant leave the resource untouched.
    pub async fn release(&self, resource: &Arc<SMBOplockResource<O>>, open: &Arc<O>) {
        let mut state = self.lock_state(resource, None).await;
        if !state.holds(open) {
            return;
        }
        self.remove_grant(&mut state, resource, open);
        if state.breaking.take().is_some() {
            resource.oplock().broadcast();
        }
    }

    /// Wait with the state unlocked until the break in progress resolves or
    /// `timeout` passes, forcing the break through in the latter case.
    pub(super) async fn wait_ack(&self, resource: &Arc<SMBOplockResource<O>>, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut state = resource.oplock().lock().await;
        while state.breaking.is_some() {
            let changed = resource.oplock().changed();
            drop(state);
            let expired = tokio::time::timeout_at(deadline, changed).await.is_err();
            state = resource.oplock().lock().await;
            // An ack may have landed between the timeout and relocking.
            if expired && state.breaking.is_some() {
                self.timed_out(&mut state, resource);
                resource.oplock().broadcast();
                break;
            }
        }
    }

    /// The client never acknowledged: apply the break as if it had.
    fn timed_out(&self, state: &mut SMBOplockState<O>, resource: &Arc<SMBOplockResource<O>>) {
        self.prune(state, resource);
        if let Some((open, _)) = state.exclusive_grant() {
            match state.breaking {
                Some(SMBOplockBreak::ToNone) => self.remove_grant(state, resource, &open),
                Some(SMBOplockBreak::ToLevelII) => {
                    open.oplock().update(|grant| {
                        grant.set_level(SMBOplockLevel::II);
                        grant.set_breaking(None);
                    });
                }
                None => unreachable!("timed out without a break in progress"),
            }
            warn!(path = resource.path(), file_id = ?open.file_id(), breaking = ?state.breaking, "oplock break timed out");
        }
        state.breaking = None;
    }
}
