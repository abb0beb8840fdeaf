use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_core::logging::{debug, trace};

use crate::protocol::oplock_break::SMBOplockLevel;
use crate::server::oplock::grant::SMBOplockBreak;
use crate::server::oplock::state::SMBOplockState;
use crate::server::oplock::SMBOplockManager;
use crate::server::open::Open;
use crate::server::request::SMBOplockRequest;
use crate::server::resource::SMBOplockResource;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SMBOplockBreakFlags: u32 {
        const TO_NONE = 0x01;
        const TO_LEVEL_II = 0x02;
        /// Only exclusive caching conflicts; level II grants are left alone.
        const EXCLUSIVE = 0x04;
        /// Only a batch oplock conflicts; plain exclusive ones are left alone.
        const BATCH = 0x08;
        /// Don't wait for the acknowledgement, report the break as pending.
        const NO_WAIT = 0x10;
    }
}

impl SMBOplockBreakFlags {
    fn breaks_level_ii(&self) -> bool {
        self.contains(Self::TO_NONE) && !self.intersects(Self::EXCLUSIVE | Self::BATCH)
    }
}

impl<O: Open> SMBOplockManager<O> {
    /// Break the oplocks on `resource` that conflict with an access.
    ///
    /// An exclusive or batch grant is broken to level II (if asked for and
    /// the grant's dialect can express it) or to none, and the caller waits
    /// for the acknowledgement or the ack timeout. With `NO_WAIT` the caller
    /// gets [`SMBError::Busy`] instead of waiting. Level II grants are broken
    /// to none without waiting.
    ///
    /// `request` is `None` when the break comes from the notify hook.
    pub async fn break_oplock(&self, request: Option<&SMBOplockRequest>, resource: &Arc<SMBOplockResource<O>>, flags: SMBOplockBreakFlags) -> SMBResult<()> {
        let mut state = self.lock_state(resource, request.and_then(|request| request.exclusive())).await;

        let Some((open, grant)) = state.head() else {
            return Ok(());
        };

        if grant.level() == SMBOplockLevel::II {
            drop(state);
            if flags.breaks_level_ii() {
                self.break_level_ii(resource).await;
            }
            return Ok(());
        }

        if flags.contains(SMBOplockBreakFlags::BATCH) && grant.level() != SMBOplockLevel::Batch {
            return Ok(());
        }

        let brk = if flags.contains(SMBOplockBreakFlags::TO_LEVEL_II) && grant.dialect().supports_level_ii() {
            SMBOplockBreak::ToLevelII
        } else {
            SMBOplockBreak::ToNone
        };

        match state.breaking {
            None => {
                state.breaking = Some(brk);
                self.schedule_break(resource, &open, grant, brk);
            }
            Some(SMBOplockBreak::ToLevelII) if brk == SMBOplockBreak::ToNone => {
                debug!(path = resource.path(), "escalating oplock break to none");
                state.breaking = Some(SMBOplockBreak::ToNone);
            }
            Some(_) => {}
        }

        if flags.contains(SMBOplockBreakFlags::NO_WAIT) {
            return Err(SMBError::busy(format!("oplock break pending on {}", resource.path())));
        }

        let timeout = if request.is_some_and(|request| request.user_id() == open.user_id()) {
            self.config.min_break_timeout()
        } else {
            self.config.break_timeout()
        };
        drop(state);
        self.wait_ack(resource, timeout).await;
        Ok(())
    }

    /// Break every level II oplock on `resource` to none after a write or
    /// other modification. Never waits for clients.
    ///
    /// If an acquire still holds the exclusive token the break is recorded
    /// and replayed by [`complete_acquire`](Self::complete_acquire).
    pub async fn break_level_ii(&self, resource: &Arc<SMBOplockResource<O>>) {
        let mut state = resource.oplock().lock().await;
        if state.exclusive_owner.is_some() {
            trace!(path = resource.path(), "deferring level II break until acquire completes");
            state.pending_break = Some(SMBOplockBreak::ToNone);
            return;
        }
        self.prune(&mut state, resource);
        self.break_level_ii_locked(&mut state, resource);
    }

    /// Notify every level II holder and drop its grant. Called with the
    /// state locked and no exclusive token outstanding.
    pub(super) fn break_level_ii_locked(&self, state: &mut SMBOplockState<O>, resource: &Arc<SMBOplockResource<O>>) {
        debug_assert!(state.exclusive_owner.is_none());
        while let Some((open, grant)) = state.head() {
            // An exclusive grant excludes level II grants.
            if grant.level().is_exclusive() {
                break;
            }
            self.schedule_break(resource, &open, grant, SMBOplockBreak::ToNone);
            self.remove_grant(state, resource, &open);
        }
    }
}
