//! The oplock grant / break / acknowledge engine.
//!
//! Each [`SMBOplockResource`] owns an [`SMBOplock`]: its grant list and break
//! state behind a mutex. [`SMBOplockManager`] runs the protocol against it:
//!
//! - `acquire` decides the level for a new open, records the grant and hands
//!   back an [`SMBExclusiveToken`]. Until the send path returns that token
//!   through `complete_acquire`, every other operation on the resource waits.
//! - `break_oplock` revokes or downgrades existing grants. Exclusive and
//!   batch breaks wait (bounded) for the client's acknowledgement; level II
//!   breaks are fire-and-forget.
//! - Break notifications go out from an [`SMBWorkerPool`], never on the
//!   thread that detected the conflict.
//! - `ack`, `release` and the ack timeout resolve a break episode.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::MutexGuard;
use uuid::Uuid;

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_core::logging::debug;

use crate::server::config::SMBOplockConfig;
use crate::server::open::Open;
use crate::server::resource::SMBOplockResource;

pub use breaking::SMBOplockBreakFlags;
pub use dispatch::{SMBBreakFuture, SMBTokioWorkerPool, SMBWorkerPool};
pub use grant::{SMBExclusiveToken, SMBOplockAcquisition, SMBOplockBreak, SMBOplockDialect, SMBOplockGrant};
pub use hook::{SMBNoNotifyHook, SMBNotifyHook};
pub use state::{SMBOplock, SMBOplockSnapshot};

use state::SMBOplockState;

mod ack;
mod acquire;
mod breaking;
mod dispatch;
mod grant;
mod hook;
mod state;

pub struct SMBOplockManager<O: Open> {
    config: Arc<SMBOplockConfig>,
    pool: Arc<dyn SMBWorkerPool>,
    hook: Arc<dyn SMBNotifyHook<O>>,
}

impl<O: Open> Clone for SMBOplockManager<O> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            pool: self.pool.clone(),
            hook: self.hook.clone(),
        }
    }
}

impl<O: Open> Debug for SMBOplockManager<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SMBOplockManager")
            .field("config", &self.config)
            .finish()
    }
}

impl<O: Open> SMBOplockManager<O> {
    pub fn new(config: SMBOplockConfig, pool: Arc<dyn SMBWorkerPool>, hook: Arc<dyn SMBNotifyHook<O>>) -> Self {
        Self {
            config: Arc::new(config),
            pool,
            hook,
        }
    }

    /// A manager dispatching breaks on the current tokio runtime, with no
    /// cross-protocol notify hook.
    pub fn on_current_runtime(config: SMBOplockConfig) -> SMBResult<Self> {
        let runtime = Handle::try_current().map_err(SMBError::server_error)?;
        let pool = SMBTokioWorkerPool::new(runtime, config.break_workers());
        Ok(Self::new(config, Arc::new(pool), Arc::new(SMBNoNotifyHook)))
    }

    pub fn config(&self) -> &SMBOplockConfig {
        &self.config
    }

    /// Lock the resource's oplock state after waiting out any exclusive
    /// token not held by `owner`.
    async fn lock_state<'a>(&self, resource: &'a Arc<SMBOplockResource<O>>, owner: Option<Uuid>) -> MutexGuard<'a, SMBOplockState<O>> {
        let mut state = resource.oplock().lock_exclusive(owner).await;
        self.prune(&mut state, resource);
        state
    }

    fn insert_grant(&self, state: &mut SMBOplockState<O>, resource: &Arc<SMBOplockResource<O>>, open: &Arc<O>, grant: SMBOplockGrant) -> SMBResult<()> {
        if state.is_empty() && !state.hook_installed {
            self.hook.install(resource)?;
            state.hook_installed = true;
        }
        open.oplock().set(grant);
        state.push(open);
        Ok(())
    }

    fn remove_grant(&self, state: &mut SMBOplockState<O>, resource: &Arc<SMBOplockResource<O>>, open: &Arc<O>) {
        state.remove(open);
        open.oplock().clear();
        self.uninstall_if_empty(state, resource);
    }

    /// Treat opens that vanished without a release as released. A break in
    /// progress on a vanished exclusive holder ends with it.
    fn prune(&self, state: &mut SMBOplockState<O>, resource: &Arc<SMBOplockResource<O>>) {
        let pruned = state.prune_dead();
        if pruned == 0 {
            return;
        }
        debug!(path = resource.path(), pruned, "dropped grants of vanished opens");
        self.uninstall_if_empty(state, resource);
        if state.breaking.is_some() && state.exclusive_grant().is_none() {
            state.breaking = None;
            resource.oplock().broadcast();
        }
    }

    fn uninstall_if_empty(&self, state: &mut SMBOplockState<O>, resource: &Arc<SMBOplockResource<O>>) {
        if state.is_empty() && state.hook_installed {
            self.hook.uninstall(resource);
            state.hook_installed = false;
        }
    }
}
