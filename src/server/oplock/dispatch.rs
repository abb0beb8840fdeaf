use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_core::logging::{debug, trace, warn};

use crate::protocol::oplock_break::{SMBLockingAndXOplockBreak, SMBOplockBreakContent, SMBOplockBreakNotification, SMBOplockLevel};
use crate::server::oplock::grant::{SMBOplockBreak, SMBOplockGrant};
use crate::server::oplock::SMBOplockManager;
use crate::server::open::Open;
use crate::server::resource::SMBOplockResource;
use crate::server::session::Session;

pub type SMBBreakFuture = Pin<Box<dyn Future<Output=()> + Send + 'static>>;

/// Runs break notifications off the caller's task.
///
/// Every submitted task must be run at least once; no ordering between tasks
/// is required.
pub trait SMBWorkerPool: Send + Sync {
    fn submit(&self, task: SMBBreakFuture);
}

/// Worker pool on a tokio runtime, running at most `workers` break tasks at
/// a time.
pub struct SMBTokioWorkerPool {
    runtime: Handle,
    permits: Arc<Semaphore>,
}

impl SMBTokioWorkerPool {
    pub fn new(runtime: Handle, workers: usize) -> Self {
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Debug for SMBTokioWorkerPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SMBTokioWorkerPool")
            .field("available_workers", &self.available_workers())
            .finish()
    }
}

impl SMBWorkerPool for SMBTokioWorkerPool {
    fn submit(&self, task: SMBBreakFuture) {
        let permits = self.permits.clone();
        self.runtime.spawn(async move {
            // The semaphore is never closed; run regardless if it somehow is.
            let _permit = permits.acquire_owned().await.ok();
            task.await;
        });
    }
}

/// Keeps an open from completing its close while a break for it is out.
struct SMBBreakHold<O: Open> {
    open: Arc<O>,
}

impl<O: Open> SMBBreakHold<O> {
    fn take(open: &Arc<O>) -> Option<Self> {
        open.hold_for_break().then(|| Self {
            open: open.clone(),
        })
    }
}

impl<O: Open> Drop for SMBBreakHold<O> {
    fn drop(&mut self) {
        self.open.release_break_hold();
    }
}

/// Where a break task runs: on the open's own session, or on the server's
/// internal context when the open has none that takes requests. The server
/// context never sends anything.
enum SMBBreakContext<S: Session> {
    Session(Arc<S>),
    Server,
}

impl<S: Session> SMBBreakContext<S> {
    fn for_open<O: Open<Session=S>>(open: &O) -> Self {
        match open.session() {
            Some(session) if session.accepts_requests() => Self::Session(session),
            _ => Self::Server,
        }
    }

    /// The session to send on, provided it is still the open's session.
    fn session_for<O: Open<Session=S>>(&self, open: &O) -> Option<Arc<S>> {
        let Self::Session(session) = self else {
            return None;
        };
        let current = open.session()?;
        Arc::ptr_eq(session, &current).then(|| current)
    }
}

/// One break notification in flight, carrying a copy of the grant as it was
/// when the break was scheduled.
struct SMBOplockBreakTask<O: Open> {
    manager: SMBOplockManager<O>,
    resource: Arc<SMBOplockResource<O>>,
    hold: SMBBreakHold<O>,
    context: SMBBreakContext<O::Session>,
    grant: SMBOplockGrant,
}

impl<O: Open> SMBOplockBreakTask<O> {
    fn brk(&self) -> SMBOplockBreak {
        self.grant.breaking().unwrap_or(SMBOplockBreak::ToNone)
    }

    fn notification(&self) -> SMBOplockBreakNotification {
        let file_id = self.hold.open.file_id();
        let level = self.brk().target_level();
        if self.grant.dialect().is_smb2() {
            SMBOplockBreakNotification::Smb2(SMBOplockBreakContent::new(level, file_id))
        } else {
            debug_assert!(self.grant.dialect().supports_level_ii() || level == SMBOplockLevel::None);
            SMBOplockBreakNotification::Smb1(SMBLockingAndXOplockBreak::new(file_id.smb1_fid(), level))
        }
    }

    async fn send(&self) -> SMBResult<()> {
        let Some(session) = self.context.session_for(self.hold.open.as_ref()) else {
            return Err(SMBError::send_failure("open has no connected session"));
        };
        session.send_oplock_break(self.notification()).await
    }

    async fn run(self) {
        let open = self.hold.open.clone();
        let brk = self.brk();
        let Err(e) = self.send().await else {
            trace!(path = self.resource.path(), file_id = ?open.file_id(), ?brk, "oplock break sent");
            return;
        };

        // The client can't be told. Keep handles that are meant to survive a
        // disconnect and apply the break as if it had been acknowledged;
        // close the rest, which drops their grant.
        if open.durability().survives_disconnect() {
            debug!(path = self.resource.path(), file_id = ?open.file_id(), %e, "oplock break undeliverable, acknowledging locally");
            self.manager.ack(&self.resource, &open, brk).await;
        } else {
            warn!(path = self.resource.path(), file_id = ?open.file_id(), %e, "oplock break undeliverable, closing open");
            open.close();
            self.manager.release(&self.resource, &open).await;
        }
    }
}

impl<O: Open> SMBOplockManager<O> {
    /// Submit a break notification for `open`'s grant. Called with the
    /// resource's state locked; does not wait for anything.
    pub(super) fn schedule_break(&self, resource: &Arc<SMBOplockResource<O>>, open: &Arc<O>, grant: SMBOplockGrant, brk: SMBOplockBreak) {
        let Some(hold) = SMBBreakHold::take(open) else {
            debug!(path = resource.path(), file_id = ?open.file_id(), "open is closing, skipping oplock break");
            return;
        };
        open.oplock().update(|grant| grant.set_breaking(Some(brk)));
        let task = SMBOplockBreakTask {
            manager: self.clone(),
            resource: resource.clone(),
            context: SMBBreakContext::for_open(open.as_ref()),
            hold,
            grant: grant.breaking_to(brk),
        };
        trace!(path = resource.path(), file_id = ?open.file_id(), ?brk, "scheduling oplock break");
        self.pool.submit(Box::pin(task.run()));
    }
}
