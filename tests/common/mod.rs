#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_oplock::protocol::dialect::{SMBDialect, SMBProtocol};
use smb_oplock::protocol::file_id::SMBFileId;
use smb_oplock::protocol::oplock_break::{SMBOplockBreakNotification, SMBOplockLevel};
use smb_oplock::server::oplock::{SMBBreakFuture, SMBNotifyHook, SMBWorkerPool};
use smb_oplock::server::{Open, SMBDurability, SMBOpenOplockArgs, SMBOplockConfig, SMBOplockManager, SMBOplockRequest, SMBOplockResource, SMBOplockSlot, Session};

pub struct FakeSession {
    protocol: SMBProtocol,
    level_ii: bool,
    pub accepting: AtomicBool,
    pub fail: AtomicBool,
    sent: Mutex<Vec<SMBOplockBreakNotification>>,
}

impl FakeSession {
    pub fn smb2() -> Arc<Self> {
        Self::with_protocol(SMBProtocol::Smb2(SMBDialect::V2_1_0), true)
    }

    pub fn with_protocol(protocol: SMBProtocol, level_ii: bool) -> Arc<Self> {
        Arc::new(Self {
            protocol,
            level_ii,
            accepting: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(self: Arc<Self>) -> Arc<Self> {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn sent(&self) -> Vec<SMBOplockBreakNotification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Session for FakeSession {
    fn protocol(&self) -> SMBProtocol {
        self.protocol
    }

    fn level_ii_oplocks(&self) -> bool {
        self.level_ii
    }

    fn accepts_requests(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    async fn send_oplock_break(&self, notification: SMBOplockBreakNotification) -> SMBResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SMBError::send_failure("connection reset"));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct FakeOpen {
    file_id: SMBFileId,
    user_id: u64,
    durability: SMBDurability,
    session: Mutex<Option<Arc<FakeSession>>>,
    slot: SMBOplockSlot,
    closing: AtomicBool,
    pub holds: AtomicUsize,
    pub closed: AtomicUsize,
}

impl FakeOpen {
    pub fn new(volatile: u64, user_id: u64, session: &Arc<FakeSession>) -> Arc<Self> {
        Self::with_durability(volatile, user_id, session, SMBDurability::NotDurable)
    }

    pub fn with_durability(volatile: u64, user_id: u64, session: &Arc<FakeSession>, durability: SMBDurability) -> Arc<Self> {
        Arc::new(Self {
            file_id: SMBFileId::new(0xAA, volatile),
            user_id,
            durability,
            session: Mutex::new(Some(session.clone())),
            slot: SMBOplockSlot::new(),
            closing: AtomicBool::new(false),
            holds: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        })
    }

    pub fn orphan(&self) {
        *self.session.lock().unwrap() = None;
    }

    pub fn start_closing(&self) {
        self.closing.store(true, Ordering::SeqCst);
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) > 0
    }
}

impl Open for FakeOpen {
    type Session = FakeSession;

    fn file_id(&self) -> SMBFileId {
        self.file_id
    }

    fn user_id(&self) -> u64 {
        self.user_id
    }

    fn durability(&self) -> SMBDurability {
        self.durability
    }

    fn session(&self) -> Option<Arc<FakeSession>> {
        self.session.lock().unwrap().clone()
    }

    fn oplock(&self) -> &SMBOplockSlot {
        &self.slot
    }

    fn hold_for_break(&self) -> bool {
        if self.closing.load(Ordering::SeqCst) {
            return false;
        }
        self.holds.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn release_break_hold(&self) {
        self.holds.fetch_sub(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Queues break tasks until the test runs them.
#[derive(Default)]
pub struct ManualPool {
    tasks: Mutex<VecDeque<SMBBreakFuture>>,
}

impl ManualPool {
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Run queued tasks, including ones they queue, until none are left.
    pub async fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.tasks.lock().unwrap().pop_front();
            let Some(task) = task else {
                return ran;
            };
            task.await;
            ran += 1;
        }
    }
}

impl SMBWorkerPool for ManualPool {
    fn submit(&self, task: SMBBreakFuture) {
        self.tasks.lock().unwrap().push_back(task);
    }
}

#[derive(Default)]
pub struct CountingHook {
    pub installs: AtomicUsize,
    pub uninstalls: AtomicUsize,
    pub fail: AtomicBool,
}

impl CountingHook {
    pub fn installed(&self) -> usize {
        self.installs.load(Ordering::SeqCst) - self.uninstalls.load(Ordering::SeqCst)
    }
}

impl SMBNotifyHook<FakeOpen> for CountingHook {
    fn install(&self, _resource: &Arc<SMBOplockResource<FakeOpen>>) -> SMBResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SMBError::precondition_failed("monitor unavailable"));
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn uninstall(&self, _resource: &Arc<SMBOplockResource<FakeOpen>>) {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub manager: SMBOplockManager<FakeOpen>,
    pub pool: Arc<ManualPool>,
    pub hook: Arc<CountingHook>,
    pub resource: Arc<SMBOplockResource<FakeOpen>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SMBOplockConfig::default())
    }

    pub fn with_config(config: SMBOplockConfig) -> Self {
        let pool = Arc::new(ManualPool::default());
        let hook = Arc::new(CountingHook::default());
        Self {
            manager: SMBOplockManager::<FakeOpen>::new(config, pool.clone(), hook.clone()),
            pool,
            hook,
            resource: Arc::new(SMBOplockResource::new("\\share\\file.txt")),
        }
    }

    /// Acquire and immediately complete, as the create path does once its
    /// response is sent.
    pub async fn grant(&self, open: &Arc<FakeOpen>, args: SMBOpenOplockArgs) -> SMBOplockLevel {
        let request = SMBOplockRequest::new(1, open.user_id());
        let acquisition = self.manager.acquire(&request, &args, &self.resource, open).await;
        let level = acquisition.level();
        if let Some(token) = acquisition.into_token() {
            self.manager.complete_acquire(&self.resource, token).await;
        }
        level
    }

    pub async fn levels(&self) -> Vec<SMBOplockLevel> {
        self.resource.snapshot().await.levels
    }

    pub async fn assert_consistent(&self) {
        let snapshot = self.resource.snapshot().await;
        assert!(snapshot.is_consistent(), "inconsistent oplock state: {:?}", snapshot);
        assert_eq!(self.hook.installed(), usize::from(snapshot.hook_installed));
    }

    /// Yield until a break is in progress on the resource.
    pub async fn wait_for_break(&self) {
        for _ in 0..1000 {
            if self.resource.snapshot().await.breaking.is_some() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("no oplock break started");
    }
}

pub fn shared(level: SMBOplockLevel) -> SMBOpenOplockArgs {
    SMBOpenOplockArgs::builder()
        .requested_level(level)
        .other_opens(true)
        .build()
        .unwrap()
}
