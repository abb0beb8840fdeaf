use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use smb_core::SMBResult;
use smb_core::error::SMBError;
use smb_oplock::protocol::dialect::{SMBDialect, SMBProtocol};
use smb_oplock::protocol::file_id::SMBFileId;
use smb_oplock::protocol::oplock_break::{SMBOplockBreakNotification, SMBOplockLevel};
use smb_oplock::server::{Open, SMBDurability, SMBOpenOplockArgs, SMBOplockBreak, SMBOplockBreakFlags, SMBOplockConfig, SMBOplockManager, SMBOplockRequest, SMBOplockResource, SMBOplockSlot, Session};

struct DemoSession {
    wire: mpsc::UnboundedSender<SMBOplockBreakNotification>,
}

impl Session for DemoSession {
    fn protocol(&self) -> SMBProtocol {
        SMBProtocol::Smb2(SMBDialect::V3_1_1)
    }

    fn level_ii_oplocks(&self) -> bool {
        true
    }

    fn accepts_requests(&self) -> bool {
        true
    }

    async fn send_oplock_break(&self, notification: SMBOplockBreakNotification) -> SMBResult<()> {
        self.wire.send(notification)
            .map_err(|_| SMBError::send_failure("client went away"))
    }
}

struct DemoOpen {
    file_id: SMBFileId,
    user_id: u64,
    session: Arc<DemoSession>,
    oplock: SMBOplockSlot,
    closing: AtomicBool,
    holds: AtomicUsize,
}

impl DemoOpen {
    fn new(volatile: u64, user_id: u64, session: Arc<DemoSession>) -> Arc<Self> {
        Arc::new(Self {
            file_id: SMBFileId::new(1, volatile),
            user_id,
            session,
            oplock: SMBOplockSlot::new(),
            closing: AtomicBool::new(false),
            holds: AtomicUsize::new(0),
        })
    }
}

impl Open for DemoOpen {
    type Session = DemoSession;

    fn file_id(&self) -> SMBFileId {
        self.file_id
    }

    fn user_id(&self) -> u64 {
        self.user_id
    }

    fn durability(&self) -> SMBDurability {
        SMBDurability::NotDurable
    }

    fn session(&self) -> Option<Arc<DemoSession>> {
        Some(self.session.clone())
    }

    fn oplock(&self) -> &SMBOplockSlot {
        &self.oplock
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
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let manager = SMBOplockManager::<DemoOpen>::on_current_runtime(SMBOplockConfig::default())?;
    let resource = Arc::new(SMBOplockResource::new("\\share\\report.docx"));

    let (wire, mut client) = mpsc::unbounded_channel();
    let session = Arc::new(DemoSession { wire });
    let writer = DemoOpen::new(1, 100, session.clone());
    let reader = DemoOpen::new(2, 200, session);

    let request = SMBOplockRequest::new(1, writer.user_id());
    let acquisition = manager.acquire(&request, &SMBOpenOplockArgs::requesting(SMBOplockLevel::Batch), &resource, &writer).await;
    println!("first open granted {:?}", acquisition.level());
    if let Some(token) = acquisition.into_token() {
        manager.complete_acquire(&resource, token).await;
    }

    // Acknowledge breaks the way the client would.
    let acker = {
        let manager = manager.clone();
        let resource = resource.clone();
        let writer = writer.clone();
        tokio::spawn(async move {
            while let Some(notification) = client.recv().await {
                println!("client got break to {:?}", notification.level());
                let Ok(brk) = SMBOplockBreak::try_from(notification.level()) else {
                    continue;
                };
                manager.ack(&resource, &writer, brk).await;
            }
        })
    };

    let request = SMBOplockRequest::new(2, reader.user_id());
    manager.break_oplock(Some(&request), &resource, SMBOplockBreakFlags::TO_LEVEL_II).await?;
    println!("after break: {:?}", resource.snapshot().await);

    let args = SMBOpenOplockArgs::builder()
        .requested_level(SMBOplockLevel::Batch)
        .other_opens(true)
        .build()?;
    let acquisition = manager.acquire(&request, &args, &resource, &reader).await;
    println!("second open granted {:?}", acquisition.level());
    if let Some(token) = acquisition.into_token() {
        manager.complete_acquire(&resource, token).await;
    }

    manager.break_level_ii(&resource).await;
    manager.release(&resource, &writer).await;
    manager.release(&resource, &reader).await;
    println!("after close: {:?}", resource.snapshot().await);

    acker.abort();
    Ok(())
}
