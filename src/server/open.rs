use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::protocol::file_id::SMBFileId;
use crate::protocol::oplock_break::SMBOplockLevel;
use crate::server::oplock::SMBOplockGrant;
use crate::server::session::Session;

/// One client's open of a resource, as seen by the oplock engine.
///
/// The grant an open holds lives in its [`SMBOplockSlot`]; the resource only
/// keeps weak references to the opens that hold one.
pub trait Open: Send + Sync + 'static {
    type Session: Session;

    fn file_id(&self) -> SMBFileId;

    /// The user the open was created by.
    fn user_id(&self) -> u64;

    fn durability(&self) -> SMBDurability;

    /// The live session, or `None` once the open is orphaned.
    fn session(&self) -> Option<Arc<Self::Session>>;

    fn oplock(&self) -> &SMBOplockSlot;

    /// Take a reference that keeps the open from finishing its close while a
    /// break is outstanding. Returns false if the open is already closing.
    fn hold_for_break(&self) -> bool;

    fn release_break_hold(&self);

    /// Close the open outright. The engine releases the grant itself after
    /// calling this.
    fn close(&self);
}

/// Durable handle classification of an open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SMBDurability {
    #[default]
    NotDurable,
    DurableV1,
    DurableV2 { persistent: bool },
    Resilient,
}

impl SMBDurability {
    /// Whether an open with this classification is kept when its client
    /// cannot be reached. Resilient and persistent handles are; the rest are
    /// closed.
    pub fn survives_disconnect(&self) -> bool {
        match self {
            Self::Resilient => true,
            Self::DurableV2 { persistent } => *persistent,
            Self::DurableV1 | Self::NotDurable => false,
        }
    }
}

/// The oplock grant embedded in an open.
///
/// Only the oplock engine mutates it, and only while holding the owning
/// resource's oplock mutex.
#[derive(Debug, Default)]
pub struct SMBOplockSlot {
    grant: Mutex<Option<SMBOplockGrant>>,
}

impl SMBOplockSlot {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn grant(&self) -> Option<SMBOplockGrant> {
        *self.lock()
    }

    pub fn level(&self) -> SMBOplockLevel {
        self.grant()
            .map(|grant| grant.level())
            .unwrap_or(SMBOplockLevel::None)
    }

    pub fn is_granted(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn set(&self, grant: SMBOplockGrant) {
        *self.lock() = Some(grant);
    }

    pub(crate) fn clear(&self) -> Option<SMBOplockGrant> {
        self.lock().take()
    }

    pub(crate) fn update<F: FnOnce(&mut SMBOplockGrant)>(&self, f: F) -> Option<SMBOplockGrant> {
        let mut slot = self.lock();
        if let Some(grant) = slot.as_mut() {
            f(grant);
        }
        *slot
    }

    fn lock(&self) -> MutexGuard<'_, Option<SMBOplockGrant>> {
        self.grant.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
