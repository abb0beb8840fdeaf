use derive_builder::Builder;
use uuid::Uuid;

use crate::protocol::oplock_break::SMBOplockLevel;
use crate::server::oplock::SMBExclusiveToken;

/// The client request on whose behalf an oplock operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SMBOplockRequest {
    message_id: u64,
    user_id: u64,
    exclusive: Option<Uuid>,
}

impl SMBOplockRequest {
    pub fn new(message_id: u64, user_id: u64) -> Self {
        Self {
            message_id,
            user_id,
            exclusive: None,
        }
    }

    /// Mark this request as the holder of an outstanding acquire, so it does
    /// not wait on its own exclusive token.
    pub fn with_exclusive(mut self, token: &SMBExclusiveToken) -> Self {
        self.exclusive = Some(token.id());
        self
    }

    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn exclusive(&self) -> Option<Uuid> {
        self.exclusive
    }
}

/// What the open path knows about a new open when it asks for an oplock.
///
/// Open counts and byte-range locks are tracked outside the engine; the
/// caller summarizes them here.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", default)]
pub struct SMBOpenOplockArgs {
    requested_level: SMBOplockLevel,
    /// The open command can take a level II oplock in place of the one requested.
    level_ii_allowed: bool,
    /// Some other open (or open in progress) exists on the resource.
    other_opens: bool,
    /// A byte-range lock on the resource conflicts with caching.
    range_locks: bool,
    /// The share never hands out exclusive oplocks.
    force_level_2_oplock: bool,
}

impl Default for SMBOpenOplockArgs {
    fn default() -> Self {
        Self {
            requested_level: SMBOplockLevel::None,
            level_ii_allowed: true,
            other_opens: false,
            range_locks: false,
            force_level_2_oplock: false,
        }
    }
}

impl SMBOpenOplockArgs {
    pub fn builder() -> SMBOpenOplockArgsBuilder {
        SMBOpenOplockArgsBuilder::default()
    }

    pub fn requesting(level: SMBOplockLevel) -> Self {
        Self {
            requested_level: level,
            ..Default::default()
        }
    }

    pub fn requested_level(&self) -> SMBOplockLevel {
        self.requested_level
    }

    pub fn level_ii_allowed(&self) -> bool {
        self.level_ii_allowed
    }

    pub fn other_opens(&self) -> bool {
        self.other_opens
    }

    pub fn range_locks(&self) -> bool {
        self.range_locks
    }

    pub fn force_level_2_oplock(&self) -> bool {
        self.force_level_2_oplock
    }
}
