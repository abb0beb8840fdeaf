use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::protocol::file_id::SMBFileId;

pub use oplock_level::SMBOplockLevel;

mod oplock_level;

/// SMB2 OPLOCK_BREAK notification body (MS-SMB2 2.2.23.1).
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct SMBOplockBreakContent {
    level: SMBOplockLevel,
    file_id: SMBFileId,
}

impl SMBOplockBreakContent {
    pub fn new(level: SMBOplockLevel, file_id: SMBFileId) -> Self {
        Self { level, file_id }
    }

    pub fn level(&self) -> SMBOplockLevel {
        self.level
    }

    pub fn file_id(&self) -> SMBFileId {
        self.file_id
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SMBLockingAndXType: u8 {
        const SHARED_LOCK = 0x01;
        const OPLOCK_RELEASE = 0x02;
        const CHANGE_LOCKTYPE = 0x04;
        const CANCEL_LOCK = 0x08;
        const LARGE_FILES = 0x10;
    }
}

/// SMB1 oplock break: a server-initiated `LOCKING_ANDX` request with
/// `OPLOCK_RELEASE` set and no lock ranges.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct SMBLockingAndXOplockBreak {
    fid: u16,
    lock_type: SMBLockingAndXType,
    new_oplock_level: u8,
}

impl SMBLockingAndXOplockBreak {
    pub fn new(fid: u16, level: SMBOplockLevel) -> Self {
        let new_oplock_level = match level {
            SMBOplockLevel::II => 1,
            _ => 0,
        };
        Self {
            fid,
            lock_type: SMBLockingAndXType::OPLOCK_RELEASE,
            new_oplock_level,
        }
    }

    pub fn fid(&self) -> u16 {
        self.fid
    }

    pub fn lock_type(&self) -> SMBLockingAndXType {
        self.lock_type
    }

    pub fn level(&self) -> SMBOplockLevel {
        match self.new_oplock_level {
            1 => SMBOplockLevel::II,
            _ => SMBOplockLevel::None,
        }
    }
}

/// A break notification in the format of the session it is sent on.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum SMBOplockBreakNotification {
    Smb1(SMBLockingAndXOplockBreak),
    Smb2(SMBOplockBreakContent),
}

impl SMBOplockBreakNotification {
    pub fn level(&self) -> SMBOplockLevel {
        match self {
            Self::Smb1(x) => x.level(),
            Self::Smb2(x) => x.level(),
        }
    }
}
