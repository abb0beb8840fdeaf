use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;

use crate::protocol::dialect::{SMBDialect, SMBProtocol};
use crate::protocol::oplock_break::SMBOplockLevel;

/// The dialect recorded with a grant, which decides how its breaks are sent.
///
/// Recorded at grant time since the open may lose its session before the
/// break goes out. Ordered from oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SMBOplockDialect {
    /// SMB1 without level II support: breaks can only go to none.
    LanMan2_1,
    NtLm0_12,
    Smb2(SMBDialect),
}

impl SMBOplockDialect {
    pub fn for_protocol(protocol: SMBProtocol, level_ii: bool) -> Self {
        match protocol {
            SMBProtocol::Smb2(dialect) => Self::Smb2(dialect),
            SMBProtocol::Smb1 if level_ii => Self::NtLm0_12,
            SMBProtocol::Smb1 => Self::LanMan2_1,
        }
    }

    pub fn supports_level_ii(&self) -> bool {
        *self >= Self::NtLm0_12
    }

    pub fn is_smb2(&self) -> bool {
        matches!(self, Self::Smb2(_))
    }
}

/// The level a break takes an exclusive or batch oplock down to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SMBOplockBreak {
    ToLevelII,
    ToNone,
}

impl SMBOplockBreak {
    pub fn target_level(&self) -> SMBOplockLevel {
        match self {
            Self::ToLevelII => SMBOplockLevel::II,
            Self::ToNone => SMBOplockLevel::None,
        }
    }
}

/// Maps the level a client acknowledged to the break it accepted.
impl TryFrom<SMBOplockLevel> for SMBOplockBreak {
    type Error = SMBError;

    fn try_from(value: SMBOplockLevel) -> Result<Self, Self::Error> {
        match value {
            SMBOplockLevel::None => Ok(Self::ToNone),
            SMBOplockLevel::II => Ok(Self::ToLevelII),
            _ => Err(SMBError::response_error(NTStatus::InvalidOplockProtocol)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SMBOplockGrant {
    level: SMBOplockLevel,
    dialect: SMBOplockDialect,
    breaking: Option<SMBOplockBreak>,
}

impl SMBOplockGrant {
    pub fn new(level: SMBOplockLevel, dialect: SMBOplockDialect) -> Self {
        Self {
            level,
            dialect,
            breaking: None,
        }
    }

    pub fn level(&self) -> SMBOplockLevel {
        self.level
    }

    pub fn dialect(&self) -> SMBOplockDialect {
        self.dialect
    }

    pub fn breaking(&self) -> Option<SMBOplockBreak> {
        self.breaking
    }

    pub(crate) fn set_level(&mut self, level: SMBOplockLevel) {
        self.level = level;
    }

    pub(crate) fn set_breaking(&mut self, breaking: Option<SMBOplockBreak>) {
        self.breaking = breaking;
    }

    /// Copy of this grant marked with the break being delivered for it.
    pub(crate) fn breaking_to(mut self, brk: SMBOplockBreak) -> Self {
        self.breaking = Some(brk);
        self
    }
}

/// Proof that the holder performed an acquire whose response is not on the
/// wire yet.
///
/// Every other operation on the resource waits until the token is handed
/// back through
/// [`SMBOplockManager::complete_acquire`](crate::server::SMBOplockManager::complete_acquire),
/// so no break can reference a grant the client has not been told about.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the resource stays locked until the token is passed to complete_acquire"]
pub struct SMBExclusiveToken {
    id: Uuid,
}

impl SMBExclusiveToken {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Result of an acquire: the granted level and, for anything above none,
/// the exclusive token the send path must return.
#[derive(Debug)]
pub struct SMBOplockAcquisition {
    level: SMBOplockLevel,
    token: Option<SMBExclusiveToken>,
}

impl SMBOplockAcquisition {
    pub(crate) fn none() -> Self {
        Self {
            level: SMBOplockLevel::None,
            token: None,
        }
    }

    pub(crate) fn granted(level: SMBOplockLevel, token: SMBExclusiveToken) -> Self {
        Self {
            level,
            token: Some(token),
        }
    }

    pub fn level(&self) -> SMBOplockLevel {
        self.level
    }

    pub fn into_token(self) -> Option<SMBExclusiveToken> {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_selection() {
        assert_eq!(SMBOplockDialect::for_protocol(SMBProtocol::Smb2(SMBDialect::V3_0_0), false),
                   SMBOplockDialect::Smb2(SMBDialect::V3_0_0));
        assert_eq!(SMBOplockDialect::for_protocol(SMBProtocol::Smb1, true), SMBOplockDialect::NtLm0_12);
        assert_eq!(SMBOplockDialect::for_protocol(SMBProtocol::Smb1, false), SMBOplockDialect::LanMan2_1);
    }

    #[test]
    fn level_ii_breaks_need_nt_lm_or_newer() {
        assert!(!SMBOplockDialect::LanMan2_1.supports_level_ii());
        assert!(SMBOplockDialect::NtLm0_12.supports_level_ii());
        assert!(SMBOplockDialect::Smb2(SMBDialect::V2_0_2).supports_level_ii());
    }

    #[test]
    fn ack_level_mapping() {
        assert_eq!(SMBOplockBreak::try_from(SMBOplockLevel::None).unwrap(), SMBOplockBreak::ToNone);
        assert_eq!(SMBOplockBreak::try_from(SMBOplockLevel::II).unwrap(), SMBOplockBreak::ToLevelII);
        let err = SMBOplockBreak::try_from(SMBOplockLevel::Batch).unwrap_err();
        assert_eq!(err.status(), NTStatus::InvalidOplockProtocol);
    }

    #[test]
    fn breaking_copy_leaves_original() {
        let grant = SMBOplockGrant::new(SMBOplockLevel::Exclusive, SMBOplockDialect::NtLm0_12);
        let snapshot = grant.breaking_to(SMBOplockBreak::ToLevelII);
        assert_eq!(grant.breaking(), None);
        assert_eq!(snapshot.breaking(), Some(SMBOplockBreak::ToLevelII));
        assert_eq!(SMBOplockBreak::ToLevelII.target_level(), SMBOplockLevel::II);
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(SMBExclusiveToken::new().id(), SMBExclusiveToken::new().id());
    }
}
