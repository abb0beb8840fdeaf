use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// Oplock levels as carried in SMB2 CREATE and oplock break messages.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, Serialize, Deserialize, Default)]
pub enum SMBOplockLevel {
    #[default]
    None = 0x0,
    II = 0x1,
    Exclusive = 0x8,
    Batch = 0x9,
}

impl SMBOplockLevel {
    /// Exclusive and batch oplocks permit write caching and admit no other holder.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::Batch)
    }
}
