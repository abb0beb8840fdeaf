use serde::{Deserialize, Serialize};

#[derive(Debug, Eq, PartialEq, Hash, Serialize, Deserialize, Clone, Copy, Default)]
pub struct SMBFileId {
    pub persistent: u64,
    pub volatile: u64,
}

impl SMBFileId {
    pub fn new(persistent: u64, volatile: u64) -> Self {
        Self { persistent, volatile }
    }

    /// SMB1 only has a 16-bit FID; it is the low half of the volatile id.
    pub fn smb1_fid(&self) -> u16 {
        (self.volatile & 0xFFFF) as u16
    }
}
