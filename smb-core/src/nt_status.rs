use std::fmt::{Display, Formatter};

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[repr(u32)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, Copy)]
pub enum NTStatus {
    OplockBreakInProgress = 0x00000108,
    InvalidParameter = 0xC000000D,
    InvalidOplockProtocol = 0xC00000E3,
    ConnectionDisconnected = 0xC000020C,
    UnknownError = 0xFFFFFFFF,
}

impl Display for NTStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (0x{:08X})", self, *self as u32)
    }
}
