use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[repr(u16)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone, Ord, PartialOrd, Default)]
#[allow(non_camel_case_types)]
pub enum SMBDialect {
    V2_0_2 = 0x202,
    V2_1_0 = 0x210,
    V3_0_0 = 0x300,
    V3_0_2 = 0x302,
    V3_1_1 = 0x311,
    #[default]
    V2_X_X = 0x2FF
}

/// The protocol generation a session negotiated.
///
/// SMB1 sessions format oplock breaks as `LOCKING_ANDX` requests, SMB2+
/// sessions use the dedicated oplock break notification.
#[derive(Debug, Eq, PartialEq, Serialize, Deserialize, Copy, Clone)]
pub enum SMBProtocol {
    Smb1,
    Smb2(SMBDialect),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_wire_values() {
        assert_eq!(SMBDialect::V2_0_2 as u16, 0x0202);
        assert_eq!(SMBDialect::V2_1_0 as u16, 0x0210);
        assert_eq!(SMBDialect::V3_0_0 as u16, 0x0300);
        assert_eq!(SMBDialect::V3_1_1 as u16, 0x0311);
        assert_eq!(SMBDialect::V2_X_X as u16, 0x02FF);
    }

    #[test]
    fn dialects_order_by_revision() {
        assert!(SMBDialect::V2_0_2 < SMBDialect::V2_1_0);
        assert!(SMBDialect::V2_1_0 < SMBDialect::V3_0_0);
        assert!(SMBDialect::V3_0_2 < SMBDialect::V3_1_1);
        assert_eq!(SMBDialect::try_from_primitive(0x0302).unwrap(), SMBDialect::V3_0_2);
    }
}
