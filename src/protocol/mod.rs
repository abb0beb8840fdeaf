/// SMB dialect values and the protocol generation a session negotiated.
pub mod dialect;
/// SMB file identifiers.
pub mod file_id;
/// Oplock levels and the SMB1/SMB2 break notification bodies.
pub mod oplock_break;
