use std::future::Future;

use smb_core::SMBResult;

use crate::protocol::dialect::SMBProtocol;
use crate::protocol::oplock_break::SMBOplockBreakNotification;

/// The live network session an open was created on.
///
/// The oplock engine only ever sends break notifications through it;
/// transport framing and signing belong to the implementor.
pub trait Session: Send + Sync + 'static {
    fn protocol(&self) -> SMBProtocol;

    /// Whether the client negotiated level II oplock support.
    fn level_ii_oplocks(&self) -> bool;

    /// False once the session is tearing down and no new requests may be
    /// allocated on it.
    fn accepts_requests(&self) -> bool;

    /// Put a break notification on the wire. An error means the client could
    /// not be reached.
    fn send_oplock_break(&self, notification: SMBOplockBreakNotification) -> impl Future<Output=SMBResult<()>> + Send;
}
