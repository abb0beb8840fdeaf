use std::sync::Arc;

use smb_core::SMBResult;

use crate::server::open::Open;
use crate::server::resource::SMBOplockResource;

/// Monitor that lets accesses from outside SMB (NFS, local processes)
/// break oplocks on a resource.
///
/// Installed when a resource gets its first grant and removed when its last
/// grant goes away. Implementations call
/// [`SMBOplockManager::break_oplock`](crate::server::SMBOplockManager::break_oplock)
/// with no originating request when they see a conflicting access.
/// Both methods run with the resource's oplock mutex held and must not block.
pub trait SMBNotifyHook<O: Open>: Send + Sync {
    fn install(&self, resource: &Arc<SMBOplockResource<O>>) -> SMBResult<()>;

    fn uninstall(&self, resource: &Arc<SMBOplockResource<O>>);
}

/// For servers whose files are only reachable over SMB.
#[derive(Debug, Default, Clone, Copy)]
pub struct SMBNoNotifyHook;

impl<O: Open> SMBNotifyHook<O> for SMBNoNotifyHook {
    fn install(&self, _resource: &Arc<SMBOplockResource<O>>) -> SMBResult<()> {
        Ok(())
    }

    fn uninstall(&self, _resource: &Arc<SMBOplockResource<O>>) {}
}
