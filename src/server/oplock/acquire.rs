use std::sync::Arc;

use smb_core::logging::{debug, warn};

use crate::protocol::oplock_break::SMBOplockLevel;
use crate::server::oplock::grant::{SMBExclusiveToken, SMBOplockAcquisition, SMBOplockDialect, SMBOplockGrant};
use crate::server::oplock::SMBOplockManager;
use crate::server::open::Open;
use crate::server::request::{SMBOpenOplockArgs, SMBOplockRequest};
use crate::server::resource::SMBOplockResource;
use crate::server::session::Session;

impl<O: Open> SMBOplockManager<O> {
    /// Decide and record the oplock granted to a new open.
    ///
    /// Clients ask for exclusive or batch but may only get level II or none:
    /// - a solitary open gets what it asked for;
    /// - with other opens around, level II is granted if the open command and
    ///   the session both allow it, no exclusive grant exists and no
    ///   byte-range lock conflicts; otherwise none.
    ///
    /// When something is granted the resource stays exclusively held by the
    /// returned token until the create response is on the wire and the token
    /// is passed to [`complete_acquire`](Self::complete_acquire).
    pub async fn acquire(&self, request: &SMBOplockRequest, args: &SMBOpenOplockArgs, resource: &Arc<SMBOplockResource<O>>, open: &Arc<O>) -> SMBOplockAcquisition {
        let requested = args.requested_level();
        if !self.config.enabled()
            || requested == SMBOplockLevel::None
            || (requested == SMBOplockLevel::Batch && resource.is_named_stream()) {
            return SMBOplockAcquisition::none();
        }

        let mut state = self.lock_state(resource, request.exclusive()).await;
        let session = open.session();
        let session_level_ii = session.as_ref().is_some_and(|session| session.level_ii_oplocks());

        let mut level = requested;
        let shared = args.other_opens()
            || !state.is_empty()
            || !self.config.exclusive_oplocks()
            || args.force_level_2_oplock();
        if shared {
            if !args.level_ii_allowed()
                || !session_level_ii
                || state.exclusive_grant().is_some()
                || args.range_locks() {
                debug!(path = resource.path(), ?requested, "level II oplock not allowed");
                return SMBOplockAcquisition::none();
            }
            level = SMBOplockLevel::II;
        }

        // Breaks for this grant may have to go out after the session is gone,
        // so the dialect is fixed now. Without a session it can't be known.
        let Some(session) = session else {
            warn!(path = resource.path(), "no session to derive oplock dialect from");
            return SMBOplockAcquisition::none();
        };
        if open.oplock().is_granted() || state.holds(open) {
            warn!(path = resource.path(), file_id = ?open.file_id(), "open already holds an oplock");
            return SMBOplockAcquisition::none();
        }
        let dialect = SMBOplockDialect::for_protocol(session.protocol(), args.level_ii_allowed() && session_level_ii);

        if let Err(e) = self.insert_grant(&mut state, resource, open, SMBOplockGrant::new(level, dialect)) {
            warn!(path = resource.path(), %e, "no oplock granted");
            return SMBOplockAcquisition::none();
        }

        let token = SMBExclusiveToken::new();
        state.exclusive_owner = Some(token.id());
        debug!(path = resource.path(), file_id = ?open.file_id(), ?level, ?dialect, message_id = request.message_id(), "oplock granted");
        SMBOplockAcquisition::granted(level, token)
    }
}
