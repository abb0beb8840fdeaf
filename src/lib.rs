// Logging macros expand to nothing without tracing, leaving their arguments unused.
#![cfg_attr(not(feature = "tracing"), allow(unused_variables))]

//! # SMB Oplock
//!
//! Opportunistic lock handling for an SMB file server: granting oplocks on
//! open, breaking them when another client's access conflicts, and applying
//! the client's acknowledgement (or the lack of one).
//!
//! This crate provides:
//! - **Protocol layer** ([`protocol`]): oplock levels, file ids, dialects and
//!   the SMB1 (`LOCKING_ANDX`) and SMB2 (`OPLOCK_BREAK`) break notification
//!   bodies.
//! - **Server layer** ([`server`]): the [`Open`](server::Open) and
//!   [`Session`](server::Session) seams the host server implements, the
//!   per-resource oplock state and the [`SMBOplockManager`](server::SMBOplockManager)
//!   that drives it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use smb_oplock::protocol::oplock_break::SMBOplockLevel;
//! use smb_oplock::server::{SMBOplockConfig, SMBOplockManager, SMBOpenOplockArgs, SMBOplockRequest};
//!
//! let manager = SMBOplockManager::on_current_runtime(SMBOplockConfig::default())?;
//! let request = SMBOplockRequest::new(message_id, user_id);
//! let acquisition = manager.acquire(&request, &SMBOpenOplockArgs::requesting(SMBOplockLevel::Batch), &resource, &open).await;
//! // ... send the create response carrying acquisition.level() ...
//! if let Some(token) = acquisition.into_token() {
//!     manager.complete_acquire(&resource, token).await;
//! }
//! ```

/// Oplock wire types: levels, file ids, dialects and break notifications.
pub mod protocol;
/// The oplock engine and the traits a server implements to use it.
pub mod server;
