use std::fmt::{Debug, Formatter};

use crate::server::oplock::{SMBOplock, SMBOplockSnapshot};
use crate::server::open::Open;

/// A lockable file. Owns the oplock state for every open of it.
pub struct SMBOplockResource<O: Open> {
    path: String,
    named_stream: bool,
    oplock: SMBOplock<O>,
}

impl<O: Open> SMBOplockResource<O> {
    pub fn new<T: Into<String>>(path: T) -> Self {
        Self {
            path: path.into(),
            named_stream: false,
            oplock: SMBOplock::new(),
        }
    }

    /// An alternate data stream (`file:stream`) of a file.
    pub fn named_stream<T: Into<String>>(path: T) -> Self {
        Self {
            named_stream: true,
            ..Self::new(path)
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_named_stream(&self) -> bool {
        self.named_stream
    }

    pub fn oplock(&self) -> &SMBOplock<O> {
        &self.oplock
    }

    pub async fn snapshot(&self) -> SMBOplockSnapshot {
        self.oplock.snapshot().await
    }
}

impl<O: Open> Debug for SMBOplockResource<O> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SMBOplockResource")
            .field("path", &self.path)
            .field("named_stream", &self.named_stream)
            .finish()
    }
}
