pub mod config;
pub mod open;
pub mod oplock;
pub mod request;
pub mod resource;
pub mod session;

pub use config::{SMBOplockConfig, SMBOplockConfigBuilder};
pub use open::{Open, SMBDurability, SMBOplockSlot};
pub use oplock::{SMBExclusiveToken, SMBOplockAcquisition, SMBOplockBreak, SMBOplockBreakFlags, SMBOplockManager};
pub use request::{SMBOpenOplockArgs, SMBOpenOplockArgsBuilder, SMBOplockRequest};
pub use resource::SMBOplockResource;
pub use session::Session;
