use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::nt_status::NTStatus;

#[derive(Debug)]
pub enum SMBError {
    PreconditionFailed(SMBPreconditionFailedError),
    ResponseError(SMBResponseError),
    ServerError(SMBServerError),
    Busy(SMBBusyError),
    SendFailure(SMBSendFailureError),
}

impl SMBError {
    pub fn precondition_failed<T: Into<SMBPreconditionFailedError>>(error: T) -> Self {
        Self::PreconditionFailed(error.into())
    }

    pub fn response_error<T: Into<SMBResponseError>>(error: T) -> Self {
        Self::ResponseError(error.into())
    }

    pub fn server_error<T: Into<SMBServerError>>(error: T) -> Self {
        Self::ServerError(error.into())
    }

    pub fn busy<T: Into<SMBBusyError>>(error: T) -> Self {
        Self::Busy(error.into())
    }

    pub fn send_failure<T: Into<SMBSendFailureError>>(error: T) -> Self {
        Self::SendFailure(error.into())
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    /// The status a response carrying this error should report.
    pub fn status(&self) -> NTStatus {
        match self {
            Self::PreconditionFailed(_) => NTStatus::InvalidParameter,
            Self::ResponseError(x) => x.status,
            Self::ServerError(_) => NTStatus::UnknownError,
            Self::Busy(_) => NTStatus::OplockBreakInProgress,
            Self::SendFailure(_) => NTStatus::ConnectionDisconnected,
        }
    }
}

#[derive(Debug)]
pub struct SMBPreconditionFailedError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBPreconditionFailedError {
    fn from(value: T) -> Self {
        Self {
            message: value.into()
        }
    }
}

impl Display for SMBPreconditionFailedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation failed with unmet precondition: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBResponseError {
    status: NTStatus,
}

impl From<NTStatus> for SMBResponseError {
    fn from(value: NTStatus) -> Self {
        Self {
            status: value
        }
    }
}

impl Display for SMBResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMB request rejected with status: {}", self.status)
    }
}

#[derive(Debug)]
pub struct SMBServerError {
    error: Box<dyn Error + Send + Sync>,
}

impl<T: Into<Box<dyn Error + Send + Sync>>> From<T> for SMBServerError {
    fn from(value: T) -> Self {
        Self {
            error: value.into()
        }
    }
}

impl Display for SMBServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Server operation failed with error: {}", self.error)
    }
}

#[derive(Debug)]
pub struct SMBBusyError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBBusyError {
    fn from(value: T) -> Self {
        Self {
            message: value.into()
        }
    }
}

impl Display for SMBBusyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation would block: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBSendFailureError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBSendFailureError {
    fn from(value: T) -> Self {
        Self {
            message: value.into()
        }
    }
}

impl Display for SMBSendFailureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Message could not be delivered: {}", self.message)
    }
}

impl Display for SMBError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreconditionFailed(x) => write!(f, "{}", x),
            Self::ResponseError(x) => write!(f, "{}", x),
            Self::ServerError(x) => write!(f, "{}", x),
            Self::Busy(x) => write!(f, "{}", x),
            Self::SendFailure(x) => write!(f, "{}", x),
        }
    }
}

impl std::error::Error for SMBError {}
