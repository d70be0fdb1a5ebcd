use netmirror_core::error::CoreError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ReplayErrorKind {
    #[error("{0}")]
    CoreError(CoreError),
    #[error("Replay endpoint unreachable")]
    EndpointUnreachable,
    #[error("Send to replay endpoint failed")]
    SendFailed,
    #[error("Invalid replay configuration")]
    InvalidConfig,
}

#[derive(Error, Debug, Clone)]
pub struct ReplayError {
    pub error_kind: ReplayErrorKind,
    pub message: String,
}

impl Display for ReplayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.error_kind {
            ReplayErrorKind::CoreError(e) => write!(f, "ReplayError -> {}", e),
            _ => write!(f, "ReplayError: {}: {}", self.error_kind, self.message),
        }
    }
}

impl ReplayError {
    pub fn new(error_kind: ReplayErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<CoreError> for ReplayError {
    fn from(value: CoreError) -> Self {
        Self::new(ReplayErrorKind::CoreError(value), "")
    }
}
