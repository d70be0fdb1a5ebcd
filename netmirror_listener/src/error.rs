use netmirror_core::error::CoreError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ListenerErrorKind {
    #[error("{0}")]
    CoreError(CoreError),
    #[error("Capture error")]
    CaptureError,
    #[error("Channel error")]
    ChannelError,
}

#[derive(Error, Debug, Clone)]
pub struct ListenerError {
    pub error_kind: ListenerErrorKind,
    pub message: String,
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.error_kind {
            ListenerErrorKind::CoreError(e) => write!(f, "ListenerError -> {}", e),
            _ => write!(f, "ListenerError: {}: {}", self.error_kind, self.message),
        }
    }
}

impl ListenerError {
    pub fn new(error_kind: ListenerErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<CoreError> for ListenerError {
    fn from(value: CoreError) -> Self {
        Self::new(ListenerErrorKind::CoreError(value), "")
    }
}

impl From<pcap::Error> for ListenerError {
    fn from(value: pcap::Error) -> Self {
        Self::new(ListenerErrorKind::CaptureError, value.to_string().as_str())
    }
}
