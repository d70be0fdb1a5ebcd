use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoreErrorKind {
    #[error("Capture error")]
    CaptureError,
    #[error("Capture device not found")]
    DeviceNotFound,
    #[error("Capture filter error")]
    FilterError,
    #[error("Connection error")]
    ConnectionError,
    #[error("Encode/Decode error")]
    EncodeDecodeError,
    #[error("I/O error from Tokio")]
    IoError,
    #[error("Timeout error")]
    TimeoutError,
    #[error("Tokio mpsc channel error")]
    ChannelError,
    #[error("Tokio task error")]
    TaskError,
}

#[derive(Debug, Clone, Error)]
pub struct CoreError {
    pub error_kind: CoreErrorKind,
    pub message: String,
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CoreError: {}: {}", self.error_kind, self.message)
    }
}

impl CoreError {
    pub fn new(error_kind: CoreErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<pcap::Error> for CoreError {
    fn from(value: pcap::Error) -> Self {
        Self::new(CoreErrorKind::CaptureError, &value.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(value: std::io::Error) -> Self {
        Self::new(CoreErrorKind::IoError, value.to_string().as_str())
    }
}

impl From<bincode::error::EncodeError> for CoreError {
    fn from(value: bincode::error::EncodeError) -> Self {
        Self::new(CoreErrorKind::EncodeDecodeError, value.to_string().as_str())
    }
}

impl From<bincode::error::DecodeError> for CoreError {
    fn from(value: bincode::error::DecodeError) -> Self {
        Self::new(CoreErrorKind::EncodeDecodeError, value.to_string().as_str())
    }
}

impl From<tokio::time::error::Elapsed> for CoreError {
    fn from(value: tokio::time::error::Elapsed) -> Self {
        Self::new(CoreErrorKind::TimeoutError, value.to_string().as_str())
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(CoreErrorKind::TaskError, value.to_string().as_str())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for CoreError {
    fn from(value: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::new(CoreErrorKind::ChannelError, value.to_string().as_str())
    }
}
