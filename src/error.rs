use netmirror_core::error::CoreError;
use netmirror_listener::error::ListenerError;
use netmirror_replay::error::ReplayError;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AppErrorKind {
    #[error("{0}")]
    CoreError(#[from] CoreError),
    #[error("{0}")]
    ListenerError(#[from] ListenerError),
    #[error("{0}")]
    ReplayError(#[from] ReplayError),
    #[error("Tokio error")]
    TokioError,
}

#[derive(Error, Clone)]
pub struct AppError {
    pub error_kind: AppErrorKind,
    pub message: String,
}

impl Debug for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.error_kind {
            AppErrorKind::CoreError(e) => write!(f, "AppError -> {}", e),
            AppErrorKind::ListenerError(e) => write!(f, "AppError -> {}", e),
            AppErrorKind::ReplayError(e) => write!(f, "AppError -> {}", e),
            _ => write!(f, "AppError: {}: {}", self.error_kind, self.message),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.error_kind {
            AppErrorKind::ListenerError(e) => write!(f, "AppError -> {}", e),
            AppErrorKind::ReplayError(e) => write!(f, "AppError -> {}", e),
            _ => write!(f, "AppError: {}: {}", self.error_kind, self.message),
        }
    }
}

impl AppError {
    pub fn new(error_kind: AppErrorKind, message: &str) -> Self {
        Self {
            error_kind,
            message: message.to_owned(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(value: CoreError) -> Self {
        Self::new(AppErrorKind::CoreError(value), "")
    }
}

impl From<ListenerError> for AppError {
    fn from(value: ListenerError) -> Self {
        Self::new(AppErrorKind::ListenerError(value), "")
    }
}

impl From<ReplayError> for AppError {
    fn from(value: ReplayError) -> Self {
        Self::new(AppErrorKind::ReplayError(value), "")
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(AppErrorKind::TokioError, value.to_string().as_str())
    }
}
