use crate::error::{ReplayError, ReplayErrorKind};
use log::debug;
use netmirror_core::app_packet::TcpMessage;
use netmirror_core::connection::UnixConnection;
use netmirror_core::error::CoreErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One member of the replay pool: a worker socket dialed lazily and kept
/// open across sends. A failed send drops the connection so the next attempt
/// re-dials; retrying the send itself is the worker's business, not ours.
pub struct ReplayEndpoint {
    path: PathBuf,
    send_timeout: Duration,
    connection: Option<UnixConnection>,
}

impl ReplayEndpoint {
    pub fn new(path: PathBuf, send_timeout: Duration) -> Self {
        Self {
            path,
            send_timeout,
            connection: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn send(&mut self, message: &TcpMessage) -> Result<(), ReplayError> {
        if self.connection.is_none() {
            self.connection = Some(self.dial().await?);
        }
        if let Some(connection) = self.connection.as_mut() {
            if let Err(e) = connection.send_packet(message).await {
                debug!("Dropping connection to {}: {e}", self.path.display());
                self.connection = None;
                return Err(ReplayError::new(ReplayErrorKind::SendFailed, &e.to_string()));
            }
        }
        Ok(())
    }

    async fn dial(&self) -> Result<UnixConnection, ReplayError> {
        UnixConnection::connect(&self.path, self.send_timeout)
            .await
            .map_err(|e| match e.error_kind {
                CoreErrorKind::ConnectionError => {
                    ReplayError::new(ReplayErrorKind::EndpointUnreachable, &e.message)
                }
                _ => ReplayError::from(e),
            })
    }
}
