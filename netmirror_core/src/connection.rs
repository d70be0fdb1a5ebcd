use crate::error::{CoreError, CoreErrorKind};
use bincode::{Decode, Encode};
use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use log::debug;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Length-delimited bincode frames over a local socket. The replay workers
/// own the other end; this side only connects, writes and classifies
/// failures.
#[derive(Debug)]
pub struct UnixConnection {
    pub framed: Framed<UnixStream, LengthDelimitedCodec>,
    pub send_timeout: Duration,
}

impl UnixConnection {
    /// Connects to an endpoint socket path. A missing or refusing socket maps
    /// to `ConnectionError` so callers can tell "unreachable" apart from
    /// transient I/O trouble on an established connection.
    pub async fn connect(path: &Path, send_timeout: Duration) -> Result<Self, CoreError> {
        let stream = timeout(send_timeout, UnixStream::connect(path))
            .await
            .map_err(|_| {
                CoreError::new(
                    CoreErrorKind::TimeoutError,
                    &format!("connection to {} timed out", path.display()),
                )
            })?
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::PermissionDenied => {
                    CoreError::new(
                        CoreErrorKind::ConnectionError,
                        &format!("endpoint {} unreachable: {e}", path.display()),
                    )
                }
                _ => CoreError::from(e),
            })?;

        debug!("Connected to endpoint {}", path.display());

        Ok(Self {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
            send_timeout,
        })
    }

    pub async fn send_packet<T>(&mut self, packet: &T) -> Result<(), CoreError>
    where
        T: Encode,
    {
        let encoded = Self::encode_frame(packet)?;
        timeout(self.send_timeout, self.framed.send(Bytes::from(encoded)))
            .await
            .map_err(|_| {
                CoreError::new(CoreErrorKind::TimeoutError, "sending a packet timed out")
            })??;
        Ok(())
    }

    pub async fn receive_next<T>(&mut self) -> Result<Option<(T, usize)>, CoreError>
    where
        T: Decode<()>,
    {
        match self.framed.next().await {
            None => Ok(None),
            Some(frame) => {
                let decoded = Self::decode_frame(frame?)?;
                Ok(Some(decoded))
            }
        }
    }

    pub fn encode_frame<T>(packet: &T) -> Result<Vec<u8>, CoreError>
    where
        T: Encode,
    {
        bincode::encode_to_vec(packet, bincode::config::standard()).map_err(CoreError::from)
    }

    pub fn decode_frame<T>(frame: BytesMut) -> Result<(T, usize), CoreError>
    where
        T: Decode<()>,
    {
        bincode::decode_from_slice(frame.as_ref(), bincode::config::standard())
            .map_err(CoreError::from)
    }
}
