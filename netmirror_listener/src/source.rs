use crate::error::ListenerError;
use log::debug;
use netmirror_core::capture::PacketCapture;
use netmirror_core::packet::CapturedPacket;
use pcap::{Activated, Capture, Error, State};
use std::time::{Duration, SystemTime};

/// Lazy, unbounded sequence of decoded packets off one capture handle.
pub struct PacketSource<T>
where
    T: State + Activated,
{
    capture: Capture<T>,
}

impl<T> PacketSource<T>
where
    T: State + Activated,
{
    pub fn new(mut capture: impl PacketCapture<T>) -> Result<Self, ListenerError> {
        capture.apply_filter()?;
        Ok(Self {
            capture: capture.get_capture(),
        })
    }

    /// Blocks until the next frame that decodes into a TCP packet.
    /// Undecodable frames and frames without a TCP layer are expected noise
    /// and skipped silently. `None` only when an offline capture runs out.
    pub fn next_packet(&mut self) -> Result<Option<CapturedPacket>, ListenerError> {
        loop {
            let frame = match self.capture.next_packet() {
                Ok(frame) => frame,
                Err(Error::TimeoutExpired) => continue,
                Err(Error::NoMorePackets) => return Ok(None),
                Err(e) => return Err(ListenerError::from(e)),
            };
            let timestamp = SystemTime::UNIX_EPOCH
                + Duration::new(
                    frame.header.ts.tv_sec as u64,
                    frame.header.ts.tv_usec as u32 * 1000,
                );
            match CapturedPacket::from_frame(frame.data, timestamp) {
                Some(packet) => return Ok(Some(packet)),
                None => {
                    debug!("Not a TCP frame, skipping");
                    continue;
                }
            }
        }
    }
}
