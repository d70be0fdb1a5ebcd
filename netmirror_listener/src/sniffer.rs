use crate::error::ListenerError;
use crate::source::PacketSource;
use log::{debug, info};
use netmirror_core::packet::CapturedPacket;
use pcap::{Activated, State};
use tokio::sync::mpsc::Sender;

/// Filters the capture stream down to candidate end-of-message packets and
/// feeds them to the dispatcher over the bounded capture queue.
pub struct Sniffer {
    port: u16,
    tx: Sender<CapturedPacket>,
}

impl Sniffer {
    pub fn new(port: u16, tx: Sender<CapturedPacket>) -> Self {
        Self { port, tx }
    }

    /// A packet survives iff it targets the configured port and carries the
    /// push flag. Everything else is continuation traffic or noise caught by
    /// the coarser capture filter.
    fn accepts(&self, packet: &CapturedPacket) -> bool {
        packet.dst_port == self.port && packet.has_push()
    }

    /// Blocking loop; run on a dedicated blocking task. A full capture queue
    /// intentionally stalls this loop instead of buffering without bound.
    pub fn run<T>(self, mut source: PacketSource<T>) -> Result<(), ListenerError>
    where
        T: State + Activated,
    {
        info!("Capture ready");
        while let Some(packet) = source.next_packet()? {
            if !self.accepts(&packet) {
                continue;
            }
            if self.tx.blocking_send(packet).is_err() {
                debug!("Capture queue closed, stopping sniffer");
                return Ok(());
            }
        }
        info!("Capture exhausted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tokio::sync::mpsc;

    const PSH: u8 = 0b0000_1000;

    fn packet(dst_port: u16, flags: u8) -> CapturedPacket {
        CapturedPacket {
            src_port: 40000,
            dst_port,
            flags,
            seq: 0,
            ack: 1,
            payload: Vec::new(),
            timestamp: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn accepts_push_packets_for_configured_port() {
        let (tx, _rx) = mpsc::channel(1);
        let sniffer = Sniffer::new(80, tx);
        assert!(sniffer.accepts(&packet(80, PSH)));
    }

    #[test]
    fn rejects_wrong_port_and_missing_push() {
        let (tx, _rx) = mpsc::channel(1);
        let sniffer = Sniffer::new(80, tx);
        assert!(!sniffer.accepts(&packet(81, PSH)));
        assert!(!sniffer.accepts(&packet(80, 0)));
    }
}
