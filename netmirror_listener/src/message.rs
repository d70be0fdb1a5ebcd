//! Per-flow reassembly tasks.
//!
//! Each in-flight message is one task owning its payload buffer, fed through
//! a private channel and guarded by its own inactivity watchdog. The task
//! reports the finished message on the dispatcher's disposition channel
//! exactly once, whichever of completion or expiry happens first.

use log::debug;
use netmirror_core::app_packet::TcpMessage;
use netmirror_core::packet::{CapturedPacket, FlowKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::Sender;
use tokio::time::{Instant, sleep_until};

/// Decides whether a packet ends the application message it belongs to.
/// The push flag is the historical heuristic; protocols that batch several
/// logical messages into one push can plug in something smarter.
pub trait BoundaryPolicy: Send + Sync {
    fn is_boundary(&self, packet: &CapturedPacket) -> bool;
}

pub struct PushBoundary;

impl BoundaryPolicy for PushBoundary {
    fn is_boundary(&self, packet: &CapturedPacket) -> bool {
        packet.has_push()
    }
}

#[derive(Clone)]
pub struct MessageSettings {
    pub expiry: Duration,
    pub max_message_size: usize,
    pub queue_capacity: usize,
    pub boundary: Arc<dyn BoundaryPolicy>,
}

impl MessageSettings {
    pub fn new(expiry: Duration, max_message_size: usize, queue_capacity: usize) -> Self {
        Self {
            expiry,
            max_message_size,
            queue_capacity,
            boundary: Arc::new(PushBoundary),
        }
    }
}

/// Dispatcher-side handle of one in-flight message.
pub(crate) struct MessageHandle {
    tx: Sender<CapturedPacket>,
}

impl MessageHandle {
    /// False once the message has reported its disposition; the packet is
    /// then the dispatcher's to drop.
    pub async fn append(&self, packet: CapturedPacket) -> bool {
        self.tx.send(packet).await.is_ok()
    }
}

pub(crate) fn spawn_message(
    flow: FlowKey,
    settings: MessageSettings,
    disposition_tx: Sender<TcpMessage>,
) -> MessageHandle {
    let (tx, mut rx) = mpsc::channel(settings.queue_capacity);
    tokio::spawn(async move {
        let mut message = TcpMessage::new(flow);
        let mut deadline = Instant::now() + settings.expiry;
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(packet) => {
                        let boundary = settings.boundary.is_boundary(&packet);
                        message.append(&packet);
                        if boundary || message.payload.len() >= settings.max_message_size {
                            message.complete();
                            break;
                        }
                        deadline = Instant::now() + settings.expiry;
                    }
                    // Dispatcher is gone; expire so a draining consumer still
                    // sees the bytes collected so far.
                    None => {
                        message.expire();
                        break;
                    }
                },
                _ = sleep_until(deadline) => {
                    message.expire();
                    break;
                }
            }
        }
        // Refuse further packets before reporting, so a late packet cannot
        // race the table eviction.
        rx.close();
        if disposition_tx.send(message).await.is_err() {
            debug!("Disposition channel closed, dropping message for flow {flow}");
        }
    });
    MessageHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmirror_core::app_packet::MessageStatus;
    use std::time::SystemTime;

    const PSH: u8 = 0b0000_1000;

    fn packet(ack: u32, payload: &[u8], push: bool) -> CapturedPacket {
        CapturedPacket {
            src_port: 40000,
            dst_port: 80,
            flags: if push { PSH } else { 0 },
            seq: 0,
            ack,
            payload: payload.to_vec(),
            timestamp: SystemTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn boundary_packet_completes_message() {
        let settings = MessageSettings::new(Duration::from_secs(30), 1024, 16);
        let (disposition_tx, mut disposition_rx) = mpsc::channel(4);
        let handle = spawn_message(FlowKey(42), settings, disposition_tx);

        assert!(handle.append(packet(42, b"GET /", false)).await);
        assert!(handle.append(packet(42, b" HTTP/1.1\r\n\r\n", true)).await);

        let message = disposition_rx.recv().await.unwrap();
        assert_eq!(message.status, MessageStatus::Completed);
        assert_eq!(message.payload, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(message.packets, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_expires_idle_message() {
        let settings = MessageSettings::new(Duration::from_millis(200), 1024, 16);
        let (disposition_tx, mut disposition_rx) = mpsc::channel(4);
        let handle = spawn_message(FlowKey(7), settings, disposition_tx);

        assert!(handle.append(packet(7, b"lonely", false)).await);

        let message = disposition_rx.recv().await.unwrap();
        assert_eq!(message.status, MessageStatus::Expired);
        assert_eq!(message.payload, b"lonely");
    }

    #[tokio::test]
    async fn size_threshold_completes_without_boundary() {
        let settings = MessageSettings::new(Duration::from_secs(30), 8, 16);
        let (disposition_tx, mut disposition_rx) = mpsc::channel(4);
        let handle = spawn_message(FlowKey(5), settings, disposition_tx);

        assert!(handle.append(packet(5, b"01234", false)).await);
        assert!(handle.append(packet(5, b"56789", false)).await);

        let message = disposition_rx.recv().await.unwrap();
        assert_eq!(message.status, MessageStatus::Completed);
        assert_eq!(message.payload, b"0123456789");
    }

    #[tokio::test]
    async fn appends_rejected_after_disposition() {
        let settings = MessageSettings::new(Duration::from_secs(30), 1024, 16);
        let (disposition_tx, mut disposition_rx) = mpsc::channel(4);
        let handle = spawn_message(FlowKey(3), settings, disposition_tx);

        assert!(handle.append(packet(3, b"done", true)).await);
        let message = disposition_rx.recv().await.unwrap();
        assert_eq!(message.status, MessageStatus::Completed);

        assert!(!handle.append(packet(3, b"late", false)).await);
    }
}
