use crate::message::{MessageHandle, MessageSettings, spawn_message};
use log::debug;
use netmirror_core::app_packet::TcpMessage;
use netmirror_core::packet::{CapturedPacket, FlowKey};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::mpsc::{Receiver, Sender, channel};

/// Single owner of the in-flight message table, keyed by FlowKey. Every read
/// and write of the table happens on this task; the sniffer and the message
/// tasks only talk to it through queues, so there is nothing to lock.
pub struct Dispatcher {
    messages: HashMap<FlowKey, MessageHandle>,
    packet_rx: Receiver<CapturedPacket>,
    disposition_tx: Sender<TcpMessage>,
    disposition_rx: Receiver<TcpMessage>,
    delivery_tx: Sender<TcpMessage>,
    settings: MessageSettings,
}

impl Dispatcher {
    pub fn new(
        packet_rx: Receiver<CapturedPacket>,
        delivery_tx: Sender<TcpMessage>,
        settings: MessageSettings,
    ) -> Self {
        let (disposition_tx, disposition_rx) = channel(settings.queue_capacity);
        Self {
            messages: HashMap::new(),
            packet_rx,
            disposition_tx,
            disposition_rx,
            delivery_tx,
            settings,
        }
    }

    /// Services the capture queue and the disposition queue until the capture
    /// side closes, then drains the table. `select!` polls the branches in
    /// random order, so a burst of new packets cannot starve dispositions.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                finished = self.disposition_rx.recv() => {
                    let Some(message) = finished else { return };
                    if !self.deliver(message).await {
                        return;
                    }
                }
                received = self.packet_rx.recv() => match received {
                    Some(packet) => self.route_packet(packet).await,
                    None => {
                        self.drain().await;
                        return;
                    }
                },
            }
        }
    }

    /// Routes one packet to its flow's message, creating the message on first
    /// sight of the FlowKey. At most one message exists per key: a new one is
    /// only spawned when the table has no entry.
    async fn route_packet(&mut self, packet: CapturedPacket) {
        let flow = packet.flow_key();
        let handle = match self.messages.entry(flow) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!("New message for flow {flow}");
                let handle =
                    spawn_message(flow, self.settings.clone(), self.disposition_tx.clone());
                entry.insert(handle)
            }
        };
        if !handle.append(packet).await {
            // The message reported its disposition between lookup and append;
            // the flow is finished and the packet is dropped.
            debug!("Late packet for finished flow {flow} dropped");
        }
    }

    async fn deliver(&mut self, message: TcpMessage) -> bool {
        self.messages.remove(&message.flow);
        debug!("Message finished: {message}");
        if self.delivery_tx.send(message).await.is_err() {
            debug!("Delivery queue closed, stopping dispatcher");
            return false;
        }
        true
    }

    /// The capture side is gone; wait out the remaining messages so nothing
    /// already buffered is lost. Each one completes or expires on its own.
    async fn drain(&mut self) {
        while !self.messages.is_empty() {
            let Some(message) = self.disposition_rx.recv().await else {
                return;
            };
            if !self.deliver(message).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmirror_core::app_packet::MessageStatus;
    use std::time::{Duration, SystemTime};
    use tokio::sync::mpsc;

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

    fn start(
        expiry: Duration,
    ) -> (mpsc::Sender<CapturedPacket>, mpsc::Receiver<TcpMessage>) {
        let (packet_tx, packet_rx) = mpsc::channel(16);
        let (delivery_tx, delivery_rx) = mpsc::channel(16);
        let settings = MessageSettings::new(expiry, 1024 * 1024, 16);
        tokio::spawn(Dispatcher::new(packet_rx, delivery_tx, settings).run());
        (packet_tx, delivery_rx)
    }

    #[tokio::test]
    async fn assembles_split_request_until_push() {
        let (packet_tx, mut delivery_rx) = start(Duration::from_secs(30));

        packet_tx.send(packet(42, b"GET /", false)).await.unwrap();
        packet_tx
            .send(packet(42, b" HTTP/1.1\r\n\r\n", true))
            .await
            .unwrap();

        let message = delivery_rx.recv().await.unwrap();
        assert_eq!(message.flow, FlowKey(42));
        assert_eq!(message.payload, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(message.status, MessageStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_flow_expires_and_is_still_delivered() {
        let (packet_tx, mut delivery_rx) = start(Duration::from_millis(500));

        packet_tx.send(packet(7, b"half a request", false)).await.unwrap();

        let message = delivery_rx.recv().await.unwrap();
        assert_eq!(message.flow, FlowKey(7));
        assert_eq!(message.payload, b"half a request");
        assert_eq!(message.status, MessageStatus::Expired);
    }

    #[tokio::test]
    async fn per_flow_append_order_matches_processing_order() {
        let (packet_tx, mut delivery_rx) = start(Duration::from_secs(30));

        for chunk in [&b"a"[..], b"b", b"c"] {
            packet_tx.send(packet(9, chunk, false)).await.unwrap();
        }
        packet_tx.send(packet(9, b"d", true)).await.unwrap();

        let message = delivery_rx.recv().await.unwrap();
        assert_eq!(message.payload, b"abcd");
        assert_eq!(message.packets, 4);
    }

    #[tokio::test]
    async fn flows_are_kept_apart() {
        let (packet_tx, mut delivery_rx) = start(Duration::from_secs(30));

        packet_tx.send(packet(1, b"first flow", false)).await.unwrap();
        packet_tx.send(packet(2, b"second flow", true)).await.unwrap();
        packet_tx.send(packet(1, b" continues", true)).await.unwrap();

        let mut by_flow = HashMap::new();
        for _ in 0..2 {
            let message = delivery_rx.recv().await.unwrap();
            by_flow.insert(message.flow, message);
        }
        assert_eq!(by_flow[&FlowKey(1)].payload, b"first flow continues");
        assert_eq!(by_flow[&FlowKey(2)].payload, b"second flow");
    }

    #[tokio::test]
    async fn evicted_flow_starts_a_fresh_message() {
        let (packet_tx, mut delivery_rx) = start(Duration::from_secs(30));

        packet_tx.send(packet(42, b"first", true)).await.unwrap();
        let first = delivery_rx.recv().await.unwrap();
        assert_eq!(first.payload, b"first");

        packet_tx.send(packet(42, b"second", true)).await.unwrap();
        let second = delivery_rx.recv().await.unwrap();
        assert_eq!(second.payload, b"second");
        assert_eq!(second.packets, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_capture_drains_in_flight_messages() {
        let (packet_tx, mut delivery_rx) = start(Duration::from_millis(500));

        packet_tx.send(packet(11, b"buffered", false)).await.unwrap();
        drop(packet_tx);

        let message = delivery_rx.recv().await.unwrap();
        assert_eq!(message.flow, FlowKey(11));
        assert_eq!(message.status, MessageStatus::Expired);
        assert!(delivery_rx.recv().await.is_none());
    }
}
