use crate::packet::{CapturedPacket, FlowKey};
use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

/// Disposition of a reassembly unit. `Building` is the only non-terminal
/// state; once a message is `Completed` or `Expired` no further transition is
/// accepted, which is what makes the disposition report exactly-once.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Building,
    Completed,
    Expired,
}

impl Display for MessageStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Building => write!(f, "building"),
            MessageStatus::Completed => write!(f, "completed"),
            MessageStatus::Expired => write!(f, "expired"),
        }
    }
}

/// One reassembled application message: every payload byte captured for one
/// FlowKey, in the order the dispatcher processed the packets.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct TcpMessage {
    pub flow: FlowKey,
    pub payload: Vec<u8>,
    pub packets: u64,
    pub status: MessageStatus,
}

impl TcpMessage {
    pub fn new(flow: FlowKey) -> Self {
        Self {
            flow,
            payload: Vec::new(),
            packets: 0,
            status: MessageStatus::Building,
        }
    }

    pub fn append(&mut self, packet: &CapturedPacket) {
        if self.is_terminal() {
            return;
        }
        self.payload.extend_from_slice(&packet.payload);
        self.packets += 1;
    }

    pub fn complete(&mut self) {
        if !self.is_terminal() {
            self.status = MessageStatus::Completed;
        }
    }

    pub fn expire(&mut self) {
        if !self.is_terminal() {
            self.status = MessageStatus::Expired;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != MessageStatus::Building
    }
}

impl Display for TcpMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Flow: {}; {} bytes in {} packets; {}",
            self.flow,
            self.payload.len(),
            self.packets,
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn packet(ack: u32, payload: &[u8]) -> CapturedPacket {
        CapturedPacket {
            src_port: 40000,
            dst_port: 80,
            flags: 0,
            seq: 0,
            ack,
            payload: payload.to_vec(),
            timestamp: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn append_preserves_order() {
        let mut message = TcpMessage::new(FlowKey(42));
        message.append(&packet(42, b"GET /"));
        message.append(&packet(42, b" HTTP/1.1\r\n\r\n"));
        assert_eq!(message.payload, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(message.packets, 2);
    }

    #[test]
    fn first_transition_wins() {
        let mut message = TcpMessage::new(FlowKey(1));
        message.complete();
        message.expire();
        assert_eq!(message.status, MessageStatus::Completed);

        let mut message = TcpMessage::new(FlowKey(2));
        message.expire();
        message.complete();
        assert_eq!(message.status, MessageStatus::Expired);
    }

    #[test]
    fn terminal_message_rejects_appends() {
        let mut message = TcpMessage::new(FlowKey(3));
        message.append(&packet(3, b"before"));
        message.expire();
        message.append(&packet(3, b"after"));
        assert_eq!(message.payload, b"before");
        assert_eq!(message.packets, 1);
    }
}
