pub mod error;
pub mod source;
pub mod sniffer;
pub mod message;
pub mod dispatcher;
pub mod listen;
