use std::path::PathBuf;
use std::time::Duration;

/// Snap length the original deployment captured with.
pub const DEFAULT_SNAPLEN: i32 = 4026;
/// Capacity of the capture, disposition and delivery queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
/// Inactivity window after which an unfinished message expires.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(2);
/// Size threshold completing a message even without a boundary packet.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub device: String,
    pub port: u16,
    pub snaplen: i32,
    pub expiry: Duration,
    pub max_message_size: usize,
    pub queue_capacity: usize,
}

impl CaptureConfig {
    pub fn new(device: &str, port: u16) -> Self {
        Self {
            device: device.to_owned(),
            port,
            snaplen: DEFAULT_SNAPLEN,
            expiry: DEFAULT_EXPIRY,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// BPF program installed on the capture handle.
    pub fn filter(&self) -> String {
        format!("tcp dst port {}", self.port)
    }
}

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Endpoint socket paths are this prefix suffixed with the pool index.
    pub socket_prefix: PathBuf,
    pub pool_size: usize,
    pub multiplier: u64,
    /// Total sends allowed over the process lifetime.
    pub ceiling: u64,
    /// Accept backlog each external worker listens with.
    pub backlog: u32,
    /// Thread budget each external worker runs with.
    pub threads: usize,
    pub send_timeout: Duration,
    pub fail_fast: bool,
    pub forward_expired: bool,
}

impl ReplayConfig {
    pub fn endpoint_path(&self, index: usize) -> PathBuf {
        let mut path = self.socket_prefix.as_os_str().to_owned();
        path.push(index.to_string());
        PathBuf::from(path)
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            socket_prefix: PathBuf::from("/tmp/netmirror-replay.sock"),
            pool_size: 1,
            multiplier: 1,
            ceiling: u64::MAX,
            backlog: 100,
            threads: 1,
            send_timeout: Duration::from_secs(5),
            fail_fast: false,
            forward_expired: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_configured_port() {
        let config = CaptureConfig::new("lo", 8080);
        assert_eq!(config.filter(), "tcp dst port 8080");
    }

    #[test]
    fn endpoint_paths_are_indexed() {
        let config = ReplayConfig {
            socket_prefix: PathBuf::from("/run/replay.sock"),
            ..ReplayConfig::default()
        };
        assert_eq!(config.endpoint_path(0), PathBuf::from("/run/replay.sock0"));
        assert_eq!(config.endpoint_path(2), PathBuf::from("/run/replay.sock2"));
    }
}
