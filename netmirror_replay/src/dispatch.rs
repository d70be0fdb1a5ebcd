//! Fan-out of finished messages to the replay worker pool.

use crate::endpoint::ReplayEndpoint;
use crate::error::{ReplayError, ReplayErrorKind};
use log::{debug, error, warn};
use netmirror_core::app_packet::{MessageStatus, TcpMessage};
use netmirror_core::config::ReplayConfig;

pub struct ReplayDispatch {
    pool: Vec<ReplayEndpoint>,
    next: usize,
    multiplier: u64,
    ceiling: u64,
    sent: u64,
    ceiling_reported: bool,
    fail_fast: bool,
    forward_expired: bool,
}

impl ReplayDispatch {
    pub fn new(config: &ReplayConfig) -> Result<Self, ReplayError> {
        if config.pool_size == 0 {
            return Err(ReplayError::new(
                ReplayErrorKind::InvalidConfig,
                "replay pool must have at least one endpoint",
            ));
        }
        if config.multiplier == 0 {
            return Err(ReplayError::new(
                ReplayErrorKind::InvalidConfig,
                "traffic multiplier must be at least 1",
            ));
        }
        let pool = (0..config.pool_size)
            .map(|i| ReplayEndpoint::new(config.endpoint_path(i), config.send_timeout))
            .collect();
        Ok(Self {
            pool,
            next: 0,
            multiplier: config.multiplier,
            ceiling: config.ceiling,
            sent: 0,
            ceiling_reported: false,
            fail_fast: config.fail_fast,
            forward_expired: config.forward_expired,
        })
    }

    /// Total copies forwarded over the process lifetime.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Emits the configured number of copies of one message, each routed to
    /// the next pool member round-robin. Once the global ceiling is reached
    /// nothing is forwarded any more, for the rest of the process lifetime.
    ///
    /// An unreachable endpoint is fatal under `fail_fast`; otherwise the
    /// copy is dropped with a warning. There is no send retry here.
    pub async fn forward(&mut self, message: &TcpMessage) -> Result<(), ReplayError> {
        if message.status == MessageStatus::Expired && !self.forward_expired {
            debug!("Skipping expired message: {message}");
            return Ok(());
        }
        for _ in 0..self.multiplier {
            if self.sent >= self.ceiling {
                if !self.ceiling_reported {
                    warn!(
                        "Packet ceiling {} reached, refusing further forwards",
                        self.ceiling
                    );
                    self.ceiling_reported = true;
                }
                return Ok(());
            }
            let index = self.next % self.pool.len();
            self.next = self.next.wrapping_add(1);
            let endpoint = &mut self.pool[index];
            match endpoint.send(message).await {
                Ok(()) => {
                    self.sent += 1;
                    debug!("Flow {} forwarded to endpoint {index}", message.flow);
                }
                Err(e) => {
                    if self.fail_fast
                        && matches!(e.error_kind, ReplayErrorKind::EndpointUnreachable)
                    {
                        error!(
                            "Replay endpoint {} unreachable, giving up: {e}",
                            endpoint.path().display()
                        );
                        return Err(e);
                    }
                    warn!(
                        "Dropping copy for endpoint {}: {e}",
                        endpoint.path().display()
                    );
                }
            }
        }
        Ok(())
    }
}
