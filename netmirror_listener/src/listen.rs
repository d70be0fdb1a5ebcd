use crate::dispatcher::Dispatcher;
use crate::error::ListenerError;
use crate::message::MessageSettings;
use crate::sniffer::Sniffer;
use crate::source::PacketSource;
use netmirror_core::app_packet::TcpMessage;
use netmirror_core::capture::{PacketCapture, PacketCaptureGeneric};
use netmirror_core::config::CaptureConfig;
use pcap::{Activated, Active, Offline, State};
use tokio::sync::mpsc;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

/// Facade over the whole reassembly pipeline. Construction opens the capture
/// handle, so fatal startup conditions (unknown device, filter failure)
/// surface here before any task runs. Afterwards the pipeline runs until the
/// process ends or an offline capture is exhausted.
pub struct Listener {
    delivery_rx: Receiver<TcpMessage>,
    sniffer_task: JoinHandle<Result<(), ListenerError>>,
    dispatcher_task: JoinHandle<()>,
}

impl Listener {
    pub fn start(config: &CaptureConfig) -> Result<Self, ListenerError> {
        let filter = config.filter();
        let capture = PacketCaptureGeneric::<Active>::open_device_capture(
            &config.device,
            Some(&filter),
            config.snaplen,
        )?;
        Self::wire(capture, config)
    }

    /// Offline variant replaying a recorded capture file through the same
    /// pipeline.
    pub fn from_file(path: &str, config: &CaptureConfig) -> Result<Self, ListenerError> {
        let filter = config.filter();
        let capture = PacketCaptureGeneric::<Offline>::open_file_capture(path, Some(&filter))?;
        Self::wire(capture, config)
    }

    fn wire<T>(
        capture: impl PacketCapture<T>,
        config: &CaptureConfig,
    ) -> Result<Self, ListenerError>
    where
        T: State + Activated + 'static,
    {
        let source = PacketSource::new(capture)?;
        let (packet_tx, packet_rx) = mpsc::channel(config.queue_capacity);
        let (delivery_tx, delivery_rx) = mpsc::channel(config.queue_capacity);

        let sniffer = Sniffer::new(config.port, packet_tx);
        let sniffer_task = tokio::task::spawn_blocking(move || sniffer.run(source));

        let settings =
            MessageSettings::new(config.expiry, config.max_message_size, config.queue_capacity);
        let dispatcher = Dispatcher::new(packet_rx, delivery_tx, settings);
        let dispatcher_task = tokio::spawn(dispatcher.run());

        Ok(Self {
            delivery_rx,
            sniffer_task,
            dispatcher_task,
        })
    }

    /// Next finished message, completed or expired; callers never see partial
    /// state. `None` once the pipeline has shut down and drained.
    pub async fn receive(&mut self) -> Option<TcpMessage> {
        self.delivery_rx.recv().await
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.sniffer_task.abort();
        self.dispatcher_task.abort();
    }
}
