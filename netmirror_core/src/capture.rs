use crate::error::{CoreError, CoreErrorKind};
use log::info;
use pcap::{Activated, Active, Capture, Device, Offline, State};

/// Read timeout handed to libpcap; expired timeouts are retried by the caller.
const READ_TIMEOUT_MS: i32 = 500;

pub trait PacketCapture<T>
where
    T: State + Activated,
{
    fn get_capture(self) -> Capture<T>;
    fn apply_filter(&mut self) -> Result<(), CoreError>;
}

pub struct PacketCaptureGeneric<T>
where
    T: State + Activated,
{
    pub capture: Capture<T>,
    pub filter: Option<String>,
}

impl<T> PacketCaptureGeneric<T>
where
    T: State + Activated,
{
    /// Opens a live capture on the named device. The name must match one of
    /// the enumerated devices exactly; a missing device is a startup-fatal
    /// error.
    pub fn open_device_capture(
        device_name: &str,
        filter: Option<&str>,
        snaplen: i32,
    ) -> Result<PacketCaptureGeneric<Active>, CoreError> {
        let devices = Device::list()?;
        let target = devices
            .into_iter()
            .find(|d| d.name == device_name)
            .ok_or(CoreError::new(
                CoreErrorKind::DeviceNotFound,
                &format!("capture device {device_name} not found"),
            ))?;
        let target_name = target.name.clone();
        let capture = Capture::from_device(target)?
            .promisc(true)
            .snaplen(snaplen)
            .timeout(READ_TIMEOUT_MS)
            .immediate_mode(true)
            .open()
            .map_err(CoreError::from)?;

        info!("Listening on: {:?}", target_name);

        Ok(PacketCaptureGeneric {
            capture,
            filter: filter.map(|s| s.to_string()),
        })
    }

    /// Opens a recorded capture file instead of a live device.
    pub fn open_file_capture(
        file_path: &str,
        filter: Option<&str>,
    ) -> Result<PacketCaptureGeneric<Offline>, CoreError> {
        Ok(PacketCaptureGeneric {
            capture: Capture::from_file(file_path).map_err(CoreError::from)?,
            filter: filter.map(|s| s.to_string()),
        })
    }
}

impl<T> PacketCapture<T> for PacketCaptureGeneric<T>
where
    T: State + Activated,
{
    fn get_capture(self) -> Capture<T> {
        self.capture
    }

    fn apply_filter(&mut self) -> Result<(), CoreError> {
        if let Some(filter) = &self.filter {
            self.capture
                .filter(filter, true)
                .map_err(|e| CoreError::new(CoreErrorKind::FilterError, &e.to_string()))?;
            info!("Filter applied: {filter}");
        }
        Ok(())
    }
}
