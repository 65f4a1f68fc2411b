//! USB HID transport
//!
//! The token enumerates as a 64-byte-report HID device. Host-to-device
//! writes carry a leading report-id byte of 0; inbound reports arrive bare.

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, trace};

use provkit_core::constants::{PRODUCT_ID, VENDOR_ID};
use provkit_core::{Report, REPORT_SIZE};

use crate::{error::*, Transport};

/// Descriptor of one connected token
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub path: String,
}

/// USB HID device handle
pub struct HidTransport {
    device: HidDevice,
    serial: Option<String>,
}

impl HidTransport {
    /// Open a token, optionally selecting one by serial number
    pub fn open(serial: Option<&str>) -> Result<Self> {
        let api = HidApi::new()?;

        let device = match serial {
            Some(sn) => api.open_serial(VENDOR_ID, PRODUCT_ID, sn),
            None => api.open(VENDOR_ID, PRODUCT_ID),
        }
        .map_err(|_| Error::DeviceNotFound {
            serial: serial.map(str::to_owned),
        })?;

        let resolved = device
            .get_serial_number_string()
            .ok()
            .flatten()
            .or_else(|| serial.map(str::to_owned));

        debug!(serial = ?resolved, "opened token");

        Ok(Self {
            device,
            serial: resolved,
        })
    }

    /// List all connected tokens
    pub fn enumerate() -> Result<Vec<TokenInfo>> {
        let api = HidApi::new()?;
        let tokens = api
            .device_list()
            .filter(|d| d.vendor_id() == VENDOR_ID && d.product_id() == PRODUCT_ID)
            .map(|d| TokenInfo {
                serial_number: d.serial_number().map(str::to_owned),
                manufacturer: d.manufacturer_string().map(str::to_owned),
                product: d.product_string().map(str::to_owned),
                path: d.path().to_string_lossy().into_owned(),
            })
            .collect();
        Ok(tokens)
    }
}

impl Transport for HidTransport {
    fn write(&mut self, report: &Report) -> Result<()> {
        // Leading report-id byte, always 0 on this interface
        let mut buf = [0u8; REPORT_SIZE + 1];
        buf[1..].copy_from_slice(report.as_bytes());

        let written = self.device.write(&buf)?;
        if written < buf.len() {
            return Err(Error::ShortWrite {
                written,
                expected: buf.len(),
            });
        }

        trace!(len = written, "hid tx");
        Ok(())
    }

    fn read(&mut self, timeout: Duration) -> Result<Option<Report>> {
        let mut buf = [0u8; REPORT_SIZE];
        let n = self
            .device
            .read_timeout(&mut buf, timeout.as_millis() as i32)?;

        if n == 0 {
            trace!("hid rx timeout");
            return Ok(None);
        }

        // A short inbound report keeps its zero tail from the buffer
        trace!(len = n, "hid rx");
        Ok(Some(Report::from_raw(buf)))
    }

    fn description(&self) -> String {
        match &self.serial {
            Some(sn) => format!("token {sn}"),
            None => "token (serial unknown)".to_owned(),
        }
    }
}
