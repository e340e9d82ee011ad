// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Downstream channel to the virtual HID driver.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use touchbridge_proto::{DRIVER_PRODUCT_ID, DRIVER_VENDOR_ID};

/// Errors a transport can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// `send` was called while disconnected.
    #[error("transport is not connected")]
    NotConnected,
    /// The device node does not exist.
    #[error("device not found at {path}")]
    NotFound {
        /// Path that was probed.
        path: PathBuf,
    },
    /// Fewer bytes than one full report reached the device.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes accepted by the device.
        written: usize,
        /// Length of the report.
        expected: usize,
    },
    /// Underlying I/O failure.
    #[error("device I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Synchronous, blocking sink for encoded reports.
///
/// Reports of one batch are handed over strictly in encode order and never
/// concurrently.
pub trait Transport {
    /// Attach to the device. Idempotent.
    fn connect(&mut self) -> Result<(), TransportError>;
    /// Detach from the device. Idempotent.
    fn disconnect(&mut self);
    /// True while attached.
    fn is_connected(&self) -> bool;
    /// Deliver one complete report.
    fn send(&mut self, report: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn send(&mut self, report: &[u8]) -> Result<(), TransportError> {
        (**self).send(report)
    }
}

/// Writes reports to a HID device node (`/dev/hidraw*`, a uhid bridge, or a
/// plain file), one `write(2)` per report.
#[derive(Debug)]
pub struct HidrawTransport {
    path: PathBuf,
    device: Option<File>,
}

impl HidrawTransport {
    /// Transport for the device node at `path`. Nothing is opened until
    /// [`Transport::connect`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            device: None,
        }
    }

    /// Device node path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Vendor and product id of the HID device behind a `/dev/hidrawN` node,
    /// read from sysfs. `None` for other nodes or when sysfs has no answer.
    pub fn device_ids(&self) -> Option<(u16, u16)> {
        let name = self.path.file_name()?.to_str()?;
        if !name.starts_with("hidraw") {
            return None;
        }
        let uevent = std::fs::read_to_string(
            Path::new("/sys/class/hidraw").join(name).join("device/uevent"),
        )
        .ok()?;
        parse_hid_id(&uevent)
    }
}

/// `(vendor, product)` from the `HID_ID=bus:vendor:product` line of a HID
/// uevent. Each field is hex and zero padded to 4 or 8 digits.
pub fn parse_hid_id(uevent: &str) -> Option<(u16, u16)> {
    let id = uevent.lines().find_map(|line| line.strip_prefix("HID_ID="))?;
    let mut fields = id.trim().split(':');
    let _bus = fields.next()?;
    let vendor = u32::from_str_radix(fields.next()?, 16).ok()?;
    let product = u32::from_str_radix(fields.next()?, 16).ok()?;
    Some((u16::try_from(vendor).ok()?, u16::try_from(product).ok()?))
}

impl Transport for HidrawTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.device.is_some() {
            return Ok(());
        }
        let device = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => TransportError::NotFound {
                    path: self.path.clone(),
                },
                _ => TransportError::Io(err),
            })?;
        info!(path = %self.path.display(), "hid device opened");
        if let Some((vendor, product)) = self
            .device_ids()
            .filter(|ids| *ids != (DRIVER_VENDOR_ID, DRIVER_PRODUCT_ID))
        {
            warn!(
                path = %self.path.display(),
                vendor = format_args!("{vendor:04x}"),
                product = format_args!("{product:04x}"),
                "device is not the virtual touch driver"
            );
        }
        self.device = Some(device);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.device.take().is_some() {
            info!(path = %self.path.display(), "hid device closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    fn send(&mut self, report: &[u8]) -> Result<(), TransportError> {
        let device = self.device.as_mut().ok_or(TransportError::NotConnected)?;
        let written = device.write(report)?;
        if written != report.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: report.len(),
            });
        }
        debug!(len = written, "report written");
        Ok(())
    }
}
