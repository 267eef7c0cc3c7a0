//! Discovering and opening VE.Direct devices connected over USB.
//!
//! Victron's VE.Direct to USB interface is an FTDI FT231X, so ports are first
//! matched by USB vendor and product ID. Platforms that do not report USB
//! details fall back to the port name.

use std::time::Duration;

use log::{debug, warn};
use serialport::{SerialPortInfo, SerialPortType};
use thiserror::Error;
use tokio_serial::{DataBits, FlowControl, Parity, SerialStream, StopBits};
use vedirect::{DecoderConfig, DecoderStats};

use crate::{generic::StreamConnection, Connection, FromFrame, StreamError};

/// The USB vendor ID of the VE.Direct to USB interface (FTDI).
pub const VEDIRECT_USB_VID: u16 = 0x0403;

/// The USB product ID of the VE.Direct to USB interface (FT231X).
pub const VEDIRECT_USB_PID: u16 = 0x6015;

/// VE.Direct runs at 19200 baud, 8N1.
pub const VEDIRECT_BAUDRATE: u32 = 19200;

/// Port name prefixes tried when no port reports matching USB IDs.
pub const PORT_NAME_PREFIXES: &[&str] = &["/dev/ttyUSB", "/dev/tty.usbserial"];

/// Line and decoder settings for a [`SerialConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Timeout for a single read from the port.
    pub timeout: Duration,
    pub decoder: DecoderConfig,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: VEDIRECT_BAUDRATE,
            timeout: Duration::from_secs(1),
            decoder: DecoderConfig::default(),
        }
    }
}

fn is_vedirect_usb(port: &SerialPortInfo) -> bool {
    matches!(
        &port.port_type,
        SerialPortType::UsbPort(info)
            if info.vid == VEDIRECT_USB_VID && info.pid == VEDIRECT_USB_PID
    )
}

fn ports_by_usb_id(ports: &[SerialPortInfo]) -> Option<Vec<SerialPortInfo>> {
    debug!("Looking for VE.Direct interfaces by USB ID.");

    let matched: Vec<_> = ports.iter().filter(|port| is_vedirect_usb(port)).cloned().collect();
    (!matched.is_empty()).then_some(matched)
}

fn ports_by_name(ports: &[SerialPortInfo]) -> Option<Vec<SerialPortInfo>> {
    debug!("Looking for VE.Direct interfaces by port name.");

    let matched: Vec<_> = ports
        .iter()
        .filter(|port| {
            PORT_NAME_PREFIXES
                .iter()
                .any(|prefix| port.port_name.starts_with(prefix))
        })
        .cloned()
        .collect();
    (!matched.is_empty()).then_some(matched)
}

/// Picks the ports that look like VE.Direct interfaces.
pub fn filter_ports(ports: &[SerialPortInfo]) -> Vec<SerialPortInfo> {
    ports_by_usb_id(ports)
        .or_else(|| ports_by_name(ports))
        .unwrap_or_default()
}

/// Finds all connected VE.Direct devices.
pub fn find_devices() -> Result<Vec<SerialDevice>, SerialError> {
    let ports = tokio_serial::available_ports()?;
    let devices: Vec<_> = filter_ports(&ports)
        .into_iter()
        .map(|port_info| SerialDevice { port_info })
        .collect();

    if devices.is_empty() {
        warn!("No VE.Direct devices found among {} serial ports.", ports.len());
    }

    Ok(devices)
}

/// Finds the first connected VE.Direct device.
pub fn find_device() -> Result<SerialDevice, SerialError> {
    find_devices()?
        .into_iter()
        .next()
        .ok_or(SerialError::NoDevices)
}

#[derive(Clone, Debug)]
pub struct SerialDevice {
    port_info: SerialPortInfo,
}

impl SerialDevice {
    /// A device on a port that was not found by discovery, such as a
    /// `/dev/serial/by-id` path.
    pub fn from_port_name(port_name: impl Into<String>) -> Self {
        Self {
            port_info: SerialPortInfo {
                port_name: port_name.into(),
                port_type: SerialPortType::Unknown,
            },
        }
    }

    pub fn connect(&self, config: SerialConfig) -> Result<SerialConnection, SerialError> {
        SerialConnection::open(self.clone(), config)
    }

    pub fn port_name(&self) -> &str {
        &self.port_info.port_name
    }

    pub fn port_info(&self) -> &SerialPortInfo {
        &self.port_info
    }
}

/// An open serial connection to a VE.Direct device.
#[derive(Debug)]
pub struct SerialConnection {
    device: SerialDevice,
    stream: StreamConnection<SerialStream>,
}

impl SerialConnection {
    pub fn open(device: SerialDevice, config: SerialConfig) -> Result<Self, SerialError> {
        debug!(
            "Opening {} at {} baud",
            device.port_name(),
            config.baud_rate
        );

        let port = SerialStream::open(
            &tokio_serial::new(device.port_name(), config.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(config.timeout),
        )?;

        Ok(Self {
            device,
            stream: StreamConnection::with_config(port, config.decoder),
        })
    }

    pub fn device(&self) -> &SerialDevice {
        &self.device
    }
}

impl Connection for SerialConnection {
    type Error = SerialError;

    async fn recv<F: FromFrame>(&mut self, timeout: Duration) -> Result<F, SerialError> {
        Ok(self.stream.recv(timeout).await?)
    }

    fn stats(&self) -> &DecoderStats {
        self.stream.stats()
    }
}

#[derive(Error, Debug)]
pub enum SerialError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Serialport Error: {0}")]
    SerialportError(#[from] tokio_serial::Error),

    #[error("No VE.Direct devices found")]
    NoDevices,
}
