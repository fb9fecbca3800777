//! micro:bit serial link
//!
//! A background thread reads the port, splits telemetry lines and publishes
//! the newest record. The connected flag is owned by a guard inside the
//! reader, so it drops back to false however the loop ends.

use super::telemetry::{Telemetry, TelemetryParser};
use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// micro:bit DAPLink interface (ARM mbed)
const MICROBIT_VID: u16 = 0x0D28;
const MICROBIT_PID: u16 = 0x0204;
/// Short read timeout so the reader notices shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Open a port by name, or auto-detect a micro:bit by USB id.
pub fn open_port(port: Option<&str>, baud: u32) -> Result<Box<dyn serialport::SerialPort>> {
    if let Some(path) = port {
        return Ok(serialport::new(path, baud).timeout(READ_TIMEOUT).open()?);
    }

    for info in serialport::available_ports()? {
        if let serialport::SerialPortType::UsbPort(usb) = &info.port_type {
            if usb.vid == MICROBIT_VID && usb.pid == MICROBIT_PID {
                tracing::info!(port = %info.port_name, "found micro:bit");
                return Ok(serialport::new(&info.port_name, baud)
                    .timeout(READ_TIMEOUT)
                    .open()?);
            }
        }
    }
    Err(Error::NoDevice)
}

/// Describe every serial port the OS reports
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                let tag = if usb.vid == MICROBIT_VID && usb.pid == MICROBIT_PID {
                    "  (micro:bit)"
                } else {
                    ""
                };
                format!(
                    "{}  usb {:04x}:{:04x} {}{}",
                    info.port_name,
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default(),
                    tag
                )
            }
            serialport::SerialPortType::BluetoothPort => format!("{}  bluetooth", info.port_name),
            serialport::SerialPortType::PciPort => format!("{}  pci", info.port_name),
            serialport::SerialPortType::Unknown => info.port_name,
        })
        .collect())
}

struct Shared {
    connected: AtomicBool,
    running: AtomicBool,
    latest: Mailbox<Telemetry>,
}

/// Clears the connected flag when the reader exits, on every path
struct ConnectionGuard<'a>(&'a AtomicBool);

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

pub struct SerialLink {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl SerialLink {
    pub fn connect(port: Option<&str>, baud: u32) -> Result<Self> {
        let port = open_port(port, baud)?;
        let name = port.name().unwrap_or_else(|| "serial".to_string());
        tracing::info!(port = %name, baud, "serial connected");
        Ok(Self::spawn(port, name))
    }

    /// Start the reader over any byte source
    fn spawn<R: Read + Send + 'static>(reader: R, name: String) -> Self {
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            running: AtomicBool::new(true),
            latest: Mailbox::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || read_loop(reader, &thread_shared));
        Self { shared, handle: Some(handle), name }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Newest record since the last call
    pub fn take(&self) -> Option<Telemetry> {
        self.shared.latest.take()
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_loop<R: Read>(mut reader: R, shared: &Shared) {
    let _guard = ConnectionGuard(&shared.connected);
    let mut parser = TelemetryParser::new();
    let mut buf = [0u8; 256];

    while shared.running.load(Ordering::Relaxed) {
        match reader.read(&mut buf) {
            Ok(0) => {
                tracing::info!("serial stream closed");
                break;
            }
            Ok(n) => {
                if let Some(last) = parser.feed(&buf[..n]).pop() {
                    shared.latest.publish(last);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::warn!("serial read failed: {e}");
                break;
            }
        }
    }
}
