use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// Default UART speed for the touch panel.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial device settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed in baud. Default: 115200.
    pub baud_rate: u32,
    /// Read timeout. Readers treat an expired timeout as "no data yet".
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Open a serial device (8N1, no flow control).
pub fn open(path: &str, config: &SerialConfig) -> Result<SerialStream> {
    if config.baud_rate == 0 {
        return Err(TransportError::Open {
            path: path.to_string(),
            source: serialport::Error::new(
                serialport::ErrorKind::InvalidInput,
                "baud rate must be greater than zero",
            ),
        });
    }

    let port = serialport::new(path, config.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|source| TransportError::Open {
            path: path.to_string(),
            source,
        })?;

    info!(path, baud = config.baud_rate, "opened serial device");
    Ok(SerialStream::from_port(port))
}

/// Names of serial devices visible on this host.
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(TransportError::Configure)?;
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
