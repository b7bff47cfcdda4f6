use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// A connected serial stream: implements Read + Write.
///
/// This is the fundamental I/O type handed to the framing layer.
/// Hardware ports are `serialport` devices; on Unix a loopback pair can stand
/// in for the panel so the whole receive path runs without hardware.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    Port(Box<dyn serialport::SerialPort>),
    #[cfg(unix)]
    Local(std::os::unix::net::UnixStream),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.read(buf),
            #[cfg(unix)]
            SerialStreamInner::Local(stream) => stream.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.write(buf),
            #[cfg(unix)]
            SerialStreamInner::Local(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port.flush(),
            #[cfg(unix)]
            SerialStreamInner::Local(stream) => stream.flush(),
        }
    }
}

impl SerialStream {
    /// Wrap an already-opened serial device.
    pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: SerialStreamInner::Port(port),
        }
    }

    /// Create two connected in-process streams.
    ///
    /// Bytes written to one end are read from the other, which is enough to
    /// play the part of the panel in tests and replay tooling.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((
            Self {
                inner: SerialStreamInner::Local(left),
            },
            Self {
                inner: SerialStreamInner::Local(right),
            },
        ))
    }

    /// Set read timeout on the underlying stream.
    ///
    /// Serial devices always carry a timeout; `None` maps to a long one so a
    /// reader thread still gets a chance to observe shutdown.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            SerialStreamInner::Port(port) => port
                .set_timeout(timeout.unwrap_or(Duration::from_secs(3600)))
                .map_err(TransportError::Configure),
            #[cfg(unix)]
            SerialStreamInner::Local(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (a second handle to the same device).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            SerialStreamInner::Port(port) => {
                let cloned = port.try_clone().map_err(TransportError::Configure)?;
                Ok(Self::from_port(cloned))
            }
            #[cfg(unix)]
            SerialStreamInner::Local(stream) => Ok(Self {
                inner: SerialStreamInner::Local(stream.try_clone()?),
            }),
        }
    }

    /// Device name for diagnostics.
    pub fn name(&self) -> String {
        match &self.inner {
            SerialStreamInner::Port(port) => port.name().unwrap_or_else(|| "serial".to_string()),
            #[cfg(unix)]
            SerialStreamInner::Local(_) => "loopback".to_string(),
        }
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            SerialStreamInner::Port(_) => f
                .debug_struct("SerialStream")
                .field("type", &"serial")
                .field("name", &self.name())
                .finish(),
            #[cfg(unix)]
            SerialStreamInner::Local(_) => f
                .debug_struct("SerialStream")
                .field("type", &"loopback")
                .finish(),
        }
    }
}
