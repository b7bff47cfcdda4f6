//! Serial transport abstraction for the touch-panel link.
//!
//! The panel talks over a UART. This crate wraps the device in a single
//! [`SerialStream`] type so the framing layer only ever sees `Read + Write`:
//! - hardware ports opened through `serialport`
//! - in-process loopback pairs (Unix only), used for tests and offline replay
//!
//! This is the lowest layer of servoplex. Everything that touches bytes on
//! the wire builds on top of it.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, open, SerialConfig, DEFAULT_BAUD_RATE};
pub use traits::SerialStream;
