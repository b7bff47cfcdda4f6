//! Touch-panel frame protocol and single-channel servo multiplexer.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial stream abstraction (UART devices, loopback pairs)
//! - [`frame`]: 7-byte panel frame recovery, dispatch and display commands
//! - [`servo`]: Relative-select multiplexer, speed nudging and sequencing (behind `servo` feature)
//! - [`panel`]: Panel event bindings onto the multiplexer (behind `servo` feature)

/// Re-export transport types.
pub mod transport {
    pub use servoplex_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use servoplex_frame::*;
}

/// Re-export servo types (requires `servo` feature).
#[cfg(feature = "servo")]
pub mod servo {
    pub use servoplex_servo::*;
}

#[cfg(feature = "servo")]
pub mod panel;
