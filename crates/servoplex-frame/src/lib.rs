//! Fixed-length frame recovery and dispatch for the touch-panel UART.
//!
//! The panel reports every touch event as a 7-byte frame:
//! - a header byte (0x55)
//! - three payload bytes: command type, argument A, argument B
//! - a 3-byte trailer (0xFF 0xFF 0xFF)
//!
//! Bytes land in a bounded ring buffer, a scanner recovers frames (dropping
//! one byte at a time on desync) and a dispatcher routes decoded commands to
//! an [`HmiHandler`]. The same trailer terminates outbound display commands.

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod ring;
pub mod rx;
pub mod scanner;
pub mod writer;

pub use codec::{
    encode_frame, Command, CommandKind, Frame, RxConfig, DEFAULT_RING_CAPACITY, FRAME_HEADER,
    FRAME_LEN, FRAME_TAIL,
};
pub use dispatch::{dispatch, HmiHandler};
pub use error::{FrameError, Result};
pub use ring::RingBuffer;
pub use rx::{FrameWorker, RxFeeder, RxHandle, RxPipeline, RxStats};
pub use scanner::{scan_frames, ScanOutcome};
pub use writer::{DisplayWriter, SERVO_WIDGETS};
