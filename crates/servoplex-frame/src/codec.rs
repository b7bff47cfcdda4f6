use bytes::{BufMut, BytesMut};

use crate::error::FrameError;

/// Total frame length: header (1) + payload (3) + trailer (3) = 7 bytes.
pub const FRAME_LEN: usize = 7;

/// Header byte that opens every panel frame.
pub const FRAME_HEADER: u8 = 0x55;

/// Trailer that closes inbound frames and outbound display commands.
pub const FRAME_TAIL: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Default ring buffer capacity in bytes.
pub const DEFAULT_RING_CAPACITY: usize = 500;

/// Payload offsets inside a frame.
pub(crate) const OFFSET_COMMAND: usize = 1;
pub(crate) const OFFSET_ARG_A: usize = 2;
pub(crate) const OFFSET_ARG_B: usize = 3;
pub(crate) const OFFSET_TAIL: usize = 4;

/// Raw payload of a frame whose markers validated.
///
/// The command type is not checked here; see [`Command::try_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Command type byte (offset 1).
    pub command_type: u8,
    /// First argument (offset 2): button id or slider value.
    pub arg_a: u8,
    /// Second argument (offset 3): pressed flag for buttons.
    pub arg_b: u8,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command_type: u8, arg_a: u8, arg_b: u8) -> Self {
        Self {
            command_type,
            arg_a,
            arg_b,
        }
    }

    /// Button event frame.
    pub fn button(id: u8, pressed: bool) -> Self {
        Self::new(CommandKind::Button as u8, id, u8::from(pressed))
    }

    /// Slider event frame for channel 0 or 1.
    pub fn slider(channel: u8, value: u8) -> Self {
        let kind = if channel == 0 {
            CommandKind::SliderChannel0
        } else {
            CommandKind::SliderChannel1
        };
        Self::new(kind as u8, value, 0)
    }
}

/// Closed set of command types the panel emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    Button = 0x01,
    SliderChannel0 = 0x02,
    SliderChannel1 = 0x03,
}

impl CommandKind {
    /// Map a wire byte to a command kind.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Button),
            0x02 => Some(Self::SliderChannel0),
            0x03 => Some(Self::SliderChannel1),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::SliderChannel0 => "slider0",
            Self::SliderChannel1 => "slider1",
        }
    }
}

/// A decoded panel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// A button changed state.
    Button { id: u8, pressed: bool },
    /// A slider moved. `channel` is 0 or 1.
    Slider { channel: u8, value: u8 },
}

impl Command {
    /// The wire kind this command was decoded from.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Button { .. } => CommandKind::Button,
            Self::Slider { channel: 0, .. } => CommandKind::SliderChannel0,
            Self::Slider { .. } => CommandKind::SliderChannel1,
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = FrameError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        match CommandKind::from_byte(frame.command_type) {
            Some(CommandKind::Button) => Ok(Self::Button {
                id: frame.arg_a,
                pressed: frame.arg_b == 1,
            }),
            Some(CommandKind::SliderChannel0) => Ok(Self::Slider {
                channel: 0,
                value: frame.arg_a,
            }),
            Some(CommandKind::SliderChannel1) => Ok(Self::Slider {
                channel: 1,
                value: frame.arg_a,
            }),
            None => Err(FrameError::UnknownCommand(frame.command_type)),
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────┬───────┬───────┬────────────────┐
/// │ Header │ Command  │ Arg A │ Arg B │ Trailer        │
/// │ 0x55   │ type     │       │       │ 0xFF 0xFF 0xFF │
/// └────────┴──────────┴───────┴───────┴────────────────┘
/// ```
///
/// The host never sends frames in this format; encoding exists so tests and
/// replay tooling can synthesize panel traffic.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) {
    dst.reserve(FRAME_LEN);
    dst.put_u8(FRAME_HEADER);
    dst.put_u8(frame.command_type);
    dst.put_u8(frame.arg_a);
    dst.put_u8(frame.arg_b);
    dst.put_slice(&FRAME_TAIL);
}

/// Configuration for the receive pipeline.
#[derive(Debug, Clone)]
pub struct RxConfig {
    /// Ring buffer capacity in bytes. Default: 500.
    pub ring_capacity: usize,
    /// Pending wake-up tokens before further wake-ups coalesce. Default: 64.
    pub signal_depth: usize,
    /// Bytes pulled from the stream per read. Default: 64.
    pub read_chunk: usize,
}

impl Default for RxConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            signal_depth: 64,
            read_chunk: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_button_frame_matches_panel_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::button(7, true), &mut buf);
        assert_eq!(buf.as_ref(), &[0x55, 0x01, 0x07, 0x01, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn encode_slider_frames_pick_channel_type() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::slider(0, 200), &mut buf);
        encode_frame(&Frame::slider(1, 3), &mut buf);
        assert_eq!(buf.len(), 2 * FRAME_LEN);
        assert_eq!(buf[1], 0x02);
        assert_eq!(buf[2], 200);
        assert_eq!(buf[8], 0x03);
        assert_eq!(buf[9], 3);
    }

    #[test]
    fn decode_button_pressed_and_released() {
        let pressed = Command::try_from(Frame::new(0x01, 4, 1)).unwrap();
        assert_eq!(pressed, Command::Button { id: 4, pressed: true });

        let released = Command::try_from(Frame::new(0x01, 4, 0)).unwrap();
        assert_eq!(released, Command::Button { id: 4, pressed: false });
    }

    #[test]
    fn decode_slider_ignores_second_argument() {
        let cmd = Command::try_from(Frame::new(0x03, 128, 0xAB)).unwrap();
        assert_eq!(cmd, Command::Slider { channel: 1, value: 128 });
        assert_eq!(cmd.kind(), CommandKind::SliderChannel1);
    }

    #[test]
    fn decode_unknown_command_type() {
        let result = Command::try_from(Frame::new(0x09, 0, 0));
        assert!(matches!(result, Err(FrameError::UnknownCommand(0x09))));
    }

    #[test]
    fn command_kind_names() {
        assert_eq!(CommandKind::Button.name(), "button");
        assert_eq!(CommandKind::from_byte(0x02), Some(CommandKind::SliderChannel0));
        assert_eq!(CommandKind::from_byte(0x00), None);
    }
}
