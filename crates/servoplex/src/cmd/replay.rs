//! Offline frame recovery over captured panel bytes.
//!
//! Unlike the live worker, which runs one scan pass per wake-up, replay
//! repeats passes until the buffer stops changing, so every recoverable
//! frame in the capture is reported.

use std::sync::Arc;

use servoplex::frame::{
    dispatch, scan_frames, Command, Frame, RingBuffer, DEFAULT_RING_CAPACITY,
};
use servoplex::panel::PanelBindings;

use crate::cmd::{RemoteArgs, ReplayArgs};
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_replay, EventOutput, OutputFormat, ReplayOutput};

pub fn run(args: ReplayArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = parse_hex(&args.hex)?;
    let (frames, resyncs, leftover) = recover_frames(&bytes);

    let failures = if args.execute {
        let panel = PanelBindings::new(Arc::new(remote.multiplexer()?));
        for frame in &frames {
            dispatch(*frame, &panel);
        }
        panel.counts().1
    } else {
        0
    };

    let replay = ReplayOutput {
        events: frames.iter().map(|frame| event_of(*frame)).collect(),
        bytes: bytes.len(),
        resyncs,
        leftover,
    };
    print_replay(&replay, format);
    Ok(if failures > 0 { FAILURE } else { SUCCESS })
}

/// Returns the recovered frames, resync count and bytes left unconsumed.
fn recover_frames(bytes: &[u8]) -> (Vec<Frame>, u64, usize) {
    let mut ring = RingBuffer::with_capacity(DEFAULT_RING_CAPACITY);
    let mut frames = Vec::new();
    let mut resyncs = 0u64;

    for &byte in bytes {
        if ring.is_full() {
            drain(&mut ring, &mut frames, &mut resyncs);
        }
        // Draining leaves fewer than one frame's worth buffered.
        let _ = ring.write(byte);
    }
    drain(&mut ring, &mut frames, &mut resyncs);

    (frames, resyncs, ring.len())
}

fn drain(ring: &mut RingBuffer, frames: &mut Vec<Frame>, resyncs: &mut u64) {
    loop {
        let outcome = scan_frames(ring, |frame| frames.push(frame));
        if outcome.resynced {
            *resyncs += 1;
        } else if outcome.frames == 0 {
            break;
        }
    }
}

fn event_of(frame: Frame) -> EventOutput {
    match Command::try_from(frame) {
        Ok(Command::Button { id, pressed }) => EventOutput::Button { id, pressed },
        Ok(Command::Slider { channel, value }) => EventOutput::Slider { channel, value },
        Err(_) => EventOutput::Unknown {
            command_type: frame.command_type,
        },
    }
}

/// Parse `55 01 07`, `550107`, `0x55,0x01` and mixtures of these.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut bytes = Vec::new();
    for token in input.split(|c: char| c.is_whitespace() || c == ',' || c == ':') {
        if token.is_empty() {
            continue;
        }
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(CliError::usage(format!("invalid hex token {token:?}")));
        }
        for pair in digits.as_bytes().chunks(2) {
            let text = std::str::from_utf8(pair)
                .map_err(|_| CliError::usage(format!("invalid hex token {token:?}")))?;
            let byte = u8::from_str_radix(text, 16)
                .map_err(|_| CliError::usage(format!("invalid hex token {token:?}")))?;
            bytes.push(byte);
        }
    }
    if bytes.is_empty() {
        return Err(CliError::usage("no bytes given"));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_common_spellings() {
        assert_eq!(parse_hex("55 01 07").unwrap(), vec![0x55, 0x01, 0x07]);
        assert_eq!(parse_hex("550107").unwrap(), vec![0x55, 0x01, 0x07]);
        assert_eq!(parse_hex("0x55,0XFF").unwrap(), vec![0x55, 0xFF]);
    }

    #[test]
    fn parse_hex_rejects_garbage() {
        assert!(parse_hex("5").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("  ").is_err());
        assert!(parse_hex("0x").is_err());
    }

    #[test]
    fn recovers_frames_after_noise() {
        let bytes = [
            0x00, 0x13, 0x55, 0x01, 0x07, 0x01, 0xFF, 0xFF, 0xFF, 0x55, 0x02, 0x80, 0x00, 0xFF,
            0xFF, 0xFF,
        ];
        let (frames, resyncs, leftover) = recover_frames(&bytes);
        assert_eq!(frames, vec![Frame::button(7, true), Frame::slider(0, 0x80)]);
        assert_eq!(resyncs, 2);
        assert_eq!(leftover, 0);
    }

    #[test]
    fn long_captures_are_drained_as_they_fill() {
        let frame = [0x55, 0x01, 0x04, 0x00, 0xFF, 0xFF, 0xFF];
        let bytes: Vec<u8> = frame.iter().copied().cycle().take(7 * 100).collect();
        let (frames, resyncs, leftover) = recover_frames(&bytes);
        assert_eq!(frames.len(), 100);
        assert_eq!(resyncs, 0);
        assert_eq!(leftover, 0);
    }

    #[test]
    fn partial_frame_is_left_over() {
        let (frames, _, leftover) = recover_frames(&[0x55, 0x01, 0x07]);
        assert!(frames.is_empty());
        assert_eq!(leftover, 3);
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            event_of(Frame::new(0x09, 1, 1)),
            EventOutput::Unknown { command_type: 0x09 }
        );
    }
}
