use tracing::debug;

use crate::codec::{
    Frame, FRAME_HEADER, FRAME_LEN, FRAME_TAIL, OFFSET_ARG_A, OFFSET_ARG_B, OFFSET_COMMAND,
    OFFSET_TAIL,
};
use crate::ring::RingBuffer;

/// Result of one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Frames recovered from the front of the buffer.
    pub frames: usize,
    /// True when the pass ended by discarding one byte to resynchronize.
    pub resynced: bool,
}

/// Recover complete frames from the front of `ring`.
///
/// While at least one frame's worth of bytes is buffered: if the header and
/// the three trailer bytes sit at their offsets, the payload is handed to
/// `on_frame` and the frame is consumed. Otherwise exactly one byte is
/// dropped and the pass stops; the next pass runs when more data arrives.
///
/// Only the four marker positions are checked. A payload that happens to
/// line up with valid markers is indistinguishable from a real frame.
pub fn scan_frames(ring: &mut RingBuffer, mut on_frame: impl FnMut(Frame)) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    while ring.len() >= FRAME_LEN {
        if !markers_match(ring) {
            debug!(
                byte = ?ring.read_at(0),
                buffered = ring.len(),
                "frame markers mismatch; dropping one byte"
            );
            ring.delete_front(1);
            outcome.resynced = true;
            break;
        }

        // Offsets are < FRAME_LEN <= len, so every read_at below is Some.
        let frame = Frame::new(
            ring.read_at(OFFSET_COMMAND).unwrap_or_default(),
            ring.read_at(OFFSET_ARG_A).unwrap_or_default(),
            ring.read_at(OFFSET_ARG_B).unwrap_or_default(),
        );
        ring.delete_front(FRAME_LEN);
        outcome.frames += 1;
        on_frame(frame);
    }

    outcome
}

fn markers_match(ring: &RingBuffer) -> bool {
    ring.read_at(0) == Some(FRAME_HEADER)
        && FRAME_TAIL
            .iter()
            .enumerate()
            .all(|(i, &tail)| ring.read_at(OFFSET_TAIL + i) == Some(tail))
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;

    fn ring_with(bytes: &[u8]) -> RingBuffer {
        let mut ring = RingBuffer::with_capacity(512);
        for &b in bytes {
            ring.write(b).unwrap();
        }
        ring
    }

    fn scan_all(ring: &mut RingBuffer) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            let outcome = scan_frames(ring, |f| frames.push(f));
            if !outcome.resynced {
                break;
            }
        }
        frames
    }

    #[test]
    fn single_button_frame() {
        let mut ring = ring_with(&[0x55, 0x01, 0x07, 0x01, 0xFF, 0xFF, 0xFF]);
        let mut frames = Vec::new();
        let outcome = scan_frames(&mut ring, |f| frames.push(f));

        assert_eq!(outcome, ScanOutcome { frames: 1, resynced: false });
        assert_eq!(frames, vec![Frame::new(0x01, 0x07, 0x01)]);
        assert!(ring.is_empty());
    }

    #[test]
    fn back_to_back_frames_in_one_pass() {
        let mut wire = BytesMut::new();
        encode_frame(&Frame::button(1, true), &mut wire);
        encode_frame(&Frame::slider(0, 99), &mut wire);
        encode_frame(&Frame::button(1, false), &mut wire);
        let mut ring = ring_with(&wire);

        let mut frames = Vec::new();
        let outcome = scan_frames(&mut ring, |f| frames.push(f));

        assert_eq!(outcome.frames, 3);
        assert_eq!(frames[1], Frame::slider(0, 99));
        assert!(ring.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_more_data() {
        let mut ring = ring_with(&[0x55, 0x01, 0x07, 0x01, 0xFF, 0xFF]);
        let outcome = scan_frames(&mut ring, |_| panic!("no frame expected"));
        assert_eq!(outcome, ScanOutcome::default());
        assert_eq!(ring.len(), 6);

        ring.write(0xFF).unwrap();
        let mut frames = Vec::new();
        scan_frames(&mut ring, |f| frames.push(f));
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn mismatch_drops_exactly_one_byte_and_stops() {
        let mut wire = vec![0x00, 0x13];
        let mut frame = BytesMut::new();
        encode_frame(&Frame::button(2, true), &mut frame);
        wire.extend_from_slice(&frame);
        let mut ring = ring_with(&wire);

        let outcome = scan_frames(&mut ring, |_| panic!("frame must wait for next pass"));
        assert_eq!(outcome, ScanOutcome { frames: 0, resynced: true });
        assert_eq!(ring.len(), wire.len() - 1);
    }

    #[test]
    fn noise_around_one_frame_yields_exactly_one_command() {
        let noise_before = [0x12, 0x00, 0xFF, 0x55, 0x44, 0x10, 0xFE, 0x01, 0x02];
        let noise_after = [0x33, 0x44, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];

        let mut wire = noise_before.to_vec();
        let mut frame = BytesMut::new();
        encode_frame(&Frame::button(7, true), &mut frame);
        wire.extend_from_slice(&frame);
        wire.extend_from_slice(&noise_after);
        let mut ring = ring_with(&wire);

        let frames = scan_all(&mut ring);

        assert_eq!(frames, vec![Frame::button(7, true)]);
        assert!(ring.len() < FRAME_LEN);
    }

    #[test]
    fn aligned_markers_around_garbage_payload_pass() {
        // Inherited weakness: only marker positions are checked.
        let mut ring = ring_with(&[0x55, 0xEE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        let mut frames = Vec::new();
        scan_frames(&mut ring, |f| frames.push(f));
        assert_eq!(frames, vec![Frame::new(0xEE, 0xFF, 0xFF)]);
    }

    #[test]
    fn wrong_trailer_is_noise() {
        let mut ring = ring_with(&[0x55, 0x01, 0x07, 0x01, 0xFF, 0xFE, 0xFF]);
        let outcome = scan_frames(&mut ring, |_| panic!("not a frame"));
        assert!(outcome.resynced);
        assert_eq!(ring.len(), 6);
    }
}
