use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::codec::FRAME_TAIL;
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 128;

/// Number of servo widgets on the panel page.
pub const SERVO_WIDGETS: u8 = 4;

/// Writes ASCII display commands to the panel.
///
/// Every command is terminated by the same three `0xFF` bytes that close
/// inbound frames.
pub struct DisplayWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> DisplayWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Send a raw command followed by the trailer.
    pub fn send_command(&mut self, command: &str) -> Result<()> {
        self.buf.clear();
        self.buf.reserve(command.len() + FRAME_TAIL.len());
        self.buf.put_slice(command.as_bytes());
        self.buf.put_slice(&FRAME_TAIL);
        debug!(command, "display command");
        self.write_buf()
    }

    /// `<widget>.txt="<text>"`
    pub fn set_text(&mut self, widget: &str, text: &str) -> Result<()> {
        validate_widget(widget)?;
        if text.contains('"') {
            return Err(FrameError::InvalidWidget(format!(
                "text for {widget} must not contain '\"'"
            )));
        }
        self.send_command(&format!("{widget}.txt=\"{text}\""))
    }

    /// `<widget>.val=<value>`
    pub fn set_value(&mut self, widget: &str, value: i32) -> Result<()> {
        validate_widget(widget)?;
        self.send_command(&format!("{widget}.val={value}"))
    }

    /// `click <widget>,<0|1>`
    pub fn set_button_state(&mut self, widget: &str, pressed: bool) -> Result<()> {
        validate_widget(widget)?;
        self.send_command(&format!("click {widget},{}", u8::from(pressed)))
    }

    /// Show a servo's position code on `n_servo<id>`.
    pub fn update_servo_position(&mut self, servo_id: u8, position: i32) -> Result<()> {
        let widget = servo_widget("n_servo", servo_id)?;
        self.set_value(&widget, position)
    }

    /// Show a servo's speed on `h_speed<id>`.
    pub fn update_servo_speed(&mut self, servo_id: u8, speed: i32) -> Result<()> {
        let widget = servo_widget("h_speed", servo_id)?;
        self.set_value(&widget, speed)
    }

    /// Show a status line on `t_msg`.
    pub fn show_message(&mut self, text: &str) -> Result<()> {
        self.set_text("t_msg", text)
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn write_buf(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }
}

fn validate_widget(widget: &str) -> Result<()> {
    if widget.is_empty() {
        return Err(FrameError::InvalidWidget("widget name is empty".to_string()));
    }
    if widget
        .chars()
        .any(|c| c.is_whitespace() || c == '"' || c == ',' || c.is_control())
    {
        return Err(FrameError::InvalidWidget(format!(
            "widget name {widget:?} contains a reserved character"
        )));
    }
    Ok(())
}

fn servo_widget(prefix: &str, servo_id: u8) -> Result<String> {
    if !(1..=SERVO_WIDGETS).contains(&servo_id) {
        return Err(FrameError::InvalidWidget(format!(
            "servo widget index {servo_id} outside 1..={SERVO_WIDGETS}"
        )));
    }
    Ok(format!("{prefix}{servo_id}"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    fn written(writer: DisplayWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    fn terminated(command: &str) -> Vec<u8> {
        let mut bytes = command.as_bytes().to_vec();
        bytes.extend_from_slice(&FRAME_TAIL);
        bytes
    }

    #[test]
    fn raw_command_gets_trailer() {
        let mut writer = DisplayWriter::new(Cursor::new(Vec::new()));
        writer.send_command("page 0").unwrap();
        assert_eq!(written(writer), terminated("page 0"));
    }

    #[test]
    fn text_value_and_click_formats() {
        let mut writer = DisplayWriter::new(Cursor::new(Vec::new()));
        writer.set_text("t0", "ready").unwrap();
        writer.set_value("n0", -12).unwrap();
        writer.set_button_state("b3", true).unwrap();

        let mut expected = terminated("t0.txt=\"ready\"");
        expected.extend(terminated("n0.val=-12"));
        expected.extend(terminated("click b3,1"));
        assert_eq!(written(writer), expected);
    }

    #[test]
    fn servo_helpers_address_numbered_widgets() {
        let mut writer = DisplayWriter::new(Cursor::new(Vec::new()));
        writer.update_servo_position(2, 1).unwrap();
        writer.update_servo_speed(4, 3).unwrap();
        writer.show_message("wave done").unwrap();

        let mut expected = terminated("n_servo2.val=1");
        expected.extend(terminated("h_speed4.val=3"));
        expected.extend(terminated("t_msg.txt=\"wave done\""));
        assert_eq!(written(writer), expected);
    }

    #[test]
    fn servo_helper_rejects_out_of_range_index() {
        let mut writer = DisplayWriter::new(Cursor::new(Vec::new()));
        assert!(matches!(
            writer.update_servo_position(0, 1),
            Err(FrameError::InvalidWidget(_))
        ));
        assert!(matches!(
            writer.update_servo_speed(5, 1),
            Err(FrameError::InvalidWidget(_))
        ));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn invalid_widget_names_and_quoted_text_write_nothing() {
        let mut writer = DisplayWriter::new(Cursor::new(Vec::new()));
        assert!(writer.set_value("", 1).is_err());
        assert!(writer.set_value("n 0", 1).is_err());
        assert!(writer.set_button_state("b\"0", true).is_err());
        assert!(writer.set_text("t0", "say \"hi\"").is_err());
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = DisplayWriter::new(sink);

        writer.send_command("rest").unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(writer.get_ref().data, terminated("rest"));
    }

    #[test]
    fn handles_interrupted_write() {
        let mut writer = DisplayWriter::new(InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        });
        writer.send_command("sleep=0").unwrap();
        assert_eq!(writer.into_inner().data, terminated("sleep=0"));
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = DisplayWriter::new(ZeroWriter);
        let err = writer.send_command("x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            // Short writes exercise the offset loop.
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
