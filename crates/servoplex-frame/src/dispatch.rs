use tracing::{trace, warn};

use crate::codec::{Command, Frame};

/// Receiver for decoded panel events.
///
/// Callbacks run on the frame worker thread, after the ring buffer lock has
/// been released. Long-running work (servo sequences) blocks further
/// dispatch until it returns.
pub trait HmiHandler: Send + Sync {
    /// A button changed state.
    fn on_button(&self, id: u8, pressed: bool);

    /// A slider on channel 0 or 1 moved to `value`.
    fn on_slider(&self, channel: u8, value: u8);
}

impl<H: HmiHandler + ?Sized> HmiHandler for std::sync::Arc<H> {
    fn on_button(&self, id: u8, pressed: bool) {
        (**self).on_button(id, pressed);
    }

    fn on_slider(&self, channel: u8, value: u8) {
        (**self).on_slider(channel, value);
    }
}

/// Route one frame to the matching handler callback.
///
/// Unknown command types are logged and dropped. Returns whether a callback
/// was invoked.
pub fn dispatch<H: HmiHandler + ?Sized>(frame: Frame, handler: &H) -> bool {
    match Command::try_from(frame) {
        Ok(Command::Button { id, pressed }) => {
            trace!(id, pressed, "button event");
            handler.on_button(id, pressed);
            true
        }
        Ok(Command::Slider { channel, value }) => {
            trace!(channel, value, "slider event");
            handler.on_slider(channel, value);
            true
        }
        Err(err) => {
            warn!(
                command_type = frame.command_type,
                error = %err,
                "dropping frame with unknown command type"
            );
            false
        }
    }
}
