//! Touch-panel bindings: route panel events to actuator operations.
//!
//! | Event | Effect |
//! |---|---|
//! | button 1–4 pressed | actuator `n - 1` to middle, at the slider speed for that actuator (medium by default) |
//! | button 10 pressed | home preset |
//! | button 11 pressed | one wave cycle at medium speed |
//! | slider channel `c` | remember `value / 64 + 1` as the speed for actuator `c`, echo the raw value on `h_speed{c+1}` |
//!
//! Releases are ignored. Results are echoed on the panel's `t_msg` widget
//! when a display writer is attached.

use std::io::Write;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use servoplex_frame::{DisplayWriter, HmiHandler};
use servoplex_servo::{Multiplexer, Position, Preset, RemoteLink, ServoError, SpeedLevel};
use tracing::{error, info, warn};

/// First and last actuator buttons (inclusive).
pub const BUTTON_ACTUATOR_FIRST: u8 = 1;
pub const BUTTON_ACTUATOR_LAST: u8 = 4;
/// Button that runs the home preset.
pub const BUTTON_HOME: u8 = 10;
/// Button that runs one wave cycle.
pub const BUTTON_WAVE: u8 = 11;

const SLIDER_CHANNELS: usize = 2;
const SPEED_UNSET: u8 = 0;

/// Display sink shared with the bindings.
pub type PanelDisplay = DisplayWriter<Box<dyn Write + Send>>;

/// [`HmiHandler`] that drives a [`Multiplexer`].
///
/// Operations run on the frame worker thread and block further dispatch
/// until they finish.
pub struct PanelBindings<L> {
    mux: Arc<Multiplexer<L>>,
    display: Option<Mutex<PanelDisplay>>,
    slider_speeds: [AtomicU8; SLIDER_CHANNELS],
    operations: AtomicU64,
    failures: AtomicU64,
}

impl<L: RemoteLink> PanelBindings<L> {
    pub fn new(mux: Arc<Multiplexer<L>>) -> Self {
        Self {
            mux,
            display: None,
            slider_speeds: [AtomicU8::new(SPEED_UNSET), AtomicU8::new(SPEED_UNSET)],
            operations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Echo results and slider values on the panel.
    pub fn with_display(mut self, display: PanelDisplay) -> Self {
        self.display = Some(Mutex::new(display));
        self
    }

    /// Speed a button press on `actuator` will use.
    pub fn speed_for(&self, actuator: usize) -> SpeedLevel {
        self.slider_speeds
            .get(actuator)
            .and_then(|slot| SpeedLevel::from_code(slot.load(Ordering::Relaxed)).ok())
            .flatten()
            .unwrap_or(SpeedLevel::Medium)
    }

    /// Operations started and operations that failed.
    pub fn counts(&self) -> (u64, u64) {
        (
            self.operations.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
        )
    }

    fn run(&self, label: &str, op: impl FnOnce(&Multiplexer<L>) -> Result<(), ServoError>) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        match op(&self.mux) {
            Ok(()) => {
                info!(operation = label, "panel operation completed");
                self.show(label);
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(operation = label, error = %err, "panel operation failed");
                self.show(&format!("{label} failed"));
            }
        }
    }

    fn show(&self, text: &str) {
        if let Some(display) = &self.display {
            if let Err(err) = display.lock().show_message(text) {
                warn!(error = %err, "display update failed");
            }
        }
    }
}

impl<L: RemoteLink> HmiHandler for PanelBindings<L> {
    fn on_button(&self, id: u8, pressed: bool) {
        info!(id, pressed, "panel button");
        if !pressed {
            return;
        }

        match id {
            BUTTON_ACTUATOR_FIRST..=BUTTON_ACTUATOR_LAST => {
                let actuator = usize::from(id - BUTTON_ACTUATOR_FIRST);
                let speed = self.speed_for(actuator);
                self.run(&format!("Servo {id} -> Mid"), |mux| {
                    mux.move_to(actuator, Position::Middle, Some(speed))
                });
            }
            BUTTON_HOME => self.run("All Servos Home", |mux| mux.run_preset(Preset::Home)),
            BUTTON_WAVE => self.run("Wave Action", |mux| {
                mux.run_preset(Preset::Wave {
                    cycles: 1,
                    speed: None,
                })
            }),
            other => warn!(id = other, "unbound panel button"),
        }
    }

    fn on_slider(&self, channel: u8, value: u8) {
        let level = SpeedLevel::from_slider(value);
        info!(channel, value, %level, "panel slider");

        let Some(slot) = self.slider_speeds.get(usize::from(channel)) else {
            warn!(channel, "unbound panel slider");
            return;
        };
        slot.store(level.code(), Ordering::Relaxed);

        if let Some(display) = &self.display {
            if let Err(err) = display
                .lock()
                .update_servo_speed(channel + 1, i32::from(value))
            {
                warn!(error = %err, "display update failed");
            }
        }
    }
}
