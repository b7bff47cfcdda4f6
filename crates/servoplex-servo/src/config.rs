use std::time::Duration;

/// Number of actuators behind the bridge.
pub const DEFAULT_ACTUATOR_COUNT: usize = 4;

/// Timing and sizing for multiplexer operations.
///
/// All delays are real sleeps taken while the multiplexer lock is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServoConfig {
    /// Logical actuators, addressed `0..actuator_count`. Default: 4.
    pub actuator_count: usize,
    /// Pause after each relative-select step. Default: 50ms.
    pub settle_delay: Duration,
    /// Pause after each speed nudge. Default: 10ms.
    pub nudge_delay: Duration,
    /// Gap between actuators in all-middle and multi-move. Default: 100ms.
    pub move_gap: Duration,
    /// Gap between actuators in all-stop, all-torque and all-speed. Default: 50ms.
    pub command_gap: Duration,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            actuator_count: DEFAULT_ACTUATOR_COUNT,
            settle_delay: Duration::from_millis(50),
            nudge_delay: Duration::from_millis(10),
            move_gap: Duration::from_millis(100),
            command_gap: Duration::from_millis(50),
        }
    }
}

impl ServoConfig {
    /// Same sizing with every fixed delay set to zero.
    ///
    /// Per-action post delays are still honoured.
    pub fn without_delays(self) -> Self {
        Self {
            settle_delay: Duration::ZERO,
            nudge_delay: Duration::ZERO,
            move_gap: Duration::ZERO,
            command_gap: Duration::ZERO,
            ..self
        }
    }
}

pub(crate) fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn serialize_millis<S: serde::Serializer>(
    delay: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(millis(*delay))
}
