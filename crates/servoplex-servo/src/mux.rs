use parking_lot::{FairMutex, FairMutexGuard};
use tracing::{debug, error};

use crate::config::{pause, ServoConfig};
use crate::error::{Result, ServoError};
use crate::link::{ActionCode, Direction, RemoteCommand, RemoteLink};
use crate::speed::SpeedLevel;

/// Selection state mirrored from the remote endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MuxState {
    active_id: usize,
}

/// Serializes every actuator operation over one relative-select channel.
///
/// The remote can only address its currently selected actuator and only
/// moves the selection one step at a time, so the multiplexer tracks the
/// selection and walks it to each target. One FIFO-fair lock covers the
/// tracked selection and every remote call; waiters are served in arrival
/// order.
///
/// Nothing is persisted: a fresh multiplexer assumes the remote has
/// actuator 0 selected.
pub struct Multiplexer<L> {
    link: L,
    config: ServoConfig,
    state: FairMutex<MuxState>,
}

impl<L: RemoteLink> Multiplexer<L> {
    pub fn new(link: L, config: ServoConfig) -> Self {
        Self {
            link,
            config,
            state: FairMutex::new(MuxState::default()),
        }
    }

    /// Start from a known remote selection instead of actuator 0.
    pub fn with_active_id(link: L, config: ServoConfig, active_id: usize) -> Result<Self> {
        if active_id >= config.actuator_count {
            return Err(ServoError::InvalidActuator {
                id: active_id,
                count: config.actuator_count,
            });
        }
        Ok(Self {
            link,
            config,
            state: FairMutex::new(MuxState { active_id }),
        })
    }

    /// Acquire exclusive use of the channel.
    ///
    /// Blocks behind earlier callers. Hold the guard across every step that
    /// must not interleave with other command sources.
    pub fn lock(&self) -> MuxGuard<'_, L> {
        MuxGuard {
            link: &self.link,
            config: &self.config,
            state: self.state.lock(),
        }
    }

    /// Select `target` on the remote (see [`MuxGuard::select`]).
    pub fn select(&self, target: usize) -> Result<()> {
        self.lock().select(target)
    }

    /// Actuator this process last drove the remote to.
    ///
    /// Waits for any operation in flight.
    pub fn active_id(&self) -> usize {
        self.state.lock().active_id
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }
}

/// Exclusive access to the multiplexer for a multi-step critical section.
pub struct MuxGuard<'a, L> {
    link: &'a L,
    config: &'a ServoConfig,
    state: FairMutexGuard<'a, MuxState>,
}

impl<L: RemoteLink> MuxGuard<'_, L> {
    pub fn active_id(&self) -> usize {
        self.state.active_id
    }

    pub fn config(&self) -> &ServoConfig {
        self.config
    }

    /// Reject ids outside `[0, actuator_count)`.
    pub fn check_actuator(&self, id: usize) -> Result<()> {
        if id >= self.config.actuator_count {
            return Err(ServoError::InvalidActuator {
                id,
                count: self.config.actuator_count,
            });
        }
        Ok(())
    }

    /// Walk the remote selection to `target`.
    ///
    /// Issues `|target - active|` relative steps, each followed by the
    /// settle delay. The tracked id advances after every acknowledged step,
    /// so a failure leaves it on the last confirmed actuator. Whether the
    /// remote moved on the failed request is unknown.
    pub fn select(&mut self, target: usize) -> Result<()> {
        self.check_actuator(target)?;

        let active = self.state.active_id;
        if target == active {
            return Ok(());
        }

        let (direction, steps) = if target > active {
            (Direction::Next, target - active)
        } else {
            (Direction::Previous, active - target)
        };
        debug!(from = active, to = target, steps, ?direction, "switching actuator");

        for _ in 0..steps {
            if let Err(err) = self.link.send(RemoteCommand::select(direction)) {
                error!(
                    active = self.state.active_id,
                    target,
                    error = %err,
                    "relative select failed"
                );
                return Err(err.into());
            }
            self.state.active_id = match direction {
                Direction::Next => self.state.active_id + 1,
                Direction::Previous => self.state.active_id - 1,
            };
            pause(self.config.settle_delay);
        }

        Ok(())
    }

    /// Approximate `level` on the selected actuator with speed nudges.
    ///
    /// Each nudge is followed by the nudge delay. The first failed nudge
    /// aborts the rest.
    pub fn apply_speed(&mut self, level: SpeedLevel) -> Result<()> {
        let (action, count) = level.nudge_plan();
        debug!(
            actuator = self.state.active_id,
            %level,
            ?action,
            count,
            "applying speed level"
        );
        for _ in 0..count {
            self.send_action(action)?;
            pause(self.config.nudge_delay);
        }
        Ok(())
    }

    /// Send one absolute action to the selected actuator.
    pub fn send_action(&mut self, action: ActionCode) -> Result<()> {
        self.link.send(RemoteCommand::action(action)).map_err(|err| {
            error!(
                actuator = self.state.active_id,
                ?action,
                error = %err,
                "remote action failed"
            );
            ServoError::from(err)
        })
    }
}
