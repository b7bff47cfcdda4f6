use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{pause, serialize_millis};
use crate::error::{Result, ServoError};
use crate::link::RemoteLink;
use crate::mux::{Multiplexer, MuxGuard};
use crate::sequencer::{Action, Position};
use crate::speed::SpeedLevel;

/// Pause after each wave action.
pub const WAVE_STEP_DELAY: Duration = Duration::from_millis(200);

/// Pause after each step-sequence action.
pub const STEP_SEQUENCE_DELAY: Duration = Duration::from_millis(500);

/// Pause after each self-test move.
pub const SELF_TEST_STEP_DELAY: Duration = Duration::from_millis(1000);

/// Hold after the self-test's opening all-middle.
pub const SELF_TEST_SETTLE: Duration = Duration::from_millis(2000);

/// Speed used by presets when none is given.
pub const DEFAULT_PRESET_SPEED: SpeedLevel = SpeedLevel::Medium;

/// Named multi-actuator routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum Preset {
    /// Every actuator to middle at medium speed.
    Home,
    /// Ascending sweep to max, descending sweep to min, `cycles` times, then
    /// every actuator back to middle.
    Wave {
        cycles: usize,
        speed: Option<SpeedLevel>,
    },
    /// All to max in order, all to min, all to middle.
    StepSequence { speed: Option<SpeedLevel> },
    /// Bring-up check: all to middle, each actuator through max, min and
    /// middle at fast speed, two fast waves, then home.
    SelfTest,
}

/// One unit of a preset plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    /// Run these actions as one sequence.
    Sequence { actions: Vec<Action> },
    /// Move every actuator to middle.
    AllMiddle { speed: Option<SpeedLevel> },
    /// Hold the lock without sending anything.
    Pause {
        #[serde(rename = "ms", serialize_with = "serialize_millis")]
        duration: Duration,
    },
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Wave { .. } => "wave",
            Self::StepSequence { .. } => "step_sequence",
            Self::SelfTest => "self_test",
        }
    }

    /// Steps this preset runs for `actuator_count` actuators.
    pub fn plan(&self, actuator_count: usize) -> Vec<PlanStep> {
        match *self {
            Self::Home => vec![PlanStep::AllMiddle {
                speed: Some(DEFAULT_PRESET_SPEED),
            }],
            Self::Wave { cycles, speed } => {
                let speed = speed.unwrap_or(DEFAULT_PRESET_SPEED);
                let mut steps: Vec<PlanStep> = (0..cycles)
                    .map(|_| PlanStep::Sequence {
                        actions: wave_cycle(actuator_count, speed),
                    })
                    .collect();
                steps.push(PlanStep::AllMiddle { speed: Some(speed) });
                steps
            }
            Self::StepSequence { speed } => vec![PlanStep::Sequence {
                actions: step_sequence(actuator_count, speed.unwrap_or(DEFAULT_PRESET_SPEED)),
            }],
            Self::SelfTest => {
                let mut steps = vec![
                    PlanStep::AllMiddle {
                        speed: Some(SpeedLevel::Medium),
                    },
                    PlanStep::Pause {
                        duration: SELF_TEST_SETTLE,
                    },
                    PlanStep::Sequence {
                        actions: self_test_sweep(actuator_count),
                    },
                ];
                let wave = Self::Wave {
                    cycles: 2,
                    speed: Some(SpeedLevel::Fast),
                };
                steps.extend(wave.plan(actuator_count));
                steps.extend(Self::Home.plan(actuator_count));
                steps
            }
        }
    }

    /// Run the plan under an already-held guard.
    ///
    /// A failure is reported as [`ServoError::ActionFailed`] carrying the
    /// plan step index, wrapping the step's own error.
    pub fn run<L: RemoteLink>(&self, guard: &mut MuxGuard<'_, L>) -> Result<()> {
        let plan = self.plan(guard.config().actuator_count);
        info!(preset = self.name(), steps = plan.len(), "running preset");
        run_plan(guard, &plan)?;
        info!(preset = self.name(), "preset completed");
        Ok(())
    }
}

fn run_plan<L: RemoteLink>(guard: &mut MuxGuard<'_, L>, plan: &[PlanStep]) -> Result<()> {
    for (index, step) in plan.iter().enumerate() {
        let outcome = match step {
            PlanStep::Sequence { actions } => guard.execute(actions),
            PlanStep::AllMiddle { speed } => guard.all_middle(*speed),
            PlanStep::Pause { duration } => {
                pause(*duration);
                Ok(())
            }
        };
        outcome.map_err(|err| {
            warn!(step = index, error = %err, "preset aborted");
            ServoError::at_step(index, err)
        })?;
    }
    Ok(())
}

/// One wave: ascending to max, then descending to min.
pub fn wave_cycle(actuator_count: usize, speed: SpeedLevel) -> Vec<Action> {
    let up = (0..actuator_count).map(|id| (id, Position::Max));
    let down = (0..actuator_count).rev().map(|id| (id, Position::Min));
    up.chain(down)
        .map(|(id, position)| {
            Action::new(id, position)
                .with_speed(Some(speed))
                .with_delay(WAVE_STEP_DELAY)
        })
        .collect()
}

/// All to max, all to min, all to middle, each pass in ascending order.
pub fn step_sequence(actuator_count: usize, speed: SpeedLevel) -> Vec<Action> {
    [Position::Max, Position::Min, Position::Middle]
        .into_iter()
        .flat_map(|position| (0..actuator_count).map(move |id| (id, position)))
        .map(|(id, position)| {
            Action::new(id, position)
                .with_speed(Some(speed))
                .with_delay(STEP_SEQUENCE_DELAY)
        })
        .collect()
}

/// Each actuator in turn to max, min and middle at fast speed.
pub fn self_test_sweep(actuator_count: usize) -> Vec<Action> {
    (0..actuator_count)
        .flat_map(|id| {
            [Position::Max, Position::Min, Position::Middle]
                .into_iter()
                .map(move |position| (id, position))
        })
        .map(|(id, position)| {
            Action::new(id, position)
                .with_speed(Some(SpeedLevel::Fast))
                .with_delay(SELF_TEST_STEP_DELAY)
        })
        .collect()
}

impl<L: RemoteLink> Multiplexer<L> {
    /// Run `preset` under one lock acquisition.
    pub fn run_preset(&self, preset: Preset) -> Result<()> {
        preset.run(&mut self.lock())
    }
}
