use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{millis, pause, serialize_millis};
use crate::error::{Result, ServoError};
use crate::link::{ActionCode, RemoteLink};
use crate::mux::{Multiplexer, MuxGuard};
use crate::speed::SpeedLevel;

/// Target position for an absolute move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Middle = 0,
    Max = 1,
    Min = 2,
}

impl Position {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Middle),
            1 => Ok(Self::Max),
            2 => Ok(Self::Min),
            other => Err(ServoError::InvalidArgument(format!(
                "position {other} outside 0..=2"
            ))),
        }
    }

    /// Remote action that moves the selected actuator here.
    pub fn action(self) -> ActionCode {
        match self {
            Self::Middle => ActionCode::MoveMiddle,
            Self::Max => ActionCode::MoveMax,
            Self::Min => ActionCode::MoveMin,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Middle => "middle",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Position {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code);
        }
        match s.to_ascii_lowercase().as_str() {
            "middle" | "mid" => Ok(Self::Middle),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            _ => Err(ServoError::InvalidArgument(format!(
                "unknown position {s:?} (expected 0-2, middle, max, min)"
            ))),
        }
    }
}

/// One step of a sequence: move `actuator` to `position`, then wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Action {
    pub actuator: usize,
    pub position: Position,
    /// `None` keeps the actuator's current speed.
    pub speed: Option<SpeedLevel>,
    #[serde(rename = "post_delay_ms", serialize_with = "serialize_millis")]
    pub post_delay: Duration,
}

impl Action {
    pub fn new(actuator: usize, position: Position) -> Self {
        Self {
            actuator,
            position,
            speed: None,
            post_delay: Duration::ZERO,
        }
    }

    pub fn with_speed(self, speed: Option<SpeedLevel>) -> Self {
        Self { speed, ..self }
    }

    pub fn with_delay(self, post_delay: Duration) -> Self {
        Self { post_delay, ..self }
    }
}

impl<L: RemoteLink> MuxGuard<'_, L> {
    /// Run `actions` in order under this guard.
    ///
    /// Every actuator id is checked before the first remote call. The first
    /// failing action aborts the run with [`ServoError::ActionFailed`];
    /// actions already performed are not undone.
    pub fn execute(&mut self, actions: &[Action]) -> Result<()> {
        if actions.is_empty() {
            return Err(ServoError::InvalidArgument(
                "action sequence is empty".to_string(),
            ));
        }
        for action in actions {
            self.check_actuator(action.actuator)?;
        }

        info!(actions = actions.len(), "executing action sequence");
        for (index, action) in actions.iter().enumerate() {
            debug!(
                index,
                actuator = action.actuator,
                position = %action.position,
                speed = ?action.speed,
                delay_ms = millis(action.post_delay),
                "action"
            );
            self.perform(action.actuator, action.position, action.speed)
                .map_err(|err| step_failed(index, err))?;
            pause(action.post_delay);
        }
        info!(actions = actions.len(), "action sequence completed");
        Ok(())
    }

    /// Select `id`, optionally apply a speed level, then move it.
    pub fn move_to(
        &mut self,
        id: usize,
        position: Position,
        speed: Option<SpeedLevel>,
    ) -> Result<()> {
        self.check_actuator(id)?;
        info!(actuator = id, %position, ?speed, "move");
        self.perform(id, position, speed)
    }

    /// Move every actuator to middle, 0 first, with the move gap after each.
    pub fn all_middle(&mut self, speed: Option<SpeedLevel>) -> Result<()> {
        info!(?speed, "all actuators to middle");
        let gap = self.config().move_gap;
        self.for_each_actuator(gap, |guard, id| {
            guard.perform(id, Position::Middle, speed)
        })
    }

    /// Stop every actuator.
    pub fn all_stop(&mut self) -> Result<()> {
        info!("stopping all actuators");
        let gap = self.config().command_gap;
        self.for_each_actuator(gap, |guard, id| {
            guard.select(id)?;
            guard.send_action(ActionCode::Stop)
        })
    }

    /// Enable or release holding torque on every actuator.
    pub fn all_torque(&mut self, enable: bool) -> Result<()> {
        info!(enable, "setting torque on all actuators");
        let action = if enable {
            ActionCode::TorqueOn
        } else {
            ActionCode::TorqueOff
        };
        let gap = self.config().command_gap;
        self.for_each_actuator(gap, |guard, id| {
            guard.select(id)?;
            guard.send_action(action)
        })
    }

    /// Apply one speed level to every actuator.
    pub fn all_set_speed(&mut self, level: SpeedLevel) -> Result<()> {
        info!(%level, "setting speed on all actuators");
        let gap = self.config().command_gap;
        self.for_each_actuator(gap, |guard, id| {
            guard.select(id)?;
            guard.apply_speed(level)
        })
    }

    /// Move several actuators, pairing `ids[i]` with `positions[i]`.
    ///
    /// `speeds`, when given, must be the same length; `None` entries keep
    /// the current speed.
    pub fn multi_move(
        &mut self,
        ids: &[usize],
        positions: &[Position],
        speeds: Option<&[Option<SpeedLevel>]>,
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(ServoError::InvalidArgument("no actuators given".to_string()));
        }
        if ids.len() != positions.len() {
            return Err(ServoError::InvalidArgument(format!(
                "{} actuators but {} positions",
                ids.len(),
                positions.len()
            )));
        }
        if let Some(speeds) = speeds {
            if speeds.len() != ids.len() {
                return Err(ServoError::InvalidArgument(format!(
                    "{} actuators but {} speeds",
                    ids.len(),
                    speeds.len()
                )));
            }
        }
        for &id in ids {
            self.check_actuator(id)?;
        }

        info!(count = ids.len(), "multi-actuator move");
        let gap = self.config().move_gap;
        for (index, (&id, &position)) in ids.iter().zip(positions).enumerate() {
            let speed = speeds.and_then(|s| s[index]);
            self.perform(id, position, speed)
                .map_err(|err| step_failed(index, err))?;
            pause(gap);
        }
        Ok(())
    }

    /// Multi-move with one speed shared by every actuator.
    pub fn group_move(
        &mut self,
        ids: &[usize],
        positions: &[Position],
        speed: Option<SpeedLevel>,
    ) -> Result<()> {
        let speeds = vec![speed; ids.len()];
        self.multi_move(ids, positions, Some(&speeds))
    }

    /// Switch the selected actuator between position and continuous mode.
    pub fn set_mode(&mut self, motor: bool) -> Result<()> {
        let action = if motor {
            ActionCode::ModeMotor
        } else {
            ActionCode::ModeServo
        };
        info!(actuator = self.active_id(), motor, "setting mode");
        self.send_action(action)
    }

    /// Store the selected actuator's current position as its middle.
    pub fn set_middle(&mut self) -> Result<()> {
        info!(actuator = self.active_id(), "setting middle");
        self.send_action(ActionCode::SetMiddle)
    }

    fn perform(
        &mut self,
        id: usize,
        position: Position,
        speed: Option<SpeedLevel>,
    ) -> Result<()> {
        self.select(id)?;
        if let Some(level) = speed {
            self.apply_speed(level)?;
        }
        self.send_action(position.action())
    }

    fn for_each_actuator(
        &mut self,
        gap: Duration,
        mut step: impl FnMut(&mut Self, usize) -> Result<()>,
    ) -> Result<()> {
        for id in 0..self.config().actuator_count {
            step(self, id).map_err(|err| step_failed(id, err))?;
            pause(gap);
        }
        Ok(())
    }
}

fn step_failed(index: usize, err: ServoError) -> ServoError {
    warn!(index, error = %err, "operation aborted");
    ServoError::at_step(index, err)
}

/// Single-call conveniences; each holds the lock for the whole operation.
impl<L: RemoteLink> Multiplexer<L> {
    pub fn execute(&self, actions: &[Action]) -> Result<()> {
        self.lock().execute(actions)
    }

    pub fn move_to(
        &self,
        id: usize,
        position: Position,
        speed: Option<SpeedLevel>,
    ) -> Result<()> {
        self.lock().move_to(id, position, speed)
    }

    pub fn all_middle(&self, speed: Option<SpeedLevel>) -> Result<()> {
        self.lock().all_middle(speed)
    }

    pub fn all_stop(&self) -> Result<()> {
        self.lock().all_stop()
    }

    pub fn all_torque(&self, enable: bool) -> Result<()> {
        self.lock().all_torque(enable)
    }

    pub fn all_set_speed(&self, level: SpeedLevel) -> Result<()> {
        self.lock().all_set_speed(level)
    }

    pub fn multi_move(
        &self,
        ids: &[usize],
        positions: &[Position],
        speeds: Option<&[Option<SpeedLevel>]>,
    ) -> Result<()> {
        self.lock().multi_move(ids, positions, speeds)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ServoConfig;
    use crate::link::{Direction, RemoteCommand};
    use crate::testing::RecordingLink;

    const NEXT: RemoteCommand = RemoteCommand {
        kind: 0,
        id: 1,
        a: 0,
        b: 0,
    };
    const PREV: RemoteCommand = RemoteCommand {
        kind: 0,
        id: -1,
        a: 0,
        b: 0,
    };

    fn act(code: ActionCode) -> RemoteCommand {
        RemoteCommand::action(code)
    }

    fn setup() -> (Arc<RecordingLink>, Multiplexer<Arc<RecordingLink>>) {
        let link = Arc::new(RecordingLink::default());
        let mux = Multiplexer::new(Arc::clone(&link), ServoConfig::default().without_delays());
        (link, mux)
    }

    #[test]
    fn position_parsing() {
        assert_eq!("2".parse::<Position>().unwrap(), Position::Min);
        assert_eq!("Max".parse::<Position>().unwrap(), Position::Max);
        assert_eq!("mid".parse::<Position>().unwrap(), Position::Middle);
        assert!("3".parse::<Position>().is_err());
        assert!("left".parse::<Position>().is_err());
    }

    #[test]
    fn move_to_selects_nudges_then_moves() {
        let (link, mux) = setup();

        mux.move_to(2, Position::Max, Some(SpeedLevel::Fast)).unwrap();

        let mut expected = vec![NEXT, NEXT];
        expected.extend(vec![act(ActionCode::SpeedUp); 5]);
        expected.push(act(ActionCode::MoveMax));
        assert_eq!(link.commands(), expected);
        assert_eq!(mux.active_id(), 2);
    }

    #[test]
    fn execute_keeps_order_and_skips_speed_when_none() {
        let (link, mux) = setup();

        mux.execute(&[
            Action::new(1, Position::Min),
            Action::new(0, Position::Middle),
        ])
        .unwrap();

        assert_eq!(
            link.commands(),
            vec![NEXT, act(ActionCode::MoveMin), PREV, act(ActionCode::MoveMiddle)]
        );
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let (link, mux) = setup();
        assert!(matches!(
            mux.execute(&[]),
            Err(ServoError::InvalidArgument(_))
        ));
        assert_eq!(link.attempts(), 0);
    }

    #[test]
    fn invalid_actuator_anywhere_rejects_before_any_call() {
        let (link, mux) = setup();
        let err = mux
            .execute(&[Action::new(1, Position::Max), Action::new(7, Position::Min)])
            .unwrap_err();
        assert!(matches!(err, ServoError::InvalidActuator { id: 7, .. }));
        assert_eq!(link.attempts(), 0);
    }

    #[test]
    fn first_failure_reports_action_index_and_stops() {
        // Attempts: [0] select 0->1, [1] MoveMax, [2] select 1->2 fails.
        let link = Arc::new(RecordingLink::failing_at(2));
        let mux = Multiplexer::new(Arc::clone(&link), ServoConfig::default().without_delays());

        let err = mux
            .execute(&[
                Action::new(1, Position::Max),
                Action::new(2, Position::Max),
                Action::new(3, Position::Max),
            ])
            .unwrap_err();

        match err {
            ServoError::ActionFailed { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(*source, ServoError::Link(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(link.attempts(), 3);
        assert_eq!(mux.active_id(), 1);
    }

    #[test]
    fn post_delay_is_honoured() {
        let (_link, mux) = setup();
        let started = std::time::Instant::now();
        mux.execute(&[Action::new(0, Position::Max).with_delay(Duration::from_millis(30))])
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn all_middle_visits_every_actuator_in_order() {
        let (link, mux) = setup();

        mux.all_middle(None).unwrap();

        assert_eq!(
            link.commands(),
            vec![
                act(ActionCode::MoveMiddle),
                NEXT,
                act(ActionCode::MoveMiddle),
                NEXT,
                act(ActionCode::MoveMiddle),
                NEXT,
                act(ActionCode::MoveMiddle),
            ]
        );
        assert_eq!(mux.active_id(), 3);
    }

    #[test]
    fn all_stop_and_torque_send_one_action_each() {
        let (link, mux) = setup();

        mux.all_stop().unwrap();
        let stops = link
            .commands()
            .into_iter()
            .filter(|c| *c == act(ActionCode::Stop))
            .count();
        assert_eq!(stops, 4);

        link.clear();
        mux.all_torque(false).unwrap();
        let cmds = link.commands();
        // Walks back from 3 to 0 first.
        assert_eq!(cmds[0], PREV);
        assert_eq!(
            cmds.iter().filter(|c| **c == act(ActionCode::TorqueOff)).count(),
            4
        );
    }

    #[test]
    fn all_set_speed_nudges_each_actuator() {
        let (link, mux) = setup();
        mux.all_set_speed(SpeedLevel::Max).unwrap();
        let ups = link
            .commands()
            .into_iter()
            .filter(|c| *c == act(ActionCode::SpeedUp))
            .count();
        assert_eq!(ups, 40);
    }

    #[test]
    fn all_middle_failure_reports_actuator_index() {
        // [0] MoveMiddle on 0, [1] select 0->1, [2] MoveMiddle on 1 fails.
        let link = Arc::new(RecordingLink::failing_at(2));
        let mux = Multiplexer::new(Arc::clone(&link), ServoConfig::default().without_delays());
        let err = mux.all_middle(None).unwrap_err();
        assert!(matches!(err, ServoError::ActionFailed { index: 1, .. }));
    }

    #[test]
    fn multi_move_validates_lengths() {
        let (link, mux) = setup();
        assert!(matches!(
            mux.multi_move(&[0, 1], &[Position::Max], None),
            Err(ServoError::InvalidArgument(_))
        ));
        assert!(matches!(
            mux.multi_move(&[0], &[Position::Max], Some(&[None, None][..])),
            Err(ServoError::InvalidArgument(_))
        ));
        assert!(matches!(
            mux.multi_move(&[], &[], None),
            Err(ServoError::InvalidArgument(_))
        ));
        assert_eq!(link.attempts(), 0);
    }

    #[test]
    fn multi_move_pairs_ids_positions_and_speeds() {
        let (link, mux) = setup();

        mux.multi_move(
            &[2, 0],
            &[Position::Min, Position::Max],
            Some(&[None, Some(SpeedLevel::Medium)][..]),
        )
        .unwrap();

        let mut expected = vec![NEXT, NEXT, act(ActionCode::MoveMin), PREV, PREV];
        expected.extend(vec![act(ActionCode::SpeedDown); 5]);
        expected.push(act(ActionCode::MoveMax));
        assert_eq!(link.commands(), expected);
    }

    #[test]
    fn group_move_shares_speed() {
        let (link, mux) = setup();
        mux.lock()
            .group_move(&[0, 1], &[Position::Max, Position::Max], Some(SpeedLevel::Slow))
            .unwrap();
        let downs = link
            .commands()
            .into_iter()
            .filter(|c| *c == act(ActionCode::SpeedDown))
            .count();
        assert_eq!(downs, 20);
    }

    #[test]
    fn mode_and_middle_act_on_selected_actuator() {
        let (link, mux) = setup();
        {
            let mut guard = mux.lock();
            guard.select(1).unwrap();
            guard.set_mode(true).unwrap();
            guard.set_mode(false).unwrap();
            guard.set_middle().unwrap();
        }
        assert_eq!(
            link.commands(),
            vec![
                RemoteCommand::select(Direction::Next),
                act(ActionCode::ModeMotor),
                act(ActionCode::ModeServo),
                act(ActionCode::SetMiddle),
            ]
        );
    }

    #[test]
    fn action_serializes_delay_in_millis() {
        let action = Action::new(3, Position::Min)
            .with_speed(Some(SpeedLevel::Fast))
            .with_delay(Duration::from_millis(200));
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "actuator": 3,
                "position": "min",
                "speed": "fast",
                "post_delay_ms": 200
            })
        );
    }
}
