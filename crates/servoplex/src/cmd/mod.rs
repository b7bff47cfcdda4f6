use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use servoplex::servo::{
    parse_speed, HttpLink, LinkConfig, Multiplexer, Position, ServoConfig, ServoError,
    SpeedLevel, DEFAULT_ACTUATOR_COUNT, DEFAULT_HOST,
};
use servoplex::transport::DEFAULT_BAUD_RATE;

use crate::exit::{servo_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod display;
pub mod listen;
pub mod ports;
pub mod preset;
pub mod readback;
pub mod replay;
pub mod servo;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Move one actuator to a position.
    Move(MoveArgs),
    /// Move every actuator to middle.
    AllMid(AllMidArgs),
    /// Stop every actuator.
    AllStop,
    /// Enable or release holding torque on every actuator.
    Torque(TorqueArgs),
    /// Apply one speed level to every actuator.
    AllSpeed(AllSpeedArgs),
    /// Move several actuators in one locked pass.
    Multi(MultiArgs),
    /// Switch an actuator between position and continuous mode.
    Mode(ModeArgs),
    /// Store an actuator's current position as its middle.
    SetMiddle(SetMiddleArgs),
    /// Select an actuator, or print the assumed selection.
    Active(ActiveArgs),
    /// Home preset: every actuator to middle.
    Home(DryRunArgs),
    /// Wave preset.
    Wave(WaveArgs),
    /// Step-sequence preset.
    Seq(SeqArgs),
    /// Bring-up check: sweep each actuator, two fast waves, then home.
    SelfTest(DryRunArgs),
    /// Print the remote status report.
    Status,
    /// Print the remote actuator id listing.
    Ids,
    /// Drive actuators from touch-panel events on a serial port.
    Listen(ListenArgs),
    /// Run captured panel bytes through the frame scanner.
    Replay(ReplayArgs),
    /// Send a command to the touch-panel display.
    Display(DisplayArgs),
    /// List serial ports.
    Ports,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Move(args) => servo::run_move(args, remote, format),
        Command::AllMid(args) => servo::run_all_mid(args, remote, format),
        Command::AllStop => servo::run_all_stop(remote, format),
        Command::Torque(args) => servo::run_torque(args, remote, format),
        Command::AllSpeed(args) => servo::run_all_speed(args, remote, format),
        Command::Multi(args) => servo::run_multi(args, remote, format),
        Command::Mode(args) => servo::run_mode(args, remote, format),
        Command::SetMiddle(args) => servo::run_set_middle(args, remote, format),
        Command::Active(args) => servo::run_active(args, remote, format),
        Command::Home(args) => preset::run_home(args, remote, format),
        Command::Wave(args) => preset::run_wave(args, remote, format),
        Command::Seq(args) => preset::run_seq(args, remote, format),
        Command::SelfTest(args) => preset::run_self_test(args, remote, format),
        Command::Status => readback::run_status(remote, format),
        Command::Ids => readback::run_ids(remote, format),
        Command::Listen(args) => listen::run(args, remote, format),
        Command::Replay(args) => replay::run(args, remote, format),
        Command::Display(args) => display::run(args),
        Command::Ports => ports::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// Remote endpoint and multiplexer settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Servo bridge host or host:port.
    #[arg(long, env = "SERVOPLEX_SERVER", default_value = DEFAULT_HOST, global = true)]
    pub server: String,
    /// Per-request timeout (e.g. 3s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "3s", global = true)]
    pub link_timeout: String,
    /// Actuators behind the bridge.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_ACTUATOR_COUNT, global = true)]
    pub actuators: usize,
    /// Actuator the bridge currently has selected.
    #[arg(long, value_name = "ID", env = "SERVOPLEX_ASSUME_ACTIVE", global = true)]
    pub assume_active: Option<usize>,
}

impl RemoteArgs {
    pub fn link_config(&self) -> CliResult<LinkConfig> {
        Ok(LinkConfig {
            host: self.server.clone(),
            timeout: parse_timeout(&self.link_timeout)?,
        })
    }

    pub fn servo_config(&self) -> CliResult<ServoConfig> {
        if self.actuators == 0 {
            return Err(CliError::usage("--actuators must be greater than zero"));
        }
        Ok(ServoConfig {
            actuator_count: self.actuators,
            ..ServoConfig::default()
        })
    }

    pub fn http_link(&self) -> CliResult<HttpLink> {
        Ok(HttpLink::new(self.link_config()?))
    }

    pub fn multiplexer(&self) -> CliResult<Multiplexer<HttpLink>> {
        let link = self.http_link()?;
        let config = self.servo_config()?;
        match self.assume_active {
            Some(id) => Multiplexer::with_active_id(link, config, id)
                .map_err(|err| servo_error("--assume-active", err)),
            None => Ok(Multiplexer::new(link, config)),
        }
    }
}

/// Speed argument: `0..=4` or a level name. `0`/`keep` keeps the current speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedArg(pub Option<SpeedLevel>);

impl FromStr for SpeedArg {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_speed(s).map(Self)
    }
}

fn speed_of(arg: Option<SpeedArg>) -> Option<SpeedLevel> {
    arg.and_then(|s| s.0)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Servo,
    Motor,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Actuator id (0-based).
    pub id: usize,
    /// Target position: 0|1|2 or middle|max|min.
    pub position: Position,
    /// Speed: 0-4 or slow|medium|fast|max. Omit to keep the current speed.
    pub speed: Option<SpeedArg>,
}

#[derive(Args, Debug)]
pub struct AllMidArgs {
    /// Speed applied to each actuator before moving.
    pub speed: Option<SpeedArg>,
}

#[derive(Args, Debug)]
pub struct TorqueArgs {
    pub state: Switch,
}

#[derive(Args, Debug)]
pub struct AllSpeedArgs {
    /// Speed level: 1-4 or slow|medium|fast|max.
    pub speed: SpeedLevel,
}

#[derive(Args, Debug)]
pub struct MultiArgs {
    /// Comma-separated actuator ids (e.g. 0,2,3).
    pub ids: String,
    /// Comma-separated positions, one per id (e.g. max,min,0).
    pub positions: String,
    /// Comma-separated speeds, one per id.
    #[arg(long)]
    pub speeds: Option<String>,
}

#[derive(Args, Debug)]
pub struct ModeArgs {
    pub id: usize,
    pub mode: Mode,
}

#[derive(Args, Debug)]
pub struct SetMiddleArgs {
    pub id: usize,
}

#[derive(Args, Debug)]
pub struct ActiveArgs {
    /// Actuator to select. Omit to print the assumed selection.
    pub id: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DryRunArgs {
    /// Print the planned steps without contacting the bridge.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct WaveArgs {
    /// Number of wave cycles.
    pub cycles: usize,
    pub speed: Option<SpeedArg>,
    /// Print the planned steps without contacting the bridge.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct SeqArgs {
    pub speed: Option<SpeedArg>,
    /// Print the planned steps without contacting the bridge.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device the panel is attached to.
    pub port: String,
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Exit after dispatching N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Captured bytes as hex (whitespace, commas and 0x prefixes allowed).
    #[arg(long)]
    pub hex: String,
    /// Route recovered events to the panel bindings against the bridge.
    #[arg(long)]
    pub execute: bool,
}

#[derive(Args, Debug)]
pub struct DisplayArgs {
    /// Serial device the panel is attached to.
    pub port: String,
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(subcommand)]
    pub action: DisplayAction,
}

#[derive(Subcommand, Debug)]
pub enum DisplayAction {
    /// Set a text widget.
    Text { widget: String, text: String },
    /// Set a numeric widget.
    Value {
        widget: String,
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
    /// Press or release a button widget.
    Button { widget: String, state: Switch },
    /// Show a status message.
    Message { text: String },
    /// Send a raw display command (the trailer is appended).
    Raw { command: String },
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_units() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_timeout_invalid() {
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("bad").is_err());
        assert!(parse_timeout("").is_err());
    }

    #[test]
    fn speed_arg_keeps_on_zero() {
        assert_eq!("0".parse::<SpeedArg>().unwrap(), SpeedArg(None));
        assert_eq!(
            "fast".parse::<SpeedArg>().unwrap(),
            SpeedArg(Some(SpeedLevel::Fast))
        );
        assert!("7".parse::<SpeedArg>().is_err());
    }

    #[test]
    fn zero_actuators_is_usage_error() {
        let remote = RemoteArgs {
            server: DEFAULT_HOST.to_string(),
            link_timeout: "3s".to_string(),
            actuators: 0,
            assume_active: None,
        };
        assert_eq!(remote.servo_config().unwrap_err().code, USAGE);
    }
}
