use servoplex::servo::{parse_speed, HttpLink, Multiplexer, Position, ServoError, SpeedLevel};

use crate::cmd::{
    speed_of, ActiveArgs, AllMidArgs, AllSpeedArgs, Mode, ModeArgs, MoveArgs, MultiArgs,
    RemoteArgs, SetMiddleArgs, Switch, TorqueArgs,
};
use crate::exit::{servo_error, CliError, CliResult, SUCCESS};
use crate::output::{print_report, OperationReport, OutputFormat};

pub fn run_move(args: MoveArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let speed = speed_of(args.speed);
    let detail = format!("actuator {} -> {} ({})", args.id, args.position, speed_text(speed));
    operate(remote, format, "move", detail, |mux| {
        mux.move_to(args.id, args.position, speed)
    })
}

pub fn run_all_mid(args: AllMidArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let speed = speed_of(args.speed);
    let detail = format!("all -> middle ({})", speed_text(speed));
    operate(remote, format, "all-mid", detail, |mux| mux.all_middle(speed))
}

pub fn run_all_stop(remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    operate(remote, format, "all-stop", "all stopped".to_string(), |mux| {
        mux.all_stop()
    })
}

pub fn run_torque(args: TorqueArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let enable = args.state == Switch::On;
    let detail = format!("torque {}", if enable { "on" } else { "off" });
    operate(remote, format, "torque", detail, |mux| mux.all_torque(enable))
}

pub fn run_all_speed(
    args: AllSpeedArgs,
    remote: &RemoteArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let level = args.speed;
    let detail = format!("all speed {level}");
    operate(remote, format, "all-speed", detail, |mux| {
        mux.all_set_speed(level)
    })
}

pub fn run_multi(args: MultiArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let ids = parse_list(&args.ids, "actuator id", |s| {
        s.parse::<usize>()
            .map_err(|_| ServoError::InvalidArgument(format!("invalid actuator id {s:?}")))
    })?;
    let positions = parse_list(&args.positions, "position", |s| s.parse::<Position>())?;
    let speeds = args
        .speeds
        .as_deref()
        .map(|list| parse_list(list, "speed", parse_speed))
        .transpose()?;

    let detail = format!("{} actuators", ids.len());
    operate(remote, format, "multi", detail, |mux| {
        mux.multi_move(&ids, &positions, speeds.as_deref())
    })
}

pub fn run_mode(args: ModeArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let motor = args.mode == Mode::Motor;
    let detail = format!(
        "actuator {} -> {} mode",
        args.id,
        if motor { "motor" } else { "servo" }
    );
    operate(remote, format, "mode", detail, |mux| {
        let mut guard = mux.lock();
        guard.select(args.id)?;
        guard.set_mode(motor)
    })
}

pub fn run_set_middle(
    args: SetMiddleArgs,
    remote: &RemoteArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let detail = format!("actuator {} middle stored", args.id);
    operate(remote, format, "set-middle", detail, |mux| {
        let mut guard = mux.lock();
        guard.select(args.id)?;
        guard.set_middle()
    })
}

pub fn run_active(args: ActiveArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    match args.id {
        Some(id) => operate(remote, format, "active", format!("selected {id}"), |mux| {
            mux.select(id)
        }),
        None => {
            let mux = remote.multiplexer()?;
            let report = OperationReport {
                operation: "active",
                detail: "assumed selection".to_string(),
                active_id: mux.active_id(),
            };
            print_report(&report, format);
            Ok(SUCCESS)
        }
    }
}

fn operate(
    remote: &RemoteArgs,
    format: OutputFormat,
    operation: &str,
    detail: String,
    op: impl FnOnce(&Multiplexer<HttpLink>) -> Result<(), ServoError>,
) -> CliResult<i32> {
    let mux = remote.multiplexer()?;
    op(&mux).map_err(|err| servo_error(&format!("{operation} failed"), err))?;

    let report = OperationReport {
        operation,
        detail,
        active_id: mux.active_id(),
    };
    print_report(&report, format);
    Ok(SUCCESS)
}

fn speed_text(speed: Option<SpeedLevel>) -> String {
    speed.map_or_else(|| "keep speed".to_string(), |level| format!("{level} speed"))
}

/// Split a comma-separated argument and parse each entry.
fn parse_list<T>(
    input: &str,
    what: &str,
    parse: impl Fn(&str) -> Result<T, ServoError>,
) -> CliResult<Vec<T>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse(s).map_err(|err| CliError::usage(format!("invalid {what} list: {err}"))))
        .collect()
}
