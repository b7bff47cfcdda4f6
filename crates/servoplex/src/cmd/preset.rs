use servoplex::servo::Preset;

use crate::cmd::{speed_of, DryRunArgs, RemoteArgs, SeqArgs, WaveArgs};
use crate::exit::{servo_error, CliError, CliResult, SUCCESS};
use crate::output::{print_plan, print_report, OperationReport, OutputFormat};

pub fn run_home(args: DryRunArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    run_preset(Preset::Home, args.dry_run, remote, format)
}

pub fn run_wave(args: WaveArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    if args.cycles == 0 {
        return Err(CliError::usage("wave cycles must be greater than zero"));
    }
    let preset = Preset::Wave {
        cycles: args.cycles,
        speed: speed_of(args.speed),
    };
    run_preset(preset, args.dry_run, remote, format)
}

pub fn run_seq(args: SeqArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let preset = Preset::StepSequence {
        speed: speed_of(args.speed),
    };
    run_preset(preset, args.dry_run, remote, format)
}

pub fn run_self_test(
    args: DryRunArgs,
    remote: &RemoteArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    run_preset(Preset::SelfTest, args.dry_run, remote, format)
}

fn run_preset(
    preset: Preset,
    dry_run: bool,
    remote: &RemoteArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    if dry_run {
        let config = remote.servo_config()?;
        let plan = preset.plan(config.actuator_count);
        print_plan(&preset, config.actuator_count, &plan, format);
        return Ok(SUCCESS);
    }

    let mux = remote.multiplexer()?;
    mux.run_preset(preset)
        .map_err(|err| servo_error(&format!("{} failed", preset.name()), err))?;

    let report = OperationReport {
        operation: preset.name(),
        detail: "preset completed".to_string(),
        active_id: mux.active_id(),
    };
    print_report(&report, format);
    Ok(SUCCESS)
}
