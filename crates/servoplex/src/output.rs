use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use servoplex::frame::RxStats;
use servoplex::servo::{PlanStep, Preset, SpeedLevel};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Outcome of a completed actuator operation.
#[derive(Debug, Serialize)]
pub struct OperationReport<'a> {
    pub operation: &'a str,
    pub detail: String,
    pub active_id: usize,
}

pub fn print_report(report: &OperationReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["OPERATION", "DETAIL", "ACTIVE"]);
            table.add_row(vec![
                report.operation.to_string(),
                report.detail.clone(),
                report.active_id.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} ok ({}) active={}",
                report.operation, report.detail, report.active_id
            );
        }
    }
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    preset: &'static str,
    actuators: usize,
    steps: &'a [PlanStep],
}

/// Print the steps a preset would run.
pub fn print_plan(preset: &Preset, actuators: usize, steps: &[PlanStep], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&PlanOutput {
            preset: preset.name(),
            actuators,
            steps,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "ACTUATOR", "POSITION", "SPEED", "DELAY"]);
            for (index, row) in plan_rows(steps).into_iter().enumerate() {
                let mut cells = vec![index.to_string()];
                cells.extend(row);
                table.add_row(cells);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} ({} actuators)", preset.name(), actuators);
            for (index, row) in plan_rows(steps).into_iter().enumerate() {
                println!("  {index:>3}  {}", row.join("  "));
            }
        }
    }
}

fn plan_rows(steps: &[PlanStep]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for step in steps {
        match step {
            PlanStep::Sequence { actions } => {
                for action in actions {
                    rows.push(vec![
                        action.actuator.to_string(),
                        action.position.to_string(),
                        speed_label(action.speed),
                        format!("{}ms", action.post_delay.as_millis()),
                    ]);
                }
            }
            PlanStep::AllMiddle { speed } => rows.push(vec![
                "all".to_string(),
                "middle".to_string(),
                speed_label(*speed),
                "-".to_string(),
            ]),
            PlanStep::Pause { duration } => rows.push(vec![
                "-".to_string(),
                "hold".to_string(),
                "-".to_string(),
                format!("{}ms", duration.as_millis()),
            ]),
        }
    }
    rows
}

fn speed_label(speed: Option<SpeedLevel>) -> String {
    speed.map_or_else(|| "keep".to_string(), |level| level.to_string())
}

/// One panel event recovered from a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventOutput {
    Button { id: u8, pressed: bool },
    Slider { channel: u8, value: u8 },
    Unknown { command_type: u8 },
}

#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub events: Vec<EventOutput>,
    pub bytes: usize,
    pub resyncs: u64,
    pub leftover: usize,
}

pub fn print_replay(replay: &ReplayOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(replay),
        OutputFormat::Table => {
            let mut table = new_table(vec!["#", "KIND", "ARG A", "ARG B"]);
            for (index, event) in replay.events.iter().enumerate() {
                let (kind, a, b) = event_cells(event);
                table.add_row(vec![index.to_string(), kind.to_string(), a, b]);
            }
            println!("{table}");
            println!(
                "{} bytes, {} resyncs, {} left over",
                replay.bytes, replay.resyncs, replay.leftover
            );
        }
        OutputFormat::Pretty => {
            for event in &replay.events {
                let (kind, a, b) = event_cells(event);
                println!("{kind} {a} {b}");
            }
            println!(
                "bytes={} resyncs={} leftover={}",
                replay.bytes, replay.resyncs, replay.leftover
            );
        }
    }
}

fn event_cells(event: &EventOutput) -> (&'static str, String, String) {
    match event {
        EventOutput::Button { id, pressed } => (
            "button",
            id.to_string(),
            if *pressed { "pressed" } else { "released" }.to_string(),
        ),
        EventOutput::Slider { channel, value } => {
            ("slider", channel.to_string(), value.to_string())
        }
        EventOutput::Unknown { command_type } => {
            ("unknown", format!("0x{command_type:02X}"), String::new())
        }
    }
}

#[derive(Serialize)]
struct ListenOutput {
    bytes_received: u64,
    bytes_dropped: u64,
    frames: u64,
    resyncs: u64,
    unknown_commands: u64,
    operations: u64,
    failed_operations: u64,
}

/// Receive counters and panel operation counts after `listen` stops.
pub fn print_listen_summary(stats: RxStats, operations: u64, failures: u64, format: OutputFormat) {
    let out = ListenOutput {
        bytes_received: stats.bytes_received,
        bytes_dropped: stats.bytes_dropped,
        frames: stats.frames,
        resyncs: stats.resyncs,
        unknown_commands: stats.unknown_commands,
        operations,
        failed_operations: failures,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["COUNTER", "VALUE"]);
            for (name, value) in [
                ("bytes_received", out.bytes_received),
                ("bytes_dropped", out.bytes_dropped),
                ("frames", out.frames),
                ("resyncs", out.resyncs),
                ("unknown_commands", out.unknown_commands),
                ("operations", out.operations),
                ("failed_operations", out.failed_operations),
            ] {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frames={} resyncs={} dropped={} unknown={} operations={} failed={}",
                out.frames,
                out.resyncs,
                out.bytes_dropped,
                out.unknown_commands,
                out.operations,
                out.failed_operations
            );
        }
    }
}

#[derive(Serialize)]
struct ReadbackOutput<'a> {
    source: &'a str,
    body: &'a str,
}

/// Raw text returned by a remote readback endpoint.
pub fn print_readback(source: &str, body: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ReadbackOutput { source, body }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", body.trim_end()),
    }
}

pub fn print_ports(ports: &[String], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ports),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PORT"]);
            for port in ports {
                table.add_row(vec![port.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!("{port}");
            }
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
