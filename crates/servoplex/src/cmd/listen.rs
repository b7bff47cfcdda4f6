use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use servoplex::frame::{DisplayWriter, RxConfig, RxPipeline};
use servoplex::panel::PanelBindings;
use servoplex::transport::{open, SerialConfig};
use tracing::info;

use crate::cmd::{ListenArgs, RemoteArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_listen_summary, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let mux = Arc::new(remote.multiplexer()?);

    let config = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    let stream = open(&args.port, &config).map_err(|err| transport_error("open failed", err))?;
    let display = stream
        .try_clone()
        .map_err(|err| transport_error("open failed", err))?;

    let display: Box<dyn Write + Send> = Box::new(display);
    let panel = Arc::new(PanelBindings::new(mux).with_display(DisplayWriter::new(display)));

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let handle = RxPipeline::spawn(stream, Arc::clone(&panel), RxConfig::default())
        .map_err(|err| frame_error("receive pipeline failed", err))?;
    info!(port = %args.port, baud = args.baud, "listening for panel events");

    while running.load(Ordering::SeqCst) && !handle.is_finished() {
        if let Some(count) = args.count {
            if handle.stats().frames >= count {
                break;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    handle.shutdown();
    let stats = handle
        .join()
        .map_err(|err| frame_error("receive failed", err))?;

    let (operations, failures) = panel.counts();
    print_listen_summary(stats, operations, failures, format);
    Ok(if failures > 0 { FAILURE } else { SUCCESS })
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
