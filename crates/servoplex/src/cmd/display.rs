use servoplex::frame::DisplayWriter;
use servoplex::transport::{open, SerialConfig};

use crate::cmd::{DisplayAction, DisplayArgs, Switch};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};

pub fn run(args: DisplayArgs) -> CliResult<i32> {
    let config = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    let stream = open(&args.port, &config).map_err(|err| transport_error("open failed", err))?;
    let mut display = DisplayWriter::new(stream);

    let result = match &args.action {
        DisplayAction::Text { widget, text } => display.set_text(widget, text),
        DisplayAction::Value { widget, value } => display.set_value(widget, *value),
        DisplayAction::Button { widget, state } => {
            display.set_button_state(widget, *state == Switch::On)
        }
        DisplayAction::Message { text } => display.show_message(text),
        DisplayAction::Raw { command } => display.send_command(command),
    };
    result
        .and_then(|()| display.flush())
        .map_err(|err| frame_error("display command failed", err))?;

    Ok(SUCCESS)
}
