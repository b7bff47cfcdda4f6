use crate::cmd::RemoteArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_readback, OutputFormat};

pub fn run_status(remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let link = remote.http_link()?;
    let body = link
        .read_status()
        .map_err(|err| link_error("status readback failed", &err))?;
    print_readback("status", &body, format);
    Ok(SUCCESS)
}

pub fn run_ids(remote: &RemoteArgs, format: OutputFormat) -> CliResult<i32> {
    let link = remote.http_link()?;
    let body = link
        .read_id_list()
        .map_err(|err| link_error("id readback failed", &err))?;
    print_readback("ids", &body, format);
    Ok(SUCCESS)
}
