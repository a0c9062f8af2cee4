use std::time::Duration;

use gamepad_loader::{
    api,
    dfu::{DfuMode, DfuOptions, WallClock},
    profiles::ProfileTable,
    toolchain::SystemRunner,
};

use crate::cli;
use crate::commands::report_error;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub(crate) fn dfu_options(args: &cli::DfuArgs) -> DfuOptions {
    DfuOptions {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        max_polls: if args.max_polls == 0 {
            None
        } else {
            Some(args.max_polls)
        },
        ..Default::default()
    }
}

pub fn run(args: cli::FlashUsbArgs, out: &mut dyn Reporter) -> i32 {
    let table = ProfileTable::default();
    let mut runner = SystemRunner;
    let opts = dfu_options(&args.dfu);

    let r = api::flash_dfu(
        &args.common.project_root,
        &table,
        DfuMode::Write,
        &opts,
        &mut runner,
        &WallClock,
        |ev| out.emit(Event::Operation(ev)),
    );

    match r {
        Ok(()) => exit_codes::EXIT_OK,
        Err(e) => report_error(&e, out),
    }
}
