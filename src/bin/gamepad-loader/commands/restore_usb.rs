use gamepad_loader::{
    api,
    dfu::{DfuMode, WallClock},
    profiles::ProfileTable,
    toolchain::SystemRunner,
};

use crate::cli;
use crate::commands::{flash_usb::dfu_options, report_error};
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::RestoreUsbArgs, out: &mut dyn Reporter) -> i32 {
    let table = ProfileTable::default();
    let mut runner = SystemRunner;
    let opts = dfu_options(&args.dfu);

    let r = api::flash_dfu(
        &args.common.project_root,
        &table,
        DfuMode::Restore,
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
