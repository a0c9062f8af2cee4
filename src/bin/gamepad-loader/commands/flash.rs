use gamepad_loader::{
    api, isp::IspOptions, profiles::ProfileTable, toolchain::SystemRunner,
};

use crate::cli;
use crate::commands::report_error;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::FlashArgs, out: &mut dyn Reporter) -> i32 {
    let table = ProfileTable::default();
    let mut runner = SystemRunner;
    let opts = IspOptions {
        port: args.port.clone(),
        programmer: args.programmer.clone(),
    };

    let r = api::flash_isp(
        &args.common.project_root,
        &table,
        &args.project,
        &opts,
        &mut runner,
        |ev| out.emit(Event::Operation(ev)),
    );

    match r {
        Ok(()) => exit_codes::EXIT_OK,
        Err(e) => report_error(&e, out),
    }
}
