use gamepad_loader::{api, profiles::ProfileTable, toolchain::SystemRunner};

use crate::cli;
use crate::commands::report_error;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::BuildArgs, out: &mut dyn Reporter) -> i32 {
    let table = ProfileTable::default();
    let mut runner = SystemRunner;

    let r = api::build_project(
        &args.common.project_root,
        &table,
        &args.project,
        &mut runner,
        |ev| out.emit(Event::Operation(ev)),
    );

    match r {
        Ok(()) => exit_codes::EXIT_OK,
        Err(e) => report_error(&e, out),
    }
}
