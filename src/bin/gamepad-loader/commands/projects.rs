use gamepad_loader::profiles::ProfileTable;

use crate::cli;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(_args: cli::ProjectsArgs, out: &mut dyn Reporter) -> i32 {
    let table = ProfileTable::default();
    out.emit(Event::Projects(table.iter().cloned().collect()));
    exit_codes::EXIT_OK
}
