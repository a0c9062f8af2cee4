use gamepad_loader::descriptor;

use crate::cli;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(args: cli::GenStringDescriptorArgs, out: &mut dyn Reporter) -> i32 {
    let text = args.text.join(" ");
    let bytes = descriptor::encode(&text);
    out.emit(Event::Descriptor { text, bytes });
    exit_codes::EXIT_OK
}
