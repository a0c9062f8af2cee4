use std::process;

use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod logging;
mod output;

fn main() {
    logging::init_tracing();

    let cli = cli::Cli::parse();

    let exit_code = match cli.command {
        cli::Command::Build(args) => {
            let mut out = output::make(&args.common);
            let code = commands::build::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Flash(args) => {
            let mut out = output::make(&args.common);
            let code = commands::flash::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::FlashUsb(args) => {
            let mut out = output::make(&args.common);
            let code = commands::flash_usb::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::RestoreUsb(args) => {
            let mut out = output::make(&args.common);
            let code = commands::restore_usb::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::GenStringDescriptor(args) => {
            let mut out = output::make(&args.common);
            let code = commands::descriptor::run(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Projects(args) => {
            let mut out = output::make(&args.common);
            let code = commands::projects::run(args, &mut *out);
            out.finish();
            code
        }
    };

    process::exit(exit_code);
}
