use std::io::{IsTerminal, Write};

use gamepad_loader::{descriptor, operation::OperationEvent, profiles::ProjectProfile};

use crate::output::{Event, OutputOptions, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Quiet,
    Verbose,
    Progress,
}

pub struct HumanOutput {
    opts: OutputOptions,
    is_tty: bool,
    wait_active: bool,
    wait_polls: u32,
}

impl HumanOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self {
            opts,
            is_tty: std::io::stderr().is_terminal(),
            wait_active: false,
            wait_polls: 0,
        }
    }

    fn mode(&self) -> Mode {
        if self.opts.quiet {
            Mode::Quiet
        } else if self.opts.verbose {
            Mode::Verbose
        } else {
            Mode::Progress
        }
    }

    fn finish_line(&mut self) {
        if self.wait_active {
            eprintln!();
            self.wait_active = false;
        }
    }

    fn println(&mut self, msg: &str) {
        if self.mode() == Mode::Quiet {
            return;
        }
        self.finish_line();
        eprintln!("{msg}");
    }

    fn wait_tick(&mut self) {
        if self.mode() != Mode::Progress || !self.is_tty {
            return;
        }
        self.wait_polls += 1;
        eprint!("\r  waiting for bootloader... ({} polls)", self.wait_polls);
        let _ = std::io::stderr().flush();
        self.wait_active = true;
    }

    fn on_operation(&mut self, ev: OperationEvent) {
        match ev {
            OperationEvent::BuildStart { project, mcu } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("building {project} ({mcu})..."));
                } else {
                    self.println(&format!("building {project}..."));
                }
            }
            OperationEvent::BuildDone { code } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("build finished (status {code})"));
                }
            }
            OperationEvent::WaitStart { marker } => {
                self.wait_polls = 0;
                self.println(&format!(
                    "waiting for DFU bootloader {marker}... (hold the reset jumper, Ctrl-C to abort)"
                ));
            }
            OperationEvent::EnumerationFailed { error } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("usb enumeration failed, retrying: {}", error.trim_end()));
                } else {
                    self.wait_tick();
                }
            }
            OperationEvent::WaitPoll { .. } => {
                self.wait_tick();
            }
            OperationEvent::BootloaderDetected { polls } => {
                self.finish_line();
                if self.mode() == Mode::Verbose {
                    self.println(&format!("bootloader detected after {polls} poll(s)"));
                } else {
                    self.println("bootloader detected");
                }
            }
            OperationEvent::ConvertStart { source, dest } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!(
                        "converting {} -> {}",
                        source.display(),
                        dest.display()
                    ));
                } else {
                    self.println("converting to hex...");
                }
            }
            OperationEvent::EraseStart => {
                self.println("erasing device...");
            }
            OperationEvent::EraseAlreadyBlank { code } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("device already blank (status {code})"));
                }
            }
            OperationEvent::EraseDone => {
                if self.mode() == Mode::Verbose {
                    self.println("erase complete");
                }
            }
            OperationEvent::FlashStart { image } => {
                if self.mode() == Mode::Verbose {
                    self.println(&format!("flashing {}...", image.display()));
                } else {
                    self.println("flashing...");
                }
            }
            OperationEvent::ProgrammerOutput { text } => {
                // Programmer stdout is part of the success report.
                let text = text.trim_end().to_string();
                if !text.is_empty() {
                    self.println(&text);
                }
            }
            OperationEvent::Done { replug } => {
                self.println("Flashing complete!");
                if replug {
                    self.println("Unplug and replug the device to run the new firmware.");
                }
            }
        }
    }

    fn on_projects(&mut self, profiles: &[ProjectProfile]) {
        for p in profiles {
            self.println(&format!(
                "{:<14} {:<11} build-std={:<11} {}",
                p.id,
                p.mcu,
                p.build_std.as_env(),
                p.artifact
            ));
        }
    }
}

impl Reporter for HumanOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Operation(ev) => self.on_operation(ev),
            Event::Descriptor { text: _, bytes } => {
                // Descriptor output is the command's product: stdout, even
                // without --json.
                self.finish_line();
                println!("{}", descriptor::format_literal(&bytes));
            }
            Event::Projects(profiles) => self.on_projects(&profiles),
            Event::Error {
                code: _,
                message,
                detail,
            } => {
                self.finish_line();
                if let Some(d) = detail {
                    let d = d.trim_end();
                    if !d.is_empty() {
                        eprintln!("{d}");
                    }
                }
                eprintln!("error: {message}");
            }
        }
    }

    fn finish(&mut self) {
        self.finish_line();
    }
}
