use gamepad_loader::{operation::OperationEvent, profiles::ProjectProfile};

use crate::cli;

pub mod human;
pub mod json;


#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub enum Event {
    Operation(OperationEvent),
    Descriptor {
        text: String,
        bytes: Vec<u8>,
    },
    Projects(Vec<ProjectProfile>),
    Error {
        code: i32,
        message: String,
        /// Captured stderr of the failing tool, when there is one.
        detail: Option<String>,
    },
}

pub trait Reporter {
    fn emit(&mut self, event: Event);
    fn finish(&mut self);
}

pub fn make(common: &cli::CommonArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions {
        verbose: common.verbose,
        quiet: common.quiet,
    };
    if common.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}
