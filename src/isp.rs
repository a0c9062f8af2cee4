use std::path::Path;

use crate::api::FlashError;
use crate::operation::OperationEvent;
use crate::profiles::ProjectProfile;
use crate::toolchain::{ToolInvocation, ToolRunner};

/// Serial ISP programming knobs. Injected so alternate boards or
/// programmers need no pipeline change.
#[derive(Debug, Clone)]
pub struct IspOptions {
    /// Serial device the board enumerates as.
    pub port: String,
    /// avrdude `-c` programmer type.
    pub programmer: String,
}

impl Default for IspOptions {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            programmer: "arduino".to_string(),
        }
    }
}

/// Program a built ELF over serial ISP with avrdude.
///
/// The MCU flag comes from the profile, so every board family goes through
/// this one code path. `-D` skips the chip erase (the write op carries its
/// own erase-before-write modifier).
pub fn program<F>(
    profile: &ProjectProfile,
    artifact: &Path,
    opts: &IspOptions,
    runner: &mut dyn ToolRunner,
    on_event: &mut F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    on_event(OperationEvent::FlashStart {
        image: artifact.to_path_buf(),
    });

    let inv = ToolInvocation::new("avrdude")
        .arg("-q")
        .arg(format!("-p{}", profile.mcu))
        .arg(format!("-c{}", opts.programmer))
        .arg(format!("-P{}", opts.port))
        .arg("-D")
        .arg(format!("-Uflash:w:{}:e", artifact.display()));

    let out = runner.run(&inv)?;
    if !out.success() {
        return Err(FlashError::ProgrammerFailed {
            code: out.code,
            stderr: out.stderr_lossy(),
        });
    }

    on_event(OperationEvent::ProgrammerOutput {
        text: out.stdout_lossy(),
    });
    on_event(OperationEvent::Done { replug: false });
    Ok(())
}
