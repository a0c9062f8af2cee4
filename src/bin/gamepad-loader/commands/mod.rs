use gamepad_loader::api::{FlashError, FlashErrorKind};

use crate::exit_codes;
use crate::output::{Event, Reporter};

pub mod build;
pub mod descriptor;
pub mod flash;
pub mod flash_usb;
pub mod projects;
pub mod restore_usb;

/// Exit-code policy: a failing subprocess's own status passes through
/// untouched; only failures with no subprocess behind them get a local
/// code.
pub(crate) fn error_exit_code(e: &FlashError) -> i32 {
    if let Some(code) = e.status() {
        return code;
    }
    match e.kind() {
        FlashErrorKind::UnknownProject => exit_codes::EXIT_UNKNOWN_PROJECT,
        FlashErrorKind::WaitAborted => exit_codes::EXIT_WAIT_ABORTED,
        _ => exit_codes::EXIT_TOOL_SPAWN,
    }
}

pub(crate) fn report_error(e: &FlashError, out: &mut dyn Reporter) -> i32 {
    let code = error_exit_code(e);
    out.emit(Event::Error {
        code,
        message: e.to_string(),
        detail: e.tool_stderr().map(|s| s.to_string()),
    });
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamepad_loader::profiles::ProfileError;
    use gamepad_loader::toolchain::ToolError;

    #[test]
    fn subprocess_status_passes_through() {
        let e = FlashError::ProgrammerFailed {
            code: 3,
            stderr: String::new(),
        };
        assert_eq!(error_exit_code(&e), 3);

        let e = FlashError::BuildFailed { code: 101 };
        assert_eq!(error_exit_code(&e), 101);
    }

    #[test]
    fn local_failures_use_local_codes() {
        let e = FlashError::UnknownProject(ProfileError::Unknown {
            project: "x".to_string(),
        });
        assert_eq!(error_exit_code(&e), exit_codes::EXIT_UNKNOWN_PROJECT);

        let e = FlashError::WaitCancelled;
        assert_eq!(error_exit_code(&e), exit_codes::EXIT_WAIT_ABORTED);

        let e = FlashError::Tool(ToolError::Spawn {
            cmd: "lsusb".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(error_exit_code(&e), exit_codes::EXIT_TOOL_SPAWN);
    }
}
