use std::path::Path;

use thiserror::Error;

use crate::{
    build, dfu,
    dfu::{DfuMode, DfuOptions, Sleep},
    isp,
    isp::IspOptions,
    operation::OperationEvent,
    profiles::{ProfileError, ProfileTable},
    toolchain::{ToolError, ToolRunner},
};

/// Coarse classification used by the CLI to pick exit codes for failures
/// that have no subprocess status of their own.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlashErrorKind {
    UnknownProject,
    BuildFailure,
    ConversionFailure,
    EraseFailure,
    ProgrammerFailure,
    ToolSpawn,
    WaitAborted,
}

#[derive(Error, Debug)]
pub enum FlashError {
    #[error(transparent)]
    UnknownProject(#[from] ProfileError),

    #[error("build failed with status {code}")]
    BuildFailed { code: i32 },

    #[error("hex conversion failed with status {code}")]
    ConversionFailed { code: i32, stderr: String },

    #[error("erase failed with status {code}")]
    EraseFailed { code: i32, stderr: String },

    #[error("programmer failed with status {code}")]
    ProgrammerFailed { code: i32, stderr: String },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("device wait cancelled")]
    WaitCancelled,

    #[error("device not detected after {polls} polls")]
    WaitExpired { polls: u32 },
}

impl FlashError {
    pub fn kind(&self) -> FlashErrorKind {
        match self {
            FlashError::UnknownProject(_) => FlashErrorKind::UnknownProject,
            FlashError::BuildFailed { .. } => FlashErrorKind::BuildFailure,
            FlashError::ConversionFailed { .. } => FlashErrorKind::ConversionFailure,
            FlashError::EraseFailed { .. } => FlashErrorKind::EraseFailure,
            FlashError::ProgrammerFailed { .. } => FlashErrorKind::ProgrammerFailure,
            FlashError::Tool(_) => FlashErrorKind::ToolSpawn,
            FlashError::WaitCancelled | FlashError::WaitExpired { .. } => {
                FlashErrorKind::WaitAborted
            }
        }
    }

    /// Status of the subprocess that caused this failure, when there is
    /// one. The process must exit with exactly this code so downstream
    /// automation can tell failure causes apart by the tool's own status
    /// semantics.
    pub fn status(&self) -> Option<i32> {
        match self {
            FlashError::BuildFailed { code }
            | FlashError::ConversionFailed { code, .. }
            | FlashError::EraseFailed { code, .. }
            | FlashError::ProgrammerFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Captured stderr of the failing tool, when it was captured.
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            FlashError::ConversionFailed { stderr, .. }
            | FlashError::EraseFailed { stderr, .. }
            | FlashError::ProgrammerFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// `build <project>`: cross-compile only.
pub fn build_project<F>(
    root: &Path,
    table: &ProfileTable,
    project: &str,
    runner: &mut dyn ToolRunner,
    mut on_event: F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    let profile = table.resolve(project)?;
    build::run_build(root, profile, runner, &mut on_event)?;
    Ok(())
}

/// `flash <project>`: build, then program over serial ISP.
///
/// Aborts before the programmer spawns if the build fails; the caller's
/// process exit status must equal avrdude's own status either way.
pub fn flash_isp<F>(
    root: &Path,
    table: &ProfileTable,
    project: &str,
    opts: &IspOptions,
    runner: &mut dyn ToolRunner,
    mut on_event: F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    let profile = table.resolve(project)?;
    let artifact = build::run_build(root, profile, runner, &mut on_event)?;
    isp::program(profile, &artifact, opts, runner, &mut on_event)
}

/// `flash-usb` / `restore-usb`: the DFU state machine.
pub fn flash_dfu<F>(
    root: &Path,
    table: &ProfileTable,
    mode: DfuMode,
    opts: &DfuOptions,
    runner: &mut dyn ToolRunner,
    sleep: &dyn Sleep,
    mut on_event: F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    dfu::run(root, table, mode, opts, runner, sleep, &mut on_event)
}
