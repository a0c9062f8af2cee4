use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::api::FlashError;
use crate::operation::OperationEvent;
use crate::profiles::{ProfileTable, USB_INTERFACE_PROJECT};
use crate::toolchain::{ToolInvocation, ToolRunner};
use crate::build;

/// dfu-programmer's status when asked to erase an already-blank chip.
/// Treated as success by the pipeline.
pub const BENIGN_ERASE_STATUS: i32 = 5;

/// Atmel DFU bootloader vendor:product pair as printed by `lsusb`.
pub const BOOTLOADER_MARKER: &str = "03eb:2fef";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfuMode {
    /// Build the USB firmware, convert it to hex and flash it.
    Write,
    /// Flash the pre-shipped factory image; no build, no conversion.
    Restore,
}

/// Cooperative cancellation for the device wait loop. The default pipeline
/// never cancels; embedders and tests can.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Injectable sleep so tests can poll without wall-clock delay.
pub trait Sleep {
    fn sleep(&self, d: Duration);
}

/// Real wall-clock sleep.
#[derive(Debug, Default)]
pub struct WallClock;

impl Sleep for WallClock {
    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

#[derive(Debug, Clone)]
pub struct DfuOptions {
    /// Substring scanned for in enumeration output.
    pub marker: String,
    /// dfu-programmer device name.
    pub device: String,
    pub poll_interval: Duration,
    /// Bound on wait cycles (None = wait forever for the user to put the
    /// device in bootloader mode).
    pub max_polls: Option<u32>,
    pub benign_erase_status: i32,
    /// Where the converted Intel hex image is staged in write mode.
    pub staging_hex: PathBuf,
    /// Repo-relative factory image flashed in restore mode.
    pub factory_image: PathBuf,
    pub cancel: CancelToken,
}

impl Default for DfuOptions {
    fn default() -> Self {
        Self {
            marker: BOOTLOADER_MARKER.to_string(),
            device: "atmega8u2".to_string(),
            poll_interval: Duration::from_secs(1),
            max_polls: None,
            benign_erase_status: BENIGN_ERASE_STATUS,
            staging_hex: PathBuf::from("/tmp/gamepad-usb.hex"),
            factory_image: PathBuf::from("usb-interface/factory/usb-serial-factory.hex"),
            cancel: CancelToken::new(),
        }
    }
}

/// Poll `lsusb` until the bootloader's vendor:product marker shows up.
///
/// Enumeration tool failures are logged and retried rather than aborting:
/// transient USB churn while the user replugs the board is expected here.
/// Returns the number of polls it took.
fn wait_for_bootloader<F>(
    opts: &DfuOptions,
    runner: &mut dyn ToolRunner,
    sleep: &dyn Sleep,
    on_event: &mut F,
) -> Result<u32, FlashError>
where
    F: FnMut(OperationEvent),
{
    on_event(OperationEvent::WaitStart {
        marker: opts.marker.clone(),
    });

    let inv = ToolInvocation::new("lsusb");
    let mut polls: u32 = 0;
    loop {
        if opts.cancel.is_cancelled() {
            return Err(FlashError::WaitCancelled);
        }

        polls += 1;
        let out = runner.run(&inv)?;
        if !out.success() {
            let error = out.stderr_lossy();
            tracing::warn!(code = out.code, %error, "enumeration failed, retrying");
            on_event(OperationEvent::EnumerationFailed { error });
        } else if out.stdout_lossy().contains(&opts.marker) {
            on_event(OperationEvent::BootloaderDetected { polls });
            return Ok(polls);
        } else {
            on_event(OperationEvent::WaitPoll { polls });
        }

        if let Some(max) = opts.max_polls {
            if polls >= max {
                return Err(FlashError::WaitExpired { polls });
            }
        }
        sleep.sleep(opts.poll_interval);
    }
}

/// Convert the built ELF to the Intel hex image dfu-programmer consumes.
fn convert_to_hex<F>(
    artifact: &Path,
    dest: &Path,
    runner: &mut dyn ToolRunner,
    on_event: &mut F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    on_event(OperationEvent::ConvertStart {
        source: artifact.to_path_buf(),
        dest: dest.to_path_buf(),
    });

    let inv = ToolInvocation::new("avr-objcopy")
        .arg("-O")
        .arg("ihex")
        .arg(artifact.display().to_string())
        .arg(dest.display().to_string());

    let out = runner.run(&inv)?;
    if !out.success() {
        return Err(FlashError::ConversionFailed {
            code: out.code,
            stderr: out.stderr_lossy(),
        });
    }
    Ok(())
}

fn erase<F>(
    opts: &DfuOptions,
    runner: &mut dyn ToolRunner,
    on_event: &mut F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    on_event(OperationEvent::EraseStart);

    let inv = ToolInvocation::new("dfu-programmer")
        .arg(&opts.device)
        .arg("erase");

    let out = runner.run(&inv)?;
    if out.success() {
        on_event(OperationEvent::EraseDone);
        return Ok(());
    }
    if out.code == opts.benign_erase_status {
        // Chip was already blank; nothing to erase.
        on_event(OperationEvent::EraseAlreadyBlank { code: out.code });
        return Ok(());
    }
    Err(FlashError::EraseFailed {
        code: out.code,
        stderr: out.stderr_lossy(),
    })
}

fn write_image<F>(
    image: &Path,
    opts: &DfuOptions,
    runner: &mut dyn ToolRunner,
    on_event: &mut F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    on_event(OperationEvent::FlashStart {
        image: image.to_path_buf(),
    });

    let inv = ToolInvocation::new("dfu-programmer")
        .arg(&opts.device)
        .arg("flash")
        .arg(image.display().to_string());

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
    on_event(OperationEvent::Done { replug: true });
    Ok(())
}

/// The DFU pipeline: BUILD (write mode) -> WAIT_FOR_DEVICE -> CONVERT
/// (write mode) -> ERASE -> FLASH. Every fatal step short-circuits the
/// rest; no step is revisited.
pub fn run<F>(
    root: &Path,
    table: &ProfileTable,
    mode: DfuMode,
    opts: &DfuOptions,
    runner: &mut dyn ToolRunner,
    sleep: &dyn Sleep,
    on_event: &mut F,
) -> Result<(), FlashError>
where
    F: FnMut(OperationEvent),
{
    let image = match mode {
        DfuMode::Write => {
            let profile = table.resolve(USB_INTERFACE_PROJECT)?;
            let artifact = build::run_build(root, profile, runner, on_event)?;
            wait_for_bootloader(opts, runner, sleep, on_event)?;
            convert_to_hex(&artifact, &opts.staging_hex, runner, on_event)?;
            opts.staging_hex.clone()
        }
        DfuMode::Restore => {
            wait_for_bootloader(opts, runner, sleep, on_event)?;
            root.join(&opts.factory_image)
        }
    };

    erase(opts, runner, on_event)?;
    write_image(&image, opts, runner, on_event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FlashErrorKind;
    use crate::toolchain::script::{ok, outcome, ScriptedRunner};

    struct NoSleep;

    impl Sleep for NoSleep {
        fn sleep(&self, _d: Duration) {}
    }

    fn opts() -> DfuOptions {
        DfuOptions::default()
    }

    const LSUSB_MISS: &str = "Bus 001 Device 002: ID 8087:0024 Intel Corp.\n";
    const LSUSB_HIT: &str =
        "Bus 001 Device 002: ID 8087:0024 Intel Corp.\nBus 003 Device 007: ID 03eb:2fef Atmel Corp.\n";

    fn run_pipeline(
        mode: DfuMode,
        opts: &DfuOptions,
        runner: &mut ScriptedRunner,
        evs: &mut Vec<OperationEvent>,
    ) -> Result<(), FlashError> {
        run(
            Path::new("/repo"),
            &ProfileTable::default(),
            mode,
            opts,
            runner,
            &NoSleep,
            &mut |e| evs.push(e),
        )
    }

    #[test]
    fn write_mode_runs_full_pipeline_in_order() {
        let mut runner = ScriptedRunner::new(vec![
            ok(""),          // cargo build
            ok(LSUSB_HIT),   // lsusb
            ok(""),          // avr-objcopy
            ok(""),          // erase
            ok("flash ok\n"), // flash
        ]);
        let mut evs = Vec::new();

        run_pipeline(DfuMode::Write, &opts(), &mut runner, &mut evs).unwrap();

        assert_eq!(
            runner.programs(),
            vec!["cargo", "lsusb", "avr-objcopy", "dfu-programmer", "dfu-programmer"]
        );
        assert_eq!(runner.calls[3].args, vec!["atmega8u2", "erase"]);
        assert_eq!(
            runner.calls[4].args,
            vec![
                "atmega8u2".to_string(),
                "flash".to_string(),
                "/tmp/gamepad-usb.hex".to_string()
            ]
        );
        assert!(evs
            .iter()
            .any(|e| matches!(e, OperationEvent::Done { replug: true })));
    }

    #[test]
    fn wait_exits_on_first_cycle_containing_marker() {
        let mut runner = ScriptedRunner::new(vec![
            ok(LSUSB_MISS),
            ok(LSUSB_MISS),
            ok(LSUSB_HIT),
        ]);
        let mut evs = Vec::new();

        let polls =
            wait_for_bootloader(&opts(), &mut runner, &NoSleep, &mut |e| evs.push(e)).unwrap();

        assert_eq!(polls, 3);
        assert_eq!(runner.calls.len(), 3);
        assert!(evs
            .iter()
            .any(|e| matches!(e, OperationEvent::BootloaderDetected { polls: 3 })));
    }

    #[test]
    fn wait_retries_through_enumeration_failure() {
        let mut runner = ScriptedRunner::new(vec![
            outcome(1, "", "lsusb: cannot open /dev/bus/usb\n"),
            ok(LSUSB_HIT),
        ]);
        let mut evs = Vec::new();

        let polls =
            wait_for_bootloader(&opts(), &mut runner, &NoSleep, &mut |e| evs.push(e)).unwrap();

        assert_eq!(polls, 2);
        assert!(evs.iter().any(|e| matches!(
            e,
            OperationEvent::EnumerationFailed { error } if error.contains("cannot open")
        )));
    }

    #[test]
    fn wait_ignores_marker_in_stderr() {
        // Marker must be matched in the enumeration listing, not in noise
        // on the error stream.
        let mut runner = ScriptedRunner::new(vec![
            outcome(0, LSUSB_MISS, "03eb:2fef"),
            ok(LSUSB_HIT),
        ]);

        let polls =
            wait_for_bootloader(&opts(), &mut runner, &NoSleep, &mut |_| {}).unwrap();
        assert_eq!(polls, 2);
    }

    #[test]
    fn wait_respects_max_polls() {
        let mut o = opts();
        o.max_polls = Some(3);
        let mut runner =
            ScriptedRunner::new(vec![ok(LSUSB_MISS), ok(LSUSB_MISS), ok(LSUSB_MISS)]);

        let err = wait_for_bootloader(&o, &mut runner, &NoSleep, &mut |_| {}).unwrap_err();

        assert!(matches!(err, FlashError::WaitExpired { polls: 3 }));
        assert_eq!(runner.calls.len(), 3);
    }

    #[test]
    fn cancelled_token_aborts_before_probing() {
        let o = opts();
        o.cancel.cancel();
        let mut runner = ScriptedRunner::new(vec![]);

        let err = wait_for_bootloader(&o, &mut runner, &NoSleep, &mut |_| {}).unwrap_err();

        assert!(matches!(err, FlashError::WaitCancelled));
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn benign_erase_status_continues_to_flash() {
        let mut runner = ScriptedRunner::new(vec![
            ok(""),
            ok(LSUSB_HIT),
            ok(""),
            outcome(BENIGN_ERASE_STATUS, "", "chip already blank\n"),
            ok(""),
        ]);
        let mut evs = Vec::new();

        run_pipeline(DfuMode::Write, &opts(), &mut runner, &mut evs).unwrap();

        assert_eq!(runner.calls.len(), 5);
        assert!(evs
            .iter()
            .any(|e| matches!(e, OperationEvent::EraseAlreadyBlank { code: 5 })));
    }

    #[test]
    fn other_erase_status_aborts_with_that_status() {
        let mut runner = ScriptedRunner::new(vec![
            ok(""),
            ok(LSUSB_HIT),
            ok(""),
            outcome(74, "", "device io error\n"),
        ]);
        let mut evs = Vec::new();

        let err = run_pipeline(DfuMode::Write, &opts(), &mut runner, &mut evs).unwrap_err();

        assert_eq!(err.kind(), FlashErrorKind::EraseFailure);
        assert_eq!(err.status(), Some(74));
        // Flash never spawned.
        assert_eq!(runner.calls.len(), 4);
    }

    #[test]
    fn conversion_failure_stops_before_erase() {
        let mut runner = ScriptedRunner::new(vec![
            ok(""),
            ok(LSUSB_HIT),
            outcome(1, "", "avr-objcopy: bad format\n"),
        ]);
        let mut evs = Vec::new();

        let err = run_pipeline(DfuMode::Write, &opts(), &mut runner, &mut evs).unwrap_err();

        assert_eq!(err.kind(), FlashErrorKind::ConversionFailure);
        assert_eq!(runner.programs(), vec!["cargo", "lsusb", "avr-objcopy"]);
    }

    #[test]
    fn restore_mode_skips_build_and_convert() {
        let mut runner = ScriptedRunner::new(vec![ok(LSUSB_HIT), ok(""), ok("")]);
        let mut evs = Vec::new();

        run_pipeline(DfuMode::Restore, &opts(), &mut runner, &mut evs).unwrap();

        assert_eq!(runner.programs(), vec!["lsusb", "dfu-programmer", "dfu-programmer"]);
        let image = runner.calls[2].args.last().unwrap().clone();
        assert_eq!(
            image,
            "/repo/usb-interface/factory/usb-serial-factory.hex"
        );
    }

    #[test]
    fn write_mode_build_failure_stops_everything() {
        let mut runner = ScriptedRunner::new(vec![outcome(101, "", "")]);
        let mut evs = Vec::new();

        let err = run_pipeline(DfuMode::Write, &opts(), &mut runner, &mut evs).unwrap_err();

        assert_eq!(err.status(), Some(101));
        assert_eq!(runner.programs(), vec!["cargo"]);
    }

    #[test]
    fn factory_image_resolves_under_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let factory = dir.path().join("usb-interface/factory/usb-serial-factory.hex");
        std::fs::create_dir_all(factory.parent().unwrap()).unwrap();
        std::fs::write(&factory, ":00000001FF\n").unwrap();

        let mut runner = ScriptedRunner::new(vec![ok(LSUSB_HIT), ok(""), ok("")]);
        run(
            dir.path(),
            &ProfileTable::default(),
            DfuMode::Restore,
            &opts(),
            &mut runner,
            &NoSleep,
            &mut |_| {},
        )
        .unwrap();

        let image = runner.calls[2].args.last().unwrap();
        assert_eq!(Path::new(image), factory);
        assert!(factory.exists());
    }
}
