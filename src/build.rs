use std::path::{Path, PathBuf};

use crate::api::FlashError;
use crate::operation::OperationEvent;
use crate::profiles::ProjectProfile;
use crate::toolchain::{ToolInvocation, ToolRunner};

/// Cross-compile one firmware project.
///
/// The compiler's stdio is inherited so build output lands on the user's
/// terminal in real time; only the exit status is consulted. On success the
/// returned path is where cargo left the ELF for this profile.
pub fn run_build<F>(
    root: &Path,
    profile: &ProjectProfile,
    runner: &mut dyn ToolRunner,
    on_event: &mut F,
) -> Result<PathBuf, FlashError>
where
    F: FnMut(OperationEvent),
{
    on_event(OperationEvent::BuildStart {
        project: profile.id.clone(),
        mcu: profile.mcu.clone(),
    });

    let inv = ToolInvocation::new("cargo")
        .arg("build")
        .arg("--release")
        .arg(format!(
            "--manifest-path={}",
            profile.manifest_path(root).display()
        ))
        .env(
            "CARGO_BUILD_TARGET",
            profile.target_spec_path(root).display().to_string(),
        )
        .env("CARGO_UNSTABLE_BUILD_STD", profile.build_std.as_env());

    let code = runner.run_passthrough(&inv)?;
    on_event(OperationEvent::BuildDone { code });

    if code != 0 {
        tracing::warn!(project = %profile.id, code, "build failed");
        return Err(FlashError::BuildFailed { code });
    }

    Ok(profile.artifact_path(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ProfileTable;
    use crate::toolchain::script::{outcome, ScriptedRunner};

    #[test]
    fn build_sets_target_env_from_profile() {
        let table = ProfileTable::default();
        let profile = table.resolve("controller").unwrap();
        let mut runner = ScriptedRunner::new(vec![outcome(0, "", "")]);

        let artifact =
            run_build(Path::new("/repo"), profile, &mut runner, &mut |_| {}).unwrap();

        assert_eq!(runner.programs(), vec!["cargo"]);
        let inv = &runner.calls[0];
        assert!(inv
            .args
            .contains(&"--manifest-path=/repo/controller/Cargo.toml".to_string()));
        assert!(inv.env.iter().any(|(k, v)| {
            k == "CARGO_BUILD_TARGET" && v.ends_with("avr-atmega328p.json")
        }));
        assert!(inv
            .env
            .iter()
            .any(|(k, v)| k == "CARGO_UNSTABLE_BUILD_STD" && v == "core"));
        assert!(artifact.ends_with("release/gamepad-controller.elf"));
    }

    #[test]
    fn usb_interface_builds_with_alloc() {
        let table = ProfileTable::default();
        let profile = table.resolve("usb-interface").unwrap();
        let mut runner = ScriptedRunner::new(vec![outcome(0, "", "")]);

        run_build(Path::new("."), profile, &mut runner, &mut |_| {}).unwrap();

        assert!(runner.calls[0]
            .env
            .iter()
            .any(|(k, v)| k == "CARGO_UNSTABLE_BUILD_STD" && v == "core,alloc"));
    }

    #[test]
    fn build_failure_surfaces_compiler_status() {
        let table = ProfileTable::default();
        let profile = table.resolve("controller").unwrap();
        let mut runner = ScriptedRunner::new(vec![outcome(101, "", "")]);
        let mut evs: Vec<OperationEvent> = Vec::new();

        let err = run_build(Path::new("."), profile, &mut runner, &mut |e| evs.push(e))
            .unwrap_err();

        match err {
            FlashError::BuildFailed { code } => assert_eq!(code, 101),
            other => panic!("expected BuildFailed, got {other:?}"),
        }
        assert!(evs
            .iter()
            .any(|e| matches!(e, OperationEvent::BuildDone { code: 101 })));
    }
}
