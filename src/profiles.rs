use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Which subset of the standard library `cargo` rebuilds for the target.
///
/// The atmega328p firmware is `core`-only; the atmega8u2 USB firmware also
/// needs an allocator. This is a per-profile property, never a global one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStd {
    Core,
    CoreAlloc,
}

impl BuildStd {
    /// Value for the `CARGO_UNSTABLE_BUILD_STD` environment override.
    pub fn as_env(&self) -> &'static str {
        match self {
            BuildStd::Core => "core",
            BuildStd::CoreAlloc => "core,alloc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectProfile {
    pub id: String,
    /// Repository-relative directory holding the firmware crate.
    pub dir: String,
    pub mcu: String,
    /// Custom target spec JSON inside the project directory.
    pub target_spec: String,
    /// File name of the ELF cargo produces for this profile.
    pub artifact: String,
    pub build_std: BuildStd,
}

impl ProjectProfile {
    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dir).join("Cargo.toml")
    }

    pub fn target_spec_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dir).join(&self.target_spec)
    }

    /// Where cargo leaves the ELF. The directory is keyed by the MCU (the
    /// target spec name), not the project: two projects sharing an MCU
    /// family share the layout.
    pub fn artifact_path(&self, root: &Path) -> PathBuf {
        root.join(&self.dir)
            .join("target")
            .join(format!("avr-{}", self.mcu))
            .join("release")
            .join(&self.artifact)
    }
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("unknown project: {project}")]
    Unknown { project: String },
}

/// Lookup table from project id to its microcontroller profile.
///
/// Resolution happens before any subprocess spawns; an unknown id is a
/// configuration error, not something the pipeline recovers from.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: Vec<ProjectProfile>,
}

/// Project id of the USB interface chip firmware (DFU commands operate on
/// this profile implicitly).
pub const USB_INTERFACE_PROJECT: &str = "usb-interface";

impl Default for ProfileTable {
    fn default() -> Self {
        Self {
            profiles: vec![
                ProjectProfile {
                    id: "controller".to_string(),
                    dir: "controller".to_string(),
                    mcu: "atmega328p".to_string(),
                    target_spec: "avr-atmega328p.json".to_string(),
                    artifact: "gamepad-controller.elf".to_string(),
                    build_std: BuildStd::Core,
                },
                ProjectProfile {
                    id: USB_INTERFACE_PROJECT.to_string(),
                    dir: "usb-interface".to_string(),
                    mcu: "atmega8u2".to_string(),
                    target_spec: "avr-atmega8u2.json".to_string(),
                    artifact: "gamepad-usb.elf".to_string(),
                    build_std: BuildStd::CoreAlloc,
                },
            ],
        }
    }
}

impl ProfileTable {
    pub fn new(profiles: Vec<ProjectProfile>) -> Self {
        Self { profiles }
    }

    pub fn resolve(&self, project: &str) -> Result<&ProjectProfile, ProfileError> {
        self.profiles
            .iter()
            .find(|p| p.id == project)
            .ok_or_else(|| ProfileError::Unknown {
                project: project.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectProfile> {
        self.profiles.iter()
    }
}
