use std::path::PathBuf;

/// Observable steps of the build/flash pipelines. Consumers receive these
/// through `FnMut(OperationEvent)` callbacks; the library itself never
/// prints.
#[derive(Debug, Clone)]
pub enum OperationEvent {
    BuildStart {
        project: String,
        mcu: String,
    },
    BuildDone {
        code: i32,
    },

    /// Entering the DFU wait loop; `marker` is the vendor:product pair we
    /// scan enumeration output for.
    WaitStart {
        marker: String,
    },
    /// The enumeration tool itself failed this cycle. Non-fatal, the loop
    /// keeps polling.
    EnumerationFailed {
        error: String,
    },
    /// One poll cycle completed without seeing the marker.
    WaitPoll {
        polls: u32,
    },
    BootloaderDetected {
        polls: u32,
    },

    ConvertStart {
        source: PathBuf,
        dest: PathBuf,
    },

    EraseStart,
    /// Erase reported the "already blank" status; treated as success.
    EraseAlreadyBlank {
        code: i32,
    },
    EraseDone,

    FlashStart {
        image: PathBuf,
    },
    /// Captured programmer stdout after a successful write.
    ProgrammerOutput {
        text: String,
    },
    Done {
        /// True when the device must be unplugged/replugged to leave the
        /// bootloader and run the new firmware.
        replug: bool,
    },
}
