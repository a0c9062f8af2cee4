//! Local exit codes. Failures caused by an external tool never use these:
//! the process exits with the tool's own status so callers can interpret
//! it against the tool's semantics.

pub const EXIT_OK: i32 = 0;
pub const EXIT_UNKNOWN_PROJECT: i32 = 10;
pub const EXIT_WAIT_ABORTED: i32 = 11;
pub const EXIT_TOOL_SPAWN: i32 = 20;
