//! Kernel-wide tunable constants.
//!
//! Centralizing these avoids the drift the reference implementation had
//! between a literal path-length cap and a `MAXPATHLEN` macro used in
//! different places: every module imports these, none redefines them.

/// Per-process file-descriptor table size.
pub const NFILES: usize = 128;

/// Upper bound on the number of simultaneously live processes.
pub const PROC_MAX_COUNT: usize = 4096;

/// Maximum length of a full pathname passed to a syscall.
pub const MAXPATHLEN: usize = 1024;

/// Maximum length of a single path component.
pub const NAME_LEN: usize = 256;

/// Default kernel stack size allocated for a new thread.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Reserved pid for the idle process. Never exits, never reaped.
pub const PID_IDLE: i32 = 0;

/// Reserved pid for the init process. Reparenting target for orphans.
pub const PID_INIT: i32 = 1;
