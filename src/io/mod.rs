/*
 * Input/Output System
 *
 * Low-level port I/O plumbing (`pio`) plus the in-kernel file layer: the
 * `File`/`FdTable` objects a process owns, and the pure syscall bodies
 * (`syscalls`) that operate on them through the VFS.
 */

pub mod file;
pub mod pio;
pub mod syscalls;

pub use pio::{Io, Pio, ReadOnly};
