//! Tagged kernel error kind, shared by the scheduler, process, VFS, and
//! syscall layers, with a lossless mapping onto the negative POSIX `errno`
//! values syscalls hand back to userspace.

use core::fmt;

/// Every failure mode the kernel core can produce.
///
/// Scheduler and mutex primitives have exactly one failure mode
/// (`Interrupted`, via cancellation); everything else here belongs to the
/// VFS / fd / process layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Bad file descriptor: out of range, or the slot is empty, or the
    /// requested access mode doesn't match how the fd was opened.
    BadFd,
    /// Process already has `NFILES` descriptors open.
    MaxFiles,
    /// Kernel memory allocation failed.
    OutOfMemory,
    /// A pathname or a path component exceeded its length cap.
    NameTooLong,
    /// No such file or directory.
    NoEntry,
    /// Operation not valid on a directory.
    IsDir,
    /// Operation requires a directory; target is not one.
    NotDir,
    /// Target already exists.
    Exists,
    /// Directory is not empty.
    NotEmpty,
    /// Argument invalid for this operation.
    Invalid,
    /// No such child process (`waitpid` target).
    NoChild,
    /// A cancellable sleep was interrupted by `cancel`.
    Interrupted,
    /// No device backs this special file.
    NoDevice,
}

impl KernelError {
    /// Negative POSIX `errno` value, as returned by a syscall on failure.
    pub fn to_errno(self) -> i32 {
        -match self {
            KernelError::BadFd => 9,        // EBADF
            KernelError::MaxFiles => 24,    // EMFILE
            KernelError::OutOfMemory => 12, // ENOMEM
            KernelError::NameTooLong => 36, // ENAMETOOLONG
            KernelError::NoEntry => 2,      // ENOENT
            KernelError::IsDir => 21,       // EISDIR
            KernelError::NotDir => 20,      // ENOTDIR
            KernelError::Exists => 17,      // EEXIST
            KernelError::NotEmpty => 39,    // ENOTEMPTY
            KernelError::Invalid => 22,     // EINVAL
            KernelError::NoChild => 10,     // ECHILD
            KernelError::Interrupted => 4,  // EINTR
            KernelError::NoDevice => 6,     // ENXIO
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::BadFd => "bad file descriptor",
            KernelError::MaxFiles => "too many open files",
            KernelError::OutOfMemory => "out of memory",
            KernelError::NameTooLong => "name too long",
            KernelError::NoEntry => "no such file or directory",
            KernelError::IsDir => "is a directory",
            KernelError::NotDir => "not a directory",
            KernelError::Exists => "file exists",
            KernelError::NotEmpty => "directory not empty",
            KernelError::Invalid => "invalid argument",
            KernelError::NoChild => "no child processes",
            KernelError::Interrupted => "interrupted",
            KernelError::NoDevice => "no such device",
        };
        f.write_str(msg)
    }
}

pub type KResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_values_are_negative_and_distinct() {
        let kinds = [
            KernelError::BadFd,
            KernelError::MaxFiles,
            KernelError::OutOfMemory,
            KernelError::NameTooLong,
            KernelError::NoEntry,
            KernelError::IsDir,
            KernelError::NotDir,
            KernelError::Exists,
            KernelError::NotEmpty,
            KernelError::Invalid,
            KernelError::NoChild,
            KernelError::Interrupted,
            KernelError::NoDevice,
        ];
        for k in kinds {
            assert!(k.to_errno() < 0);
        }
        assert_eq!(KernelError::BadFd.to_errno(), -9);
        assert_eq!(KernelError::NoEntry.to_errno(), -2);
    }
}
