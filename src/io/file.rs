//! The `File` object (an open instance on a vnode) and the fixed-size
//! per-process file-descriptor table, grounded on `kernel/fs/file.c`'s
//! `file_t`/`fd_table` split, adapted onto `Arc<Vnode>`/`Arc<Mutex<File>>`
//! so `fref`/`fput` fall out of ordinary Rust reference counting instead of
//! hand-maintained counters.

use alloc::sync::Arc;

use bitflags::bitflags;
use spin::Mutex;

use crate::config::NFILES;
use crate::errno::{KernelError, KResult};
use crate::vfs::vnode::Vnode;

bitflags! {
    /// Access mode a `File` was opened with, derived from the syscall's
    /// `oflags` at `open` time.
    pub struct FileMode: u8 {
        const READ = 1;
        const WRITE = 1 << 1;
        const APPEND = 1 << 2;
    }
}

/// An open instance on a vnode: the vnode reference, the current seek
/// position, and the access mode. Shared via `Arc<Mutex<File>>` so `dup`/
/// `dup2` installing the same `File` at two fds is just cloning the `Arc`.
pub struct File {
    vnode: Arc<Vnode>,
    pub f_pos: u64,
    pub mode: FileMode,
}

impl File {
    pub fn new(vnode: Arc<Vnode>, mode: FileMode) -> Self {
        Self { vnode, f_pos: 0, mode }
    }

    pub fn vnode(&self) -> &Arc<Vnode> {
        &self.vnode
    }

    pub fn readable(&self) -> bool {
        self.mode.contains(FileMode::READ)
    }

    pub fn writable(&self) -> bool {
        self.mode.contains(FileMode::WRITE)
    }
}

/// Per-process fixed-length fd -> File mapping. A `None` slot is free.
pub struct FdTable {
    slots: [Option<Arc<Mutex<File>>>; NFILES],
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// `get_empty_fd`: the smallest free index, or `MaxFiles` if none.
    pub fn alloc(&self) -> KResult<usize> {
        self.slots
            .iter()
            .position(Option::is_none)
            .ok_or(KernelError::MaxFiles)
    }

    pub fn get(&self, fd: usize) -> KResult<Arc<Mutex<File>>> {
        self.slots
            .get(fd)
            .and_then(|slot| slot.as_ref())
            .cloned()
            .ok_or(KernelError::BadFd)
    }

    pub fn install(&mut self, fd: usize, file: Arc<Mutex<File>>) -> KResult<()> {
        *self.slots.get_mut(fd).ok_or(KernelError::BadFd)? = Some(file);
        Ok(())
    }

    /// Clear a slot, dropping this process's reference to the shared
    /// `File` (the vnode itself is released once every `Arc<Mutex<File>>`
    /// referencing it is gone).
    pub fn clear(&mut self, fd: usize) {
        self.slots[fd] = None;
    }

    pub fn is_open(&self, fd: usize) -> bool {
        self.slots.get(fd).map(|s| s.is_some()).unwrap_or(false)
    }

    /// Every occupied slot, for `proc_cleanup`'s close-everything pass.
    pub fn occupied_fds(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(fd, slot)| slot.is_some().then_some(fd))
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::vnode::{Vnode, VnodeType};
    use crate::vfs::ramfs::RamFsOps;

    fn dummy_file() -> Arc<Mutex<File>> {
        let ops = RamFsOps::new_file();
        let vn = Vnode::new(VnodeType::Regular, ops);
        Arc::new(Mutex::new(File::new(vn, FileMode::READ)))
    }

    #[test]
    fn alloc_returns_smallest_free_slot() {
        let mut t = FdTable::new();
        assert_eq!(t.alloc().unwrap(), 0);
        t.install(0, dummy_file()).unwrap();
        assert_eq!(t.alloc().unwrap(), 1);
        t.install(2, dummy_file()).unwrap();
        assert_eq!(t.alloc().unwrap(), 1);
    }

    #[test]
    fn clear_frees_the_slot() {
        let mut t = FdTable::new();
        t.install(0, dummy_file()).unwrap();
        assert!(t.is_open(0));
        t.clear(0);
        assert!(!t.is_open(0));
        assert_eq!(t.alloc().unwrap(), 0);
    }

    #[test]
    fn full_table_reports_max_files() {
        let mut t = FdTable::new();
        for fd in 0..NFILES {
            t.install(fd, dummy_file()).unwrap();
        }
        assert_eq!(t.alloc().unwrap_err(), KernelError::MaxFiles);
    }

    #[test]
    fn install_out_of_range_is_badfd() {
        let mut t = FdTable::new();
        assert_eq!(t.install(NFILES, dummy_file()).unwrap_err(), KernelError::BadFd);
    }
}
