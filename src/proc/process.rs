//! The `Process` object: pid, parent/children edges, its threads, fd
//! table, and cwd. Grounded on `kernel/proc/proc.c`'s `proc_t`, adapted so
//! the back-edges (`parent`) are plain pids rather than raw pointers and
//! the owning edges (`children`, `threads`) are `Vec`s rather than
//! intrusive lists — the scheduler's singleton-owned `BTreeMap` already
//! gives O(log n) lookup by pid, so there is no need to thread the list
//! pointers by hand the way the source does.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::io::file::FdTable;
use crate::sched::{ThreadId, WaitQueue};
use crate::vfs::vnode::Vnode;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcState {
    Running,
    Dead,
}

pub struct Process {
    pub pid: i32,
    pub name: String,
    pub parent: Option<i32>,
    pub children: Vec<i32>,
    pub threads: Vec<ThreadId>,
    /// Where a thread in this process blocks inside `waitpid`.
    pub wait_queue: WaitQueue,
    pub state: ProcState,
    pub exit_status: i32,
    pub files: FdTable,
    pub cwd: Option<Arc<Vnode>>,
}

impl Process {
    pub fn new(pid: i32, name: &str, parent: Option<i32>, cwd: Option<Arc<Vnode>>) -> Self {
        Self {
            pid,
            name: String::from(name),
            parent,
            children: Vec::new(),
            threads: Vec::new(),
            wait_queue: WaitQueue::new(),
            state: ProcState::Running,
            exit_status: 0,
            files: FdTable::new(),
            cwd,
        }
    }
}
