//! The thread object the scheduler owns and switches between.

use alloc::vec::Vec;
use core::fmt;

/// Opaque thread identifier. Cheap to copy, used everywhere a back-reference
/// to a thread is needed without granting ownership of it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tid:{}", self.0)
    }
}

/// A thread's scheduling state.
///
/// Only a `Run` thread may ever appear on the run queue; only `Sleep` or
/// `SleepCancellable` threads may appear on a wait queue; `Exited` threads
/// appear on neither and are never selected by `switch`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ThreadState {
    /// Freshly created, not yet made runnable.
    NoState,
    /// Runnable or running.
    Run,
    /// Blocked on a wait queue; immune to `cancel`.
    Sleep,
    /// Blocked on a wait queue; `cancel` unblocks it early with `Interrupted`.
    SleepCancellable,
    /// Finished; awaiting reaping by its parent.
    Exited,
}

pub type ThreadEntry = fn(usize, usize);

/// A kernel thread.
///
/// `process` is a non-owning back-reference (the raw pid, not a handle into
/// `crate::proc`, to keep this module free of a dependency on the process
/// layer — `crate::proc` depends on `crate::sched`, not the reverse).
pub struct Thread {
    pub id: ThreadId,
    pub process: i32,
    pub state: ThreadState,
    /// Level-triggered cancellation flag; see `crate::sched::cancel`.
    pub cancelled: bool,
    pub exit_value: i32,
    /// Which wait queue (if any) this thread is currently parked on.
    /// `Some` iff the thread is actually enqueued there (spec invariant 2).
    pub wait_queue: Option<u64>,
    stack: Vec<u8>,
    entry: ThreadEntry,
    arg1: usize,
    arg2: usize,
}

impl Thread {
    pub fn new(
        id: ThreadId,
        process: i32,
        stack_size: usize,
        entry: ThreadEntry,
        arg1: usize,
        arg2: usize,
    ) -> Self {
        Self {
            id,
            process,
            state: ThreadState::NoState,
            cancelled: false,
            exit_value: 0,
            wait_queue: None,
            stack: alloc::vec![0u8; stack_size],
            entry,
            arg1,
            arg2,
        }
    }

    pub fn entry_point(&self) -> (ThreadEntry, usize, usize) {
        (self.entry, self.arg1, self.arg2)
    }

    pub fn stack_mut(&mut self) -> &mut [u8] {
        &mut self.stack
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("process", &self.process)
            .field("state", &self.state)
            .field("cancelled", &self.cancelled)
            .field("wait_queue", &self.wait_queue)
            .finish()
    }
}
