//! Sleep-based mutual exclusion built on `WaitQueue`.
//!
//! Unlock does not simply drop the lock for a fresh race: it transfers
//! holdership directly to the next sleeper, so `unlock` followed by another
//! thread's `lock` never sees a window where a third thread could steal it.

use crate::errno::{KernelError, KResult};

use super::core::{current_thread_id, sleep_on, cancellable_sleep_on, wakeup_on};
use super::thread::ThreadId;
use super::wait_queue::WaitQueue;

pub struct Mutex {
    holder: spin::Mutex<Option<ThreadId>>,
    wait: WaitQueue,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            holder: spin::Mutex::new(None),
            wait: WaitQueue::new(),
        }
    }

    fn current(&self) -> ThreadId {
        current_thread_id().expect("mutex: no current thread")
    }

    /// `lock(m)`: block until the calling thread is the holder.
    pub fn lock(&self) {
        loop {
            let mut holder = self.holder.lock();
            if holder.is_none() {
                *holder = Some(self.current());
                return;
            }
            debug_assert_ne!(*holder, Some(self.current()), "mutex: self-deadlock");
            drop(holder);
            sleep_on(self.wait);
            // Woken by `unlock`, which already installed us as holder.
            if self.holder.lock().as_ref() == Some(&self.current()) {
                return;
            }
        }
    }

    /// `lock_cancellable(m)`: as `lock`, but a cancelled sleep returns
    /// `Interrupted` instead of blocking forever.
    pub fn lock_cancellable(&self) -> KResult<()> {
        loop {
            let mut holder = self.holder.lock();
            if holder.is_none() {
                *holder = Some(self.current());
                return Ok(());
            }
            debug_assert_ne!(*holder, Some(self.current()), "mutex: self-deadlock");
            drop(holder);
            match cancellable_sleep_on(self.wait) {
                Ok(()) => {
                    if self.holder.lock().as_ref() == Some(&self.current()) {
                        return Ok(());
                    }
                }
                Err(KernelError::Interrupted) => return Err(KernelError::Interrupted),
                Err(e) => return Err(e),
            }
        }
    }

    /// `unlock(m)`: the caller must be the current holder. Wakes the next
    /// sleeper and transfers holdership to it directly; if nobody is
    /// waiting, the mutex becomes free.
    ///
    /// `holder` is held across both the wakeup and the handoff write, so a
    /// third thread's `lock()` can never observe the mutex as free between
    /// them: it either sees the old holder (and sleeps) or the new one.
    pub fn unlock(&self) {
        let mut holder = self.holder.lock();
        assert_eq!(*holder, Some(self.current()), "mutex: unlock by non-holder");
        *holder = match wakeup_on(self.wait) {
            Some(next) => Some(next),
            None => None,
        };
    }

    pub fn is_locked(&self) -> bool {
        self.holder.lock().is_some()
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
