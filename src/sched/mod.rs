//! Cooperative, single-CPU kernel scheduler: run queue, wait queues,
//! sleep/wake/cancel, and the mutex built on top of them.
//!
//! Non-goals carried over unchanged from the distilled spec: no
//! multi-CPU scheduling, no preemption inside kernel mode, no priority
//! scheduling. There is exactly one run queue and it is FIFO.

mod core;
mod mutex;
mod thread;
mod wait_queue;

pub use self::core::{
    broadcast_on, cancel, cancellable_sleep_on, current_thread_id, destroy_thread, exit_value,
    force_exit, init, make_runnable, mark_current_exited, set_exit_value, sleep_on, switch,
    thread_create, thread_process, thread_state, wakeup_on,
};
pub use mutex::Mutex;
pub use thread::{Thread, ThreadEntry, ThreadId, ThreadState};
pub use wait_queue::{queue_empty, queue_init, WaitQueue};

#[cfg(test)]
pub(crate) use self::core::reset_for_test;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    fn boot_test_scheduler() {
        reset_for_test();
    }

    #[test]
    fn wait_queue_is_fifo() {
        boot_test_scheduler();
        let q = queue_init();
        assert!(queue_empty(q));
    }

    #[test]
    fn mutex_contention_transfers_holder_without_race() {
        boot_test_scheduler();
        let m = Arc::new(Mutex::new());
        let barrier = Arc::new(Barrier::new(2));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let pid_a = -1;
        let pid_b = -2;

        let t1 = thread_create(pid_a, |_, _| {}, 0, 0);
        let t2 = thread_create(pid_b, |_, _| {}, 0, 0);

        let m1 = m.clone();
        let b1 = barrier.clone();
        let o1 = order.clone();
        let h1 = std::thread::spawn(move || {
            crate::hal::HalBackend::register_current(t1.0 as usize);
            m1.lock();
            o1.lock().unwrap().push(1);
            b1.wait();
            // Give t2 a chance to actually block on the mutex before we unlock.
            std::thread::sleep(std::time::Duration::from_millis(20));
            m1.unlock();
        });

        let m2 = m.clone();
        let b2 = barrier.clone();
        let o2 = order.clone();
        let h2 = std::thread::spawn(move || {
            crate::hal::HalBackend::register_current(t2.0 as usize);
            b2.wait();
            m2.lock();
            o2.lock().unwrap().push(2);
            m2.unlock();
        });

        h1.join().unwrap();
        h2.join().unwrap();

        assert_eq!(*order.lock().unwrap(), alloc::vec![1, 2]);
    }

    /// `kthread_cancel` only delivers `-EINTR` to a thread that was already
    /// cancelled *before* it attempts to sleep; cancelling a thread that is
    /// already blocked instead wakes it straight into `exit_current_thread`
    /// (exercised once `crate::proc` exists, not here).
    #[test]
    fn cancellable_sleep_on_rejects_an_already_cancelled_thread() {
        boot_test_scheduler();
        let q = queue_init();
        let t2 = thread_create(-3, |_, _| {}, 0, 0);
        cancel(t2);
        assert_eq!(thread_state(t2), Some(ThreadState::NoState));

        let result = Arc::new(std::sync::Mutex::new(None));
        let result2 = result.clone();
        let h = std::thread::spawn(move || {
            crate::hal::HalBackend::register_current(t2.0 as usize);
            let r = cancellable_sleep_on(q);
            *result2.lock().unwrap() = Some(r);
        });

        h.join().unwrap();
        assert_eq!(*result.lock().unwrap(), Some(Err(crate::errno::KernelError::Interrupted)));
        assert!(queue_empty(q));
    }
}
