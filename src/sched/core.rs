//! The scheduler singleton: run queue, wait queues, and `switch()`.
//!
//! Follows the teacher's singleton-access idiom throughout: a single
//! `spin::Mutex<Option<Scheduler>>`, accessed only through `with_scheduler`/
//! `with_scheduler_mut` closures, exactly as `scheduler/scheduler.rs` and
//! `scheduler/process.rs` do for their own singleton.

use alloc::collections::{BTreeMap, VecDeque};
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::errno::{KernelError, KResult};
use crate::hal::{self, ContextSwitch, HalBackend};

use super::thread::{Thread, ThreadEntry, ThreadId, ThreadState};
use super::wait_queue::WaitQueue;

struct Scheduler {
    threads: BTreeMap<ThreadId, Thread>,
    run_queue: VecDeque<ThreadId>,
    wait_queues: BTreeMap<u64, VecDeque<ThreadId>>,
    current: Option<ThreadId>,
    next_tid: u64,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            threads: BTreeMap::new(),
            run_queue: VecDeque::new(),
            wait_queues: BTreeMap::new(),
            current: None,
            next_tid: 0,
        }
    }
}

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);
static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Bring up the scheduler singleton. Must run once, before any thread is
/// created.
pub fn init() {
    let mut guard = SCHEDULER.lock();
    *guard = Some(Scheduler::new());
}

fn with_scheduler<R>(f: impl FnOnce(&Scheduler) -> R) -> R {
    let guard = SCHEDULER.lock();
    f(guard.as_ref().expect("scheduler: not initialized"))
}

fn with_scheduler_mut<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let mut guard = SCHEDULER.lock();
    f(guard.as_mut().expect("scheduler: not initialized"))
}

pub(crate) fn alloc_wait_queue() -> WaitQueue {
    let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
    with_scheduler_mut(|s| s.wait_queues.insert(id, VecDeque::new()));
    WaitQueue(id)
}

pub(crate) fn queue_len(q: WaitQueue) -> usize {
    with_scheduler(|s| s.wait_queues.get(&q.0).map(|dq| dq.len()).unwrap_or(0))
}

/// Create a new thread attached to process `pid`, in state `NoState`.
///
/// Mirrors `thread_create(p, entry, arg1, arg2)`: the thread is fully
/// initialized but not placed on the run queue; the caller decides when to
/// `make_runnable` it.
pub fn thread_create(pid: i32, entry: ThreadEntry, arg1: usize, arg2: usize) -> ThreadId {
    with_scheduler_mut(|s| {
        s.next_tid += 1;
        let tid = ThreadId(s.next_tid);
        let mut thread = Thread::new(tid, pid, crate::config::DEFAULT_STACK_SIZE, entry, arg1, arg2);
        thread.state = ThreadState::NoState;
        HalBackend::spawn(tid.0 as usize, thread.stack_mut(), || {});
        s.threads.insert(tid, thread);
        tid
    })
}

/// `make_runnable(thr)`: move a thread to `Run` and enqueue it on the run
/// queue.
pub fn make_runnable(tid: ThreadId) {
    let _ipl = hal::mask_interrupts();
    with_scheduler_mut(|s| {
        if let Some(t) = s.threads.get_mut(&tid) {
            t.state = ThreadState::Run;
        }
        s.run_queue.push_back(tid);
    });
}

/// The currently running thread, or `None` outside thread context.
///
/// On real hardware there is exactly one execution stream, so the
/// scheduler's own `current` bookkeeping (set by `switch`'s dispatch loop)
/// is authoritative. The test backend instead maps each kernel thread onto
/// a real `std::thread`, so "current" has to be asked of the calling OS
/// thread directly (see `hal::park`), not read off shared scheduler state.
#[cfg(not(test))]
pub fn current_thread_id() -> Option<ThreadId> {
    with_scheduler(|s| s.current)
}

#[cfg(test)]
pub fn current_thread_id() -> Option<ThreadId> {
    HalBackend::current_id().map(|id| ThreadId(id as u64))
}

pub fn exit_value(tid: ThreadId) -> Option<i32> {
    with_scheduler(|s| s.threads.get(&tid).map(|t| t.exit_value))
}

pub fn thread_process(tid: ThreadId) -> Option<i32> {
    with_scheduler(|s| s.threads.get(&tid).map(|t| t.process))
}

pub fn thread_state(tid: ThreadId) -> Option<ThreadState> {
    with_scheduler(|s| s.threads.get(&tid).map(|t| t.state))
}

/// Mark the current thread `Exited` with the given retval. Does not switch
/// away; the caller (`crate::proc::thread_exit`) does that after cleanup.
pub fn mark_current_exited(retval: i32) -> ThreadId {
    let tid = current_thread_id().expect("mark_current_exited: no current thread");
    with_scheduler_mut(|s| {
        let t = s.threads.get_mut(&tid).expect("mark_current_exited: unknown thread");
        t.state = ThreadState::Exited;
        t.exit_value = retval;
    });
    tid
}

/// Set a thread's exit value in place, without touching its state or queue
/// membership. Used by `proc::thread_cancel` when the target is not the
/// current thread and is not `SleepCancellable`: `cancel` already latches
/// the cancellation flag and moves a `SleepCancellable` sleeper to the run
/// queue; a `Sleep` or `Run` target just needs its retval recorded ahead of
/// the voluntary checkpoint where it will notice `cancelled`.
pub fn set_exit_value(tid: ThreadId, retval: i32) {
    with_scheduler_mut(|s| {
        if let Some(t) = s.threads.get_mut(&tid) {
            t.exit_value = retval;
        }
    });
}

/// Mark `tid` `Exited` in place, without enqueuing it anywhere or invoking
/// `switch`. Used only by `proc_kill_all` at halt time, which picks init's
/// thread as the next to run and transfers to it directly rather than
/// going through normal run-queue dispatch.
pub fn force_exit(tid: ThreadId) {
    with_scheduler_mut(|s| {
        if let Some(t) = s.threads.get_mut(&tid) {
            t.state = ThreadState::Exited;
        }
    });
}

/// Drop a thread's storage entirely. Only valid once `Exited` and unlinked
/// from every queue; called by the reaping parent.
pub fn destroy_thread(tid: ThreadId) {
    with_scheduler_mut(|s| {
        s.threads.remove(&tid);
    });
}

/// `sleep_on(q)`: park the current thread on `q` and switch away. Returns
/// once some other thread calls `wakeup_on`/`broadcast_on` on `q`.
pub fn sleep_on(q: WaitQueue) {
    let tid = current_thread_id().expect("sleep_on: no current thread");
    {
        let _ipl = hal::mask_interrupts();
        with_scheduler_mut(|s| {
            let t = s.threads.get_mut(&tid).expect("sleep_on: unknown thread");
            t.state = ThreadState::Sleep;
            t.wait_queue = Some(q.0);
            s.wait_queues.entry(q.0).or_default().push_back(tid);
        });
    }
    switch();
}

/// `cancellable_sleep_on(q)`: as `sleep_on`, but observes the cancellation
/// flag both before blocking and after waking.
pub fn cancellable_sleep_on(q: WaitQueue) -> KResult<()> {
    let tid = current_thread_id().expect("cancellable_sleep_on: no current thread");

    let already_cancelled = {
        let _ipl = hal::mask_interrupts();
        with_scheduler(|s| s.threads.get(&tid).map(|t| t.cancelled).unwrap_or(false))
    };
    if already_cancelled {
        return Err(KernelError::Interrupted);
    }

    {
        let _ipl = hal::mask_interrupts();
        with_scheduler_mut(|s| {
            let t = s.threads.get_mut(&tid).expect("cancellable_sleep_on: unknown thread");
            t.state = ThreadState::SleepCancellable;
            t.wait_queue = Some(q.0);
            s.wait_queues.entry(q.0).or_default().push_back(tid);
        });
    }
    switch();

    let cancelled = with_scheduler(|s| s.threads.get(&tid).map(|t| t.cancelled).unwrap_or(false));
    if cancelled {
        Err(KernelError::Interrupted)
    } else {
        Ok(())
    }
}

/// `wakeup_on(q)`: dequeue at most one sleeper, move it to `Run`, enqueue
/// it on the run queue.
pub fn wakeup_on(q: WaitQueue) -> Option<ThreadId> {
    let _ipl = hal::mask_interrupts();
    let woken = with_scheduler_mut(|s| {
        let tid = s.wait_queues.get_mut(&q.0)?.pop_front()?;
        let t = s.threads.get_mut(&tid).expect("wakeup_on: unknown thread");
        assert!(
            matches!(t.state, ThreadState::Sleep | ThreadState::SleepCancellable),
            "wakeup_on: woken thread was not sleeping"
        );
        t.state = ThreadState::Run;
        t.wait_queue = None;
        s.run_queue.push_back(tid);
        Some(tid)
    });
    #[cfg(test)]
    if let Some(tid) = woken {
        HalBackend::unpark(tid.0 as usize);
    }
    woken
}

/// `broadcast_on(q)`: wake every sleeper on `q`.
pub fn broadcast_on(q: WaitQueue) {
    while wakeup_on(q).is_some() {}
}

/// `cancel(thr)`: latch the cancellation flag; if `thr` is `SleepCancellable`
/// also move it straight to the run queue so it observes the flag promptly.
pub fn cancel(tid: ThreadId) {
    let _ipl = hal::mask_interrupts();
    let woken = with_scheduler_mut(|s| {
        let (was_cancellable, queue) = {
            let t = s.threads.get_mut(&tid).expect("cancel: unknown thread");
            t.cancelled = true;
            (t.state == ThreadState::SleepCancellable, t.wait_queue)
        };
        if was_cancellable {
            if let Some(qid) = queue {
                if let Some(dq) = s.wait_queues.get_mut(&qid) {
                    if let Some(pos) = dq.iter().position(|&t| t == tid) {
                        dq.remove(pos);
                    }
                }
            }
            let t = s.threads.get_mut(&tid).unwrap();
            t.state = ThreadState::Run;
            t.wait_queue = None;
            s.run_queue.push_back(tid);
            true
        } else {
            false
        }
    });
    #[cfg(test)]
    if woken {
        HalBackend::unpark(tid.0 as usize);
    }
    #[cfg(not(test))]
    let _ = woken;
}

/// `switch()`: dequeue the next runnable thread and transfer control to it.
/// Never returns until the caller has been chosen again. If the run queue
/// is empty, halts (via `intr_wait`) until an interrupt makes something
/// runnable, then retries.
///
/// Mirrors `sched_switch`'s own post-resume check: whichever thread is
/// chosen next, if its cancellation flag is set it exits right here rather
/// than returning to whatever was waiting on the sleep (`kthread_cancel`
/// only delivers `-EINTR` to a sleeper that was cancelled *before* it
/// blocked; once actually asleep, `cancel` marks it runnable and this check
/// forces the exit on the way back in).
#[cfg(not(test))]
pub fn switch() {
    loop {
        let next = {
            let _ipl = hal::mask_interrupts();
            with_scheduler_mut(|s| {
                while let Some(tid) = s.run_queue.pop_front() {
                    let runnable = s
                        .threads
                        .get(&tid)
                        .map(|t| t.state != ThreadState::Exited)
                        .unwrap_or(false);
                    if runnable {
                        s.current = Some(tid);
                        if let Some(t) = s.threads.get_mut(&tid) {
                            t.state = ThreadState::Run;
                        }
                        return Some(tid);
                    }
                }
                None
            })
        };

        match next {
            Some(tid) => {
                HalBackend::switch_to(tid.0 as usize);
                // Execution resumes here once `tid` is selected again.
                let cancelled =
                    with_scheduler(|s| s.threads.get(&tid).map(|t| t.cancelled).unwrap_or(false));
                if cancelled {
                    crate::proc::exit_current_thread(0);
                }
                return;
            }
            None => HalBackend::intr_wait(),
        }
    }
}

/// Test-backend `switch()`: every kernel thread is already a live OS
/// thread, so there is no separate thread to dispatch to. Blocking reduces
/// to parking the calling OS thread until `wakeup_on`/`broadcast_on`/
/// `cancel` unparks it by id.
#[cfg(test)]
pub fn switch() {
    let tid = current_thread_id().expect("switch: no current thread");
    HalBackend::park_self();
    let cancelled = with_scheduler(|s| s.threads.get(&tid).map(|t| t.cancelled).unwrap_or(false));
    if cancelled {
        crate::proc::exit_current_thread(0);
    }
}

#[cfg(test)]
pub(crate) fn reset_for_test() {
    let mut guard = SCHEDULER.lock();
    *guard = Some(Scheduler::new());
}
