//! Test-only HAL backend.
//!
//! `cargo test` has no real interrupts and no real kernel stacks to swap.
//! Instead every kernel thread the tests create maps onto a real
//! `std::thread`; "switching into" a thread means unparking its OS thread
//! and parking the caller's, via a `Condvar`. This gives scheduler and
//! mutex tests genuine concurrent interleavings (two real threads racing on
//! a wait queue) rather than a single-threaded simulation of one.
//!
//! IPL masking is a no-op here: nothing in the test harness runs on an
//! interrupt context, so there is nothing to mask.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex as StdMutex};

struct ParkHandle {
    ready: StdMutex<bool>,
    cv: Condvar,
}

impl ParkHandle {
    fn new() -> Self {
        Self {
            ready: StdMutex::new(false),
            cv: Condvar::new(),
        }
    }

    fn park(&self) {
        let mut ready = self.ready.lock().unwrap();
        while !*ready {
            ready = self.cv.wait(ready).unwrap();
        }
        *ready = false;
    }

    fn unpark(&self) {
        let mut ready = self.ready.lock().unwrap();
        *ready = true;
        self.cv.notify_one();
    }
}

lazy_static::lazy_static! {
    static ref REGISTRY: StdMutex<BTreeMap<usize, Arc<ParkHandle>>> = StdMutex::new(BTreeMap::new());
}

thread_local! {
    static CURRENT_ID: Cell<Option<usize>> = Cell::new(None);
}

fn handle_for(id: usize) -> Arc<ParkHandle> {
    REGISTRY
        .lock()
        .unwrap()
        .entry(id)
        .or_insert_with(|| Arc::new(ParkHandle::new()))
        .clone()
}

pub struct Backend;

impl Backend {
    pub fn raise_ipl() {}
    pub fn restore_ipl() {}

    /// Must be called once at the top of every `std::thread` body that
    /// stands in for a kernel thread, so `switch_to` knows who is calling.
    pub fn register_current(id: usize) {
        CURRENT_ID.with(|c| c.set(Some(id)));
        handle_for(id);
    }

    /// Which kernel thread id the calling OS thread stands in for, if any.
    ///
    /// Real hardware has exactly one current thread because there is
    /// exactly one execution stream; the test harness has one OS thread per
    /// kernel thread instead, so "current" has to be read off thread-local
    /// storage rather than a single scheduler-wide field.
    pub fn current_id() -> Option<usize> {
        CURRENT_ID.with(|c| c.get())
    }

    /// Park the calling thread until some other thread calls `unpark` on its
    /// id. Used by the test-mode `switch()`, which has no run queue of
    /// other OS threads to dispatch to — every kernel thread is already a
    /// live OS thread, so blocking just means parking this one.
    pub fn park_self() {
        let id = Self::current_id().expect("park_self: thread not registered");
        handle_for(id).park();
    }

    /// Wake a specific parked thread by id.
    pub fn unpark(id: usize) {
        handle_for(id).unpark();
    }
}

impl super::ContextSwitch for Backend {
    fn spawn(id: usize, _stack: &mut [u8], _entry: fn()) {
        handle_for(id);
    }

    fn switch_to(target: usize) {
        handle_for(target).unpark();

        if let Some(id) = CURRENT_ID.with(|c| c.get()) {
            if id != target {
                handle_for(id).park();
            }
        }
    }

    fn intr_wait() {
        std::thread::yield_now();
    }
}
