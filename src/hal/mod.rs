//! Hardware-abstraction seam for the scheduler.
//!
//! Everything else in this crate is portable Rust; the one place the core
//! cannot avoid a real machine is raising/lowering interrupt priority level
//! around a critical section, and performing the actual register/stack swap
//! inside `switch()`. Both are gathered here behind `Ipl` and
//! `ContextSwitch` so the scheduler logic in [`crate::sched`] never depends
//! on which backend is linked in.
//!
//! Production builds use the `x86_64` backend; `cargo test` builds use the
//! `park` backend, which represents each kernel thread as a real
//! `std::thread` so scheduler/mutex tests exercise genuine concurrent
//! interleavings (spec scenarios: cancellable sleep, mutex holder-transfer)
//! instead of a single-threaded simulation.

#[cfg(not(test))]
mod x86_64_backend;
#[cfg(test)]
mod park;

#[cfg(not(test))]
pub use x86_64_backend::Backend;
#[cfg(test)]
pub use park::Backend;

/// RAII guard restoring the saved interrupt priority level on drop.
///
/// Every run-queue and wait-queue mutation happens while one of these is
/// held, mirroring `apic_getipl`/`apic_setipl` in the external-interfaces
/// contract. The guard must be held across a sleep; the backend is
/// responsible for making that safe (on x86_64 this just means `switch()`
/// restores IPL on the far side of the context swap; the test backend is a
/// no-op since `cargo test` never runs with real interrupts).
pub struct IplGuard {
    _private: (),
}

/// Raise IPL to mask interrupts, returning a guard that restores it.
pub fn mask_interrupts() -> IplGuard {
    Backend::raise_ipl();
    IplGuard { _private: () }
}

impl Drop for IplGuard {
    fn drop(&mut self) {
        Backend::restore_ipl();
    }
}

/// The mechanism half of `switch()`: actually transfer control to another
/// kernel thread's saved context and return only once this thread has been
/// chosen to run again.
///
/// The test backend additionally exposes `current_id`/`park_self`/`unpark`
/// as inherent methods (not part of this trait, since the production
/// backend has no use for them: on real hardware there is exactly one
/// execution stream, so `switch()` can dispatch directly via `switch_to`
/// rather than parking/unparking distinct OS threads).
pub trait ContextSwitch {
    /// One-time per-thread setup: arrange that the first switch into this
    /// thread begins executing `entry` with the stack it was given.
    fn spawn(id: usize, stack: &mut [u8], entry: fn());

    /// Block the calling thread and resume `target`. Does not return until
    /// the calling thread is switched back in.
    fn switch_to(target: usize);

    /// Park the calling thread waiting for the next interrupt (used only
    /// when the run queue is empty).
    fn intr_wait();
}

pub use Backend as HalBackend;
