//! Production HAL backend: real IPL masking; `switch_to` is not wired up
//! yet (see its doc comment below — same "placeholder, not yet real"
//! status as `crate::syscall::syscall_entry`).
//!
//! IPL masking is modeled as "interrupts on/off" on this uniprocessor
//! kernel, via the `x86_64` crate (same crate the teacher's GDT/IDT setup
//! already depends on).

use core::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTS_WERE_ENABLED: AtomicBool = AtomicBool::new(true);

pub struct Backend;

impl Backend {
    pub fn raise_ipl() {
        let was_enabled = x86_64::instructions::interrupts::are_enabled();
        INTERRUPTS_WERE_ENABLED.store(was_enabled, Ordering::SeqCst);
        x86_64::instructions::interrupts::disable();
    }

    pub fn restore_ipl() {
        if INTERRUPTS_WERE_ENABLED.load(Ordering::SeqCst) {
            x86_64::instructions::interrupts::enable();
        }
    }
}

impl super::ContextSwitch for Backend {
    fn spawn(_id: usize, stack: &mut [u8], entry: fn()) {
        // Lay down an initial stack frame so the first switch_to lands in
        // `entry`. The real trampoline pushes `entry` as the return address
        // of a synthetic `ret`; this is a placeholder of the same shape.
        let top = stack.len();
        debug_assert!(top >= core::mem::size_of::<usize>());
        let entry_addr = entry as usize;
        let dst = &mut stack[top - core::mem::size_of::<usize>()..top];
        dst.copy_from_slice(&entry_addr.to_ne_bytes());
    }

    fn switch_to(_target: usize) {
        // TODO: not implemented. A real switch needs a naked-function
        // trampoline that saves the caller's callee-saved registers and
        // rsp into a per-thread saved-context slot and loads the target's,
        // in the style of the BOOTBOOT `_start` trampoline in `main.rs` —
        // see the teacher's `scheduler/mod.rs` preemptive/yield interrupt
        // handlers for the push/call/switch-rsp/pop/iretq shape to adapt.
        // Until that lands, this backend cannot actually resume a
        // different kernel thread; only the `park` test backend (which
        // maps kernel threads onto real `std::thread`s) provides real
        // concurrency today.
        unsafe {
            core::arch::asm!("nop", options(nomem, nostack));
        }
    }

    fn intr_wait() {
        x86_64::instructions::hlt();
    }
}
