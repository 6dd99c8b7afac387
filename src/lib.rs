/*
 * CLUU Microkernel Core
 *
 * The portable kernel core: cooperative scheduler, process/thread lifecycle,
 * VFS name resolution, and the fd/syscall layer, plus the hardware drivers
 * and boot sequence that tie them together. Built `no_std` for the shipped
 * kernel binary (`src/main.rs` is just the BOOTBOOT entry trampoline around
 * this crate's `kstart`); built against host `std` under `cargo test` so
 * the scheduler, VFS, and syscall logic get genuine unit/integration test
 * coverage instead of only being exercised on real hardware.
 */

#![cfg_attr(not(test), no_std)]
#![feature(abi_x86_interrupt)]
#![cfg_attr(not(test), feature(alloc_error_handler))]
#![allow(dead_code)]

extern crate alloc;

pub mod arch;
pub mod bootboot;
pub mod components;
pub mod config;
pub mod drivers;
pub mod errno;
pub mod hal;
pub mod io;
pub mod memory;
pub mod proc;
pub mod sched;
pub mod syscall;
pub mod utils;
pub mod vfs;

/// `idle`'s kernel thread body (pid 0). Never exits, never reaped; once the
/// run queue is otherwise empty `switch()` parks it in `intr_wait` until an
/// interrupt makes something runnable again.
fn idle_entry(_arg1: usize, _arg2: usize) {
    loop {
        sched::switch();
    }
}

/// `init`'s kernel thread body (pid 1). Filesystem mounting already
/// happened in `kstart` before this thread was made runnable; init has no
/// work of its own beyond existing as the reparenting target for orphans,
/// per `proc::proc_cleanup`.
fn init_entry(_arg1: usize, _arg2: usize) {
    loop {
        sched::switch();
    }
}

/// ===============================
///  RUST KERNEL ENTRY POINT
/// ===============================
///
/// Called by `main.rs`'s `_start` trampoline once the BSP is running on its
/// own stack. Never returns.
#[unsafe(no_mangle)]
pub extern "C" fn kstart() -> ! {
    // Step 1: Initialize debug infrastructure first
    utils::debug::init_debug_infrastructure();

    // Step 2: Initialize logging system
    utils::debug::logger::init(true);
    log::info!("CLUU Kernel starting...");

    // Step 3: Initialize GDT (Global Descriptor Table)
    arch::x86_64::gdt::init();

    // Step 3.5: Initialize IDT (Interrupt Descriptor Table)
    // CRITICAL: Must be initialized BEFORE memory management (CR3 switch)
    // If any exception/NMI occurs during CR3 switch and IDT isn't set up,
    // the CPU will triple fault
    arch::x86_64::idt::init();

    // Step 3.6: Initialize SYSCALL/SYSRET mechanism
    syscall::init();

    // Step 4: Initialize memory management
    log::info!("Initializing memory management...");
    unsafe {
        memory::init(core::ptr::addr_of!(bootboot::bootboot));
    }
    log::info!("Memory management initialized successfully");

    // Step 5: Initialize system drivers
    drivers::system::init();
    drivers::display::init();
    drivers::input::init();
    drivers::input::keyboard::init_keyboard();
    utils::io::console::init();
    components::tty::init_tty0();
    log::info!("Hardware drivers initialized");

    // Step 6: Bring up the process/thread subsystems.
    sched::init();
    proc::init();
    log::info!("Process and thread subsystems initialized");

    // Step 7: `bootstrap` creates idle (pid 0) and makes it current. Since
    // idle is the only runnable thread, this `switch()` call dequeues it,
    // records it as `current_thread`, and "switches" straight back into the
    // calling context — this very function is idle's thread from here on.
    proc::bootstrap_create(config::PID_IDLE, "idle", None);
    let idle_tid = proc::thread_create(config::PID_IDLE, idle_entry, 0, 0);
    sched::make_runnable(idle_tid);
    sched::switch();

    // Step 8: idle creates init (pid 1) and mounts the root filesystem,
    // which also populates /dev (null, zero, tty0) via devfs bootstrap.
    proc::bootstrap_create(config::PID_INIT, "init", Some(config::PID_IDLE));
    let root = vfs::mount_root();
    proc::with_process_mut(config::PID_INIT, |p| p.cwd = Some(root));
    log::info!("VFS mounted, /dev populated");

    let init_tid = proc::thread_create(config::PID_INIT, init_entry, 0, 0);
    sched::make_runnable(init_tid);

    // Step 9: Enable interrupts
    x86_64::instructions::interrupts::enable();
    log::info!("Interrupts enabled");

    log::info!("Kernel initialization complete, idle waiting on init");

    // Step 10: idle waits for init. Init never exits under normal
    // operation, so in practice this blocks forever; if init is ever
    // killed (e.g. by a halt syscall's `proc_kill_all`), idle reaps it here.
    match proc::waitpid(-1, 0) {
        Ok((pid, status)) => log::info!("init (pid {}) exited with status {}", pid, status),
        Err(e) => log::error!("idle: waitpid failed: {}", e),
    }

    loop {
        x86_64::instructions::hlt();
    }
}
