/*
 * Kernel Utilities and Support Functions
 *
 * This module contains various utility functions, macros, and support
 * code used throughout the kernel. It provides common functionality
 * like logging, text output, and debugging macros.
 *
 * Why this is important:
 * - Provides essential debugging and logging infrastructure
 * - Implements kernel-specific versions of common operations
 * - Enables consistent formatting and output across the kernel
 * - Provides macros for simplified kernel development
 * - Forms the support infrastructure for kernel debugging
 *
 * Key components:
 * - debug: COM2 bring-up and the structured `log` backend
 * - io: serial writer, print!/serial_println! macros, framebuffer console
 * - system: uptime/scheduler-tick tracking, reboot
 * - ui: line editor and kernel shell built on top of the TTY layer
 */

#[macro_use]
pub mod io;
pub mod debug;
pub mod system;
pub mod ui;
