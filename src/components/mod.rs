/*
 * Kernel Components
 *
 * Higher-level subsystems built on top of the raw drivers: the TTY line
 * discipline sitting on the framebuffer console and keyboard.
 */

pub mod tty;
