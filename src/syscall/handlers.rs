/*
 * System Call Handlers
 *
 * Validates arguments arriving from userspace, then calls straight into
 * crate::io::syscalls / crate::proc for the real work. Every handler
 * converts a KernelError into its negative errno at the boundary — this is
 * the only layer that deals in raw `isize`; everything below returns a
 * tagged Result.
 */

use alloc::string::String;

use crate::errno::KernelError;
use crate::io::syscalls::{self, OFlags};
use crate::proc;
use crate::vfs::vnode::VnodeType;

const EFAULT: isize = 14;

fn validate_user_ptr<T>(ptr: *const T, count: usize) -> Result<(), isize> {
    let addr = ptr as usize;

    if addr == 0 {
        return Err(-EFAULT);
    }
    if addr >= 0x0000_8000_0000_0000 {
        return Err(-EFAULT);
    }
    if addr.checked_add(count * core::mem::size_of::<T>()).is_none() {
        return Err(-EFAULT);
    }
    Ok(())
}

/// Copy a path string out of user memory. Unsafe because it trusts the
/// caller's `(ptr, len)` to describe a live, readable byte range; callers
/// must run it through `validate_user_ptr` first.
unsafe fn read_user_str(ptr: *const u8, len: usize) -> Result<String, isize> {
    validate_user_ptr(ptr, len)?;
    let bytes = unsafe { core::slice::from_raw_parts(ptr, len) };
    core::str::from_utf8(bytes)
        .map(String::from)
        .map_err(|_| -EFAULT)
}

fn to_isize<T>(r: Result<T, KernelError>, ok: impl FnOnce(T) -> isize) -> isize {
    match r {
        Ok(v) => ok(v),
        Err(e) => e.to_errno() as isize,
    }
}

pub fn sys_open(path: *const u8, path_len: usize, oflags: u32) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    let oflags = OFlags::from_bits_truncate(oflags);
    to_isize(syscalls::sys_open(proc::current_pid(), &path, oflags), |fd| fd as isize)
}

pub fn sys_read(fd: i32, buf: *mut u8, count: usize) -> isize {
    if let Err(e) = validate_user_ptr(buf, count) {
        return e;
    }
    let slice = unsafe { core::slice::from_raw_parts_mut(buf, count) };
    to_isize(syscalls::sys_read(proc::current_pid(), fd as usize, slice), |n| n as isize)
}

pub fn sys_write(fd: i32, buf: *const u8, count: usize) -> isize {
    if let Err(e) = validate_user_ptr(buf, count) {
        return e;
    }
    let slice = unsafe { core::slice::from_raw_parts(buf, count) };
    to_isize(syscalls::sys_write(proc::current_pid(), fd as usize, slice), |n| n as isize)
}

pub fn sys_close(fd: i32) -> isize {
    to_isize(syscalls::sys_close(proc::current_pid(), fd as usize), |_| 0)
}

pub fn sys_dup(fd: i32) -> isize {
    to_isize(syscalls::sys_dup(proc::current_pid(), fd as usize), |fd| fd as isize)
}

pub fn sys_dup2(ofd: i32, nfd: i32) -> isize {
    to_isize(
        syscalls::sys_dup2(proc::current_pid(), ofd as usize, nfd as usize),
        |fd| fd as isize,
    )
}

/// `kind`: 0 = character device, 1 = block device (matches the `S_IFCHR`/
/// `S_IFBLK` distinction `sys_mknod` validates against).
pub fn sys_mknod(path: *const u8, path_len: usize, major: u32, minor: u32, kind: u32) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    let vtype = match kind {
        0 => VnodeType::CharDevice,
        1 => VnodeType::BlockDevice,
        _ => return KernelError::Invalid.to_errno() as isize,
    };
    to_isize(syscalls::sys_mknod(proc::current_pid(), &path, vtype, major, minor), |_| 0)
}

pub fn sys_mkdir(path: *const u8, path_len: usize) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    to_isize(syscalls::sys_mkdir(proc::current_pid(), &path), |_| 0)
}

pub fn sys_rmdir(path: *const u8, path_len: usize) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    to_isize(syscalls::sys_rmdir(proc::current_pid(), &path), |_| 0)
}

pub fn sys_unlink(path: *const u8, path_len: usize) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    to_isize(syscalls::sys_unlink(proc::current_pid(), &path), |_| 0)
}

pub fn sys_link(from: *const u8, from_len: usize, to: *const u8, to_len: usize) -> isize {
    let from = match unsafe { read_user_str(from, from_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    let to = match unsafe { read_user_str(to, to_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    to_isize(syscalls::sys_link(proc::current_pid(), &from, &to), |_| 0)
}

pub fn sys_rename(old: *const u8, old_len: usize, new: *const u8, new_len: usize) -> isize {
    let old = match unsafe { read_user_str(old, old_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    let new = match unsafe { read_user_str(new, new_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    to_isize(syscalls::sys_rename(proc::current_pid(), &old, &new), |_| 0)
}

pub fn sys_chdir(path: *const u8, path_len: usize) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    to_isize(syscalls::sys_chdir(proc::current_pid(), &path), |_| 0)
}

pub fn sys_getdents(fd: i32, buf: *mut u8, buf_len: usize) -> isize {
    if let Err(e) = validate_user_ptr(buf, buf_len) {
        return e;
    }
    to_isize(syscalls::sys_getdents(proc::current_pid(), fd as usize), |entry| match entry {
        Some(name) => {
            let bytes = name.as_bytes();
            let n = bytes.len().min(buf_len);
            let slice = unsafe { core::slice::from_raw_parts_mut(buf, buf_len) };
            slice[..n].copy_from_slice(&bytes[..n]);
            n as isize
        }
        None => 0,
    })
}

pub fn sys_lseek(fd: i32, offset: i64, whence: i32) -> isize {
    to_isize(syscalls::sys_lseek(proc::current_pid(), fd as usize, offset, whence), |pos| {
        pos as isize
    })
}

pub fn sys_stat(path: *const u8, path_len: usize, statbuf: *mut u8) -> isize {
    let path = match unsafe { read_user_str(path, path_len) } {
        Ok(p) => p,
        Err(e) => return e,
    };
    if let Err(e) = validate_user_ptr(statbuf, core::mem::size_of::<crate::vfs::vnode::Stat>()) {
        return e;
    }
    to_isize(syscalls::sys_stat(proc::current_pid(), &path), |stat| {
        unsafe { core::ptr::write(statbuf as *mut crate::vfs::vnode::Stat, stat) };
        0
    })
}

pub fn sys_waitpid(target: i32, status: *mut i32, options: i32) -> isize {
    if !status.is_null() {
        if let Err(e) = validate_user_ptr(status, 1) {
            return e;
        }
    }
    to_isize(syscalls::sys_waitpid(proc::current_pid(), target, options), |(pid, code)| {
        if !status.is_null() {
            unsafe { core::ptr::write(status, code) };
        }
        pid as isize
    })
}

pub fn sys_exit(status: i32) -> ! {
    syscalls::sys_exit(status)
}
