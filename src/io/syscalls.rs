//! Pure syscall bodies: `open`, `read`, `write`, `close`, `dup`, `dup2`,
//! `mknod`, `mkdir`, `rmdir`, `unlink`, `link`, `rename`, `chdir`,
//! `getdents`, `lseek`, `stat`, `waitpid`, `exit`.
//!
//! Grounded on `kernel/fs/open.c` / `kernel/fs/vfs_syscall.c`. Every
//! function here takes an explicit `pid` rather than reaching for an
//! ambient `curproc`, so the thin `arch`-level dispatcher in
//! `crate::syscall` is the only place that resolves "current" before
//! calling in; that keeps this module callable from tests without a live
//! thread context.
//!
//! Refcount bookkeeping the source hand-rolls (`fref`/`fput`, `vref`/
//! `vput`) is just `Arc`/`Drop` here, so the "never leak a reference on an
//! error path" requirement is structural rather than something every
//! function has to get right by hand: an `Arc<Mutex<File>>` that is never
//! installed in a fd slot, or a vnode that is never stored anywhere, is
//! simply dropped at the end of the function's scope.

use alloc::string::String;
use alloc::sync::Arc;

use spin::Mutex;

use crate::errno::{KernelError, KResult};
use crate::proc;
use crate::vfs::namev::{dir_namev, open_namev};
use crate::vfs::vnode::{VnodeType, Stat, SEEK_CUR, SEEK_END, SEEK_SET};

use super::file::{File, FileMode};

bitflags::bitflags! {
    /// `oflags` as handed to `open`.
    pub struct OFlags: u32 {
        const RDONLY = 0;
        const WRONLY = 1;
        const RDWR = 1 << 1;
        const CREAT = 1 << 2;
        const APPEND = 1 << 3;
    }
}

fn cwd_of(pid: i32) -> KResult<Arc<crate::vfs::vnode::Vnode>> {
    proc::with_process(pid, |p| p.cwd.clone())
        .flatten()
        .ok_or(KernelError::NoEntry)
}

fn mode_from_oflags(oflags: OFlags) -> FileMode {
    let mut mode = FileMode::empty();
    if !oflags.contains(OFlags::WRONLY) {
        mode |= FileMode::READ;
    }
    if oflags.contains(OFlags::WRONLY) || oflags.contains(OFlags::RDWR) {
        mode |= FileMode::WRITE;
    }
    if oflags.contains(OFlags::APPEND) {
        mode |= FileMode::APPEND;
    }
    mode
}

pub fn sys_open(pid: i32, path: &str, oflags: OFlags) -> KResult<usize> {
    let cwd = cwd_of(pid)?;
    let fd = proc::with_process(pid, |p| p.files.alloc())
        .ok_or(KernelError::BadFd)??;

    let vn = open_namev(path, oflags.contains(OFlags::CREAT), &cwd)?;
    if vn.is_dir() && (oflags.contains(OFlags::WRONLY) || oflags.contains(OFlags::RDWR)) {
        return Err(KernelError::IsDir);
    }

    let mode = mode_from_oflags(oflags);
    let file = Arc::new(Mutex::new(File::new(vn, mode)));
    proc::with_process_mut(pid, |p| p.files.install(fd, file)).ok_or(KernelError::BadFd)??;
    Ok(fd)
}

fn fget(pid: i32, fd: usize) -> KResult<Arc<Mutex<File>>> {
    proc::with_process(pid, |p| p.files.get(fd))
        .ok_or(KernelError::BadFd)?
}

pub fn sys_read(pid: i32, fd: usize, buf: &mut [u8]) -> KResult<usize> {
    let file = fget(pid, fd)?;
    let mut f = file.lock();
    if f.vnode().is_dir() {
        return Err(KernelError::IsDir);
    }
    if !f.readable() {
        return Err(KernelError::BadFd);
    }
    let n = f.vnode().ops.read(f.vnode(), f.f_pos, buf)?;
    f.f_pos += n as u64;
    Ok(n)
}

pub fn sys_write(pid: i32, fd: usize, buf: &[u8]) -> KResult<usize> {
    let file = fget(pid, fd)?;
    let mut f = file.lock();
    if f.vnode().is_dir() {
        return Err(KernelError::IsDir);
    }
    if !f.writable() {
        return Err(KernelError::BadFd);
    }
    if f.mode.contains(FileMode::APPEND) {
        f.f_pos = f.vnode().stat().st_size;
    }
    let n = f.vnode().ops.write(f.vnode(), f.f_pos, buf)?;
    f.f_pos += n as u64;
    Ok(n)
}

pub fn sys_close(pid: i32, fd: usize) -> KResult<()> {
    proc::with_process(pid, |p| p.files.get(fd)).ok_or(KernelError::BadFd)??;
    proc::with_process_mut(pid, |p| p.files.clear(fd)).ok_or(KernelError::BadFd)
}

pub fn sys_dup(pid: i32, fd: usize) -> KResult<usize> {
    let file = fget(pid, fd)?;
    let new_fd = proc::with_process(pid, |p| p.files.alloc()).ok_or(KernelError::BadFd)??;
    proc::with_process_mut(pid, |p| p.files.install(new_fd, file)).ok_or(KernelError::BadFd)??;
    Ok(new_fd)
}

pub fn sys_dup2(pid: i32, ofd: usize, nfd: usize) -> KResult<usize> {
    if nfd >= crate::config::NFILES {
        return Err(KernelError::BadFd);
    }
    let file = fget(pid, ofd)?;
    if ofd == nfd {
        return Ok(nfd);
    }
    if proc::with_process(pid, |p| p.files.is_open(nfd)).ok_or(KernelError::BadFd)? {
        proc::with_process_mut(pid, |p| p.files.clear(nfd));
    }
    proc::with_process_mut(pid, |p| p.files.install(nfd, file)).ok_or(KernelError::BadFd)??;
    Ok(nfd)
}

pub fn sys_mknod(pid: i32, path: &str, vtype: VnodeType, major: u32, minor: u32) -> KResult<()> {
    if !matches!(vtype, VnodeType::CharDevice | VnodeType::BlockDevice) {
        return Err(KernelError::Invalid);
    }
    let cwd = cwd_of(pid)?;
    let (parent, name) = dir_namev(path, &cwd)?;
    if parent.ops.lookup(&parent, &name).is_ok() {
        return Err(KernelError::Exists);
    }
    parent.ops.mknod(&parent, &name, vtype, major, minor)
}

pub fn sys_mkdir(pid: i32, path: &str) -> KResult<()> {
    let cwd = cwd_of(pid)?;
    let (parent, name) = dir_namev(path, &cwd)?;
    parent.ops.mkdir(&parent, &name)
}

pub fn sys_rmdir(pid: i32, path: &str) -> KResult<()> {
    let cwd = cwd_of(pid)?;
    let (parent, name) = dir_namev(path, &cwd)?;
    if name == "." {
        return Err(KernelError::Invalid);
    }
    if name == ".." {
        return Err(KernelError::NotEmpty);
    }
    parent.ops.rmdir(&parent, &name)
}

pub fn sys_unlink(pid: i32, path: &str) -> KResult<()> {
    let cwd = cwd_of(pid)?;
    let (parent, name) = dir_namev(path, &cwd)?;
    parent.ops.unlink(&parent, &name)
}

pub fn sys_link(pid: i32, from: &str, to: &str) -> KResult<()> {
    let cwd = cwd_of(pid)?;
    let target = open_namev(from, false, &cwd)?;
    let (parent, name) = dir_namev(to, &cwd)?;
    if parent.ops.lookup(&parent, &name).is_ok() {
        return Err(KernelError::Exists);
    }
    parent.ops.link(&parent, &name, &target)
}

/// `rename` is implemented as `link` + `unlink(old)`, preserving the
/// source's non-atomicity: a failed `unlink` after a successful `link`
/// is not rolled back (flagged, not fixed, per the design notes).
pub fn sys_rename(pid: i32, old: &str, new: &str) -> KResult<()> {
    sys_link(pid, old, new)?;
    sys_unlink(pid, old)
}

pub fn sys_chdir(pid: i32, path: &str) -> KResult<()> {
    let cwd = cwd_of(pid)?;
    let vn = open_namev(path, false, &cwd)?;
    if !vn.is_dir() {
        return Err(KernelError::NotDir);
    }
    proc::with_process_mut(pid, |p| p.cwd = Some(vn)).ok_or(KernelError::NoEntry)
}

pub fn sys_getdents(pid: i32, fd: usize) -> KResult<Option<String>> {
    let file = fget(pid, fd)?;
    let mut f = file.lock();
    if !f.vnode().is_dir() {
        return Err(KernelError::NotDir);
    }
    match f.vnode().ops.readdir(f.vnode(), f.f_pos)? {
        Some((name, next_offset)) => {
            f.f_pos = next_offset;
            Ok(Some(name))
        }
        None => Ok(None),
    }
}

pub fn sys_lseek(pid: i32, fd: usize, offset: i64, whence: i32) -> KResult<u64> {
    let file = fget(pid, fd)?;
    let mut f = file.lock();
    let base: i64 = match whence {
        SEEK_SET => 0,
        SEEK_CUR => f.f_pos as i64,
        SEEK_END => f.vnode().stat().st_size as i64,
        _ => return Err(KernelError::Invalid),
    };
    let new_pos = base + offset;
    if new_pos < 0 {
        return Err(KernelError::Invalid);
    }
    f.f_pos = new_pos as u64;
    Ok(f.f_pos)
}

pub fn sys_stat(pid: i32, path: &str) -> KResult<Stat> {
    let cwd = cwd_of(pid)?;
    let vn = open_namev(path, false, &cwd)?;
    Ok(vn.stat())
}

pub fn sys_waitpid(pid: i32, target: i32, options: i32) -> KResult<(i32, i32)> {
    let _ = pid;
    proc::waitpid(target, options)
}

pub fn sys_exit(status: i32) -> ! {
    proc::exit_current_thread(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PID_INIT;

    fn boot() -> i32 {
        crate::sched::reset_for_test();
        crate::vfs::reset_for_test();
        proc::init();
        proc::bootstrap_create(crate::config::PID_IDLE, "idle", None);
        proc::bootstrap_create(PID_INIT, "init", Some(crate::config::PID_IDLE));
        let root = crate::vfs::root();
        proc::with_process_mut(PID_INIT, |p| p.cwd = Some(root));
        let tid = proc::thread_create(PID_INIT, |_, _| {}, 0, 0);
        crate::hal::HalBackend::register_current(tid.0 as usize);
        PID_INIT
    }

    #[test]
    fn open_write_seek_read_round_trip() {
        let pid = boot();
        let fd = sys_open(pid, "/x", OFlags::RDWR | OFlags::CREAT).unwrap();
        assert_eq!(sys_write(pid, fd, b"abc").unwrap(), 3);
        assert_eq!(sys_lseek(pid, fd, 0, SEEK_SET).unwrap(), 0);
        let mut buf = [0u8; 3];
        assert_eq!(sys_read(pid, fd, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn dup2_shares_the_underlying_file() {
        let pid = boot();
        let fd1 = sys_open(pid, "/a", OFlags::RDWR | OFlags::CREAT).unwrap();
        let fd5 = 5;
        sys_dup2(pid, fd1, fd5).unwrap();
        sys_close(pid, fd1).unwrap();
        assert_eq!(sys_write(pid, fd5, b"y").unwrap(), 1);

        let fd_check = sys_open(pid, "/a", OFlags::RDONLY).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(sys_read(pid, fd_check, &mut buf).unwrap(), 1);
        assert_eq!(&buf, b"y");
    }

    #[test]
    fn read_on_write_only_fd_is_badfd() {
        let pid = boot();
        let fd = sys_open(pid, "/w", OFlags::WRONLY | OFlags::CREAT).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(sys_read(pid, fd, &mut buf).unwrap_err(), KernelError::BadFd);
    }

    #[test]
    fn open_wronly_on_directory_is_isdir() {
        let pid = boot();
        sys_mkdir(pid, "/d").unwrap();
        assert_eq!(sys_open(pid, "/d", OFlags::WRONLY).unwrap_err(), KernelError::IsDir);
    }

    #[test]
    fn lseek_negative_is_invalid() {
        let pid = boot();
        let fd = sys_open(pid, "/n", OFlags::RDWR | OFlags::CREAT).unwrap();
        assert_eq!(sys_lseek(pid, fd, -1, SEEK_SET).unwrap_err(), KernelError::Invalid);
    }

    #[test]
    fn rmdir_dot_is_invalid_dotdot_is_notempty() {
        let pid = boot();
        sys_mkdir(pid, "/d").unwrap();
        sys_chdir(pid, "/d").unwrap();
        assert_eq!(sys_rmdir(pid, ".").unwrap_err(), KernelError::Invalid);
        assert_eq!(sys_rmdir(pid, "..").unwrap_err(), KernelError::NotEmpty);
    }

    #[test]
    fn link_then_unlink_both_removes_the_file() {
        let pid = boot();
        sys_open(pid, "/a", OFlags::RDWR | OFlags::CREAT).unwrap();
        sys_link(pid, "/a", "/b").unwrap();
        sys_unlink(pid, "/a").unwrap();
        sys_unlink(pid, "/b").unwrap();
        assert_eq!(sys_stat(pid, "/b").unwrap_err(), KernelError::NoEntry);
    }

    #[test]
    fn open_missing_file_without_creat_is_noentry() {
        let pid = boot();
        assert_eq!(sys_open(pid, "/missing", OFlags::RDONLY).unwrap_err(), KernelError::NoEntry);
    }

    #[test]
    fn stat_reports_directory_mode() {
        let pid = boot();
        let st = sys_stat(pid, "/dev").unwrap();
        assert_eq!(st.st_mode & crate::vfs::vnode::S_IFMT, crate::vfs::vnode::S_IFDIR);
    }

    #[test]
    fn mknod_block_device_reports_block_mode() {
        let pid = boot();
        sys_mknod(pid, "/disk0", VnodeType::BlockDevice, 8, 0).unwrap();
        let st = sys_stat(pid, "/disk0").unwrap();
        assert_eq!(st.st_mode & crate::vfs::vnode::S_IFMT, crate::vfs::vnode::S_IFBLK);
    }

    #[test]
    fn mknod_rejects_non_device_types() {
        let pid = boot();
        assert_eq!(
            sys_mknod(pid, "/x", VnodeType::Regular, 0, 0).unwrap_err(),
            KernelError::Invalid
        );
    }

    #[test]
    fn dup2_rejects_out_of_range_target() {
        let pid = boot();
        let fd = sys_open(pid, "/a", OFlags::RDWR | OFlags::CREAT).unwrap();
        assert_eq!(
            sys_dup2(pid, fd, crate::config::NFILES).unwrap_err(),
            KernelError::BadFd
        );
    }
}
