//! The vnode: a filesystem-driver-agnostic handle to a file, directory, or
//! device node, plus the `VnodeOps` capability table each driver fills in.
//!
//! Grounded on `kernel/fs/vnode.c`'s vnode/vnode_ops split and on the
//! `Device` trait in `io/device.rs` (same "small trait, default methods
//! return the obvious error" shape, generalized from "TTY or nothing" to
//! "whatever a filesystem driver implements").
//!
//! Refcounting: the original tracks `vn_refcount` by hand and requires the
//! caller to `vref`/`vput` at the right points. Here a vnode reference *is*
//! an `Arc<Vnode>`, so `Arc::clone`/`drop` already implement `vref`/`vput`;
//! the named wrappers below exist only to keep call sites readable against
//! the vocabulary the rest of this module uses.

use alloc::string::String;
use alloc::sync::Arc;

use crate::errno::KResult;

/// File type, mirroring the `S_IF*` family `io/device.rs` already uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeType {
    Directory,
    Regular,
    CharDevice,
    BlockDevice,
}

pub const S_IFMT: u32 = 0o170000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFBLK: u32 = 0o060000;

pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Stat {
    pub st_mode: u32,
    pub st_size: u64,
    pub st_nlink: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
}

#[inline]
pub fn mode_for(vtype: VnodeType) -> u32 {
    match vtype {
        VnodeType::Directory => S_IFDIR,
        VnodeType::Regular => S_IFREG,
        VnodeType::CharDevice => S_IFCHR,
        VnodeType::BlockDevice => S_IFBLK,
    }
}

/// The capability table a filesystem (or device) driver fills in.
///
/// Default methods return the error a node of the "wrong" type should give
/// a caller that tried the wrong operation on it (e.g. `read` on a
/// directory), exactly as `Device::seek`'s default returns `ESPIPE`.
pub trait VnodeOps: Send + Sync {
    fn lookup(&self, _dir: &Arc<Vnode>, _name: &str) -> KResult<Arc<Vnode>> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn create(&self, _dir: &Arc<Vnode>, _name: &str) -> KResult<Arc<Vnode>> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn mkdir(&self, _dir: &Arc<Vnode>, _name: &str) -> KResult<()> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn mknod(&self, _dir: &Arc<Vnode>, _name: &str, _vtype: VnodeType, _major: u32, _minor: u32) -> KResult<()> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn unlink(&self, _dir: &Arc<Vnode>, _name: &str) -> KResult<()> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn rmdir(&self, _dir: &Arc<Vnode>, _name: &str) -> KResult<()> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn link(&self, _dir: &Arc<Vnode>, _name: &str, _target: &Arc<Vnode>) -> KResult<()> {
        Err(crate::errno::KernelError::NotDir)
    }

    /// One directory entry at a byte offset, and the offset of the entry
    /// that follows it (so `getdents` can resume a partial read).
    fn readdir(&self, _dir: &Arc<Vnode>, _offset: u64) -> KResult<Option<(String, u64)>> {
        Err(crate::errno::KernelError::NotDir)
    }

    fn read(&self, _node: &Arc<Vnode>, _offset: u64, _buf: &mut [u8]) -> KResult<usize> {
        Err(crate::errno::KernelError::IsDir)
    }

    fn write(&self, _node: &Arc<Vnode>, _offset: u64, _buf: &[u8]) -> KResult<usize> {
        Err(crate::errno::KernelError::IsDir)
    }

    fn stat(&self, node: &Vnode) -> Stat {
        Stat {
            st_mode: mode_for(node.vtype) | 0o644,
            ..Default::default()
        }
    }
}

/// A vnode: filesystem-agnostic identity plus the driver that knows how to
/// act on it. Interior state (directory entries, file bytes, device
/// registers) lives behind `ops`, not here — `Vnode` itself is immutable
/// once created.
pub struct Vnode {
    pub vtype: VnodeType,
    pub ops: Arc<dyn VnodeOps>,
}

impl Vnode {
    pub fn new(vtype: VnodeType, ops: Arc<dyn VnodeOps>) -> Arc<Self> {
        Arc::new(Self { vtype, ops })
    }

    pub fn is_dir(&self) -> bool {
        self.vtype == VnodeType::Directory
    }

    pub fn stat(&self) -> Stat {
        self.ops.stat(self)
    }
}

/// `vref(vn)`: take another reference. Named for readability at call sites
/// that are explicitly balancing a `vput` the way the original does.
pub fn vref(vn: &Arc<Vnode>) -> Arc<Vnode> {
    Arc::clone(vn)
}

/// `vput(vn)`: release a reference.
pub fn vput(vn: Arc<Vnode>) {
    drop(vn);
}
