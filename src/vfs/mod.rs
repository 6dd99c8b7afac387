//! The virtual filesystem layer: vnodes, the `VnodeOps` capability table
//! each driver implements, an in-kernel ramfs driver, `/dev`'s character
//! nodes, and path resolution (`namev`).
//!
//! The teacher's `vfs/mod.rs` forwarded every operation over an IPC port to
//! a userspace VFS server; that message-passing architecture has no
//! counterpart here; everything below runs in kernel context against a
//! driver's `VnodeOps` table directly, the way `kernel/fs/vfs.c` does.

pub mod devfs;
pub mod namev;
pub mod ramfs;
pub mod vnode;

use alloc::sync::Arc;

use spin::Mutex;

use vnode::{Vnode, VnodeType};

static ROOT: Mutex<Option<Arc<Vnode>>> = Mutex::new(None);

/// `root()`: the filesystem root vnode, with an incremented reference the
/// caller owes a `vput`.
pub fn root() -> Arc<Vnode> {
    ROOT.lock()
        .as_ref()
        .map(Arc::clone)
        .expect("vfs: root not mounted")
}

/// Mount the root ramfs and populate `/dev`. Called once during bootstrap,
/// after init is created and its cwd is set to the returned root.
pub fn mount_root() -> Arc<Vnode> {
    let ops = ramfs::RamFsOps::new_dir();
    let root = Vnode::new(VnodeType::Directory, Arc::clone(&ops) as Arc<dyn vnode::VnodeOps>);
    ops.set_parent(&root);
    *ROOT.lock() = Some(Arc::clone(&root));

    devfs::install(&root).expect("vfs: failed to install /dev");

    root
}

#[cfg(test)]
pub(crate) fn reset_for_test() {
    *ROOT.lock() = None;
    mount_root();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_root_installs_dev_nodes() {
        reset_for_test();
        let r = root();
        let dev = r.ops.lookup(&r, "dev").expect("lookup /dev");
        assert!(dev.is_dir());
        let tty0 = dev.ops.lookup(&dev, "tty0").expect("lookup /dev/tty0");
        assert_eq!(tty0.vtype, VnodeType::CharDevice);
    }
}
