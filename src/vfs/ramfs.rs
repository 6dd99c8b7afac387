//! An in-memory filesystem driver: directories are name -> vnode maps, files
//! are byte vectors. This is the root filesystem the kernel boots onto and
//! the driver `/dev` itself uses for its own directory structure (the
//! device nodes it contains use `devfs::ops_for` instead).
//!
//! Grounded on `kernel/fs/ramfs/ramfs_inode.c` / `ramfs_vnode.c` for the
//! shape (a driver that is just an in-memory name table), adapted to the
//! `VnodeOps` trait instead of a C `vnode_ops_t` struct of function
//! pointers. `lookup`'s special-casing of `.` and `..` mirrors `namev.c`'s
//! `lookup()`, which defers both to the driver's own `lookup` rather than
//! handling them generically — here that means each directory keeps a weak
//! back-reference to its parent.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;

use spin::Mutex;

use crate::errno::{KernelError, KResult};

use super::vnode::{Vnode, VnodeOps, VnodeType};

enum Entry {
    Dir {
        children: Mutex<BTreeMap<String, Arc<Vnode>>>,
        parent: Mutex<Option<Weak<Vnode>>>,
    },
    File(Mutex<Vec<u8>>),
}

/// One ramfs node's backing storage. Each `Vnode` using `RamFsOps` owns an
/// `Arc<RamFsOps>` of its own (unlike a stateless driver, ramfs state is
/// per-node, so "the driver" and "the node's storage" coincide here).
pub struct RamFsOps {
    entry: Entry,
}

impl RamFsOps {
    pub fn new_dir() -> Arc<Self> {
        Arc::new(Self {
            entry: Entry::Dir {
                children: Mutex::new(BTreeMap::new()),
                parent: Mutex::new(None),
            },
        })
    }

    pub fn new_file() -> Arc<Self> {
        Arc::new(Self {
            entry: Entry::File(Mutex::new(Vec::new())),
        })
    }

    /// Record `self`'s parent directory, so a later `lookup(.., "..")`
    /// resolves to it. Root directories are their own parent.
    pub fn set_parent(&self, parent: &Arc<Vnode>) {
        if let Entry::Dir { parent: p, .. } = &self.entry {
            *p.lock() = Some(Arc::downgrade(parent));
        }
    }

    fn children(&self) -> KResult<&Mutex<BTreeMap<String, Arc<Vnode>>>> {
        match &self.entry {
            Entry::Dir { children, .. } => Ok(children),
            Entry::File(_) => Err(KernelError::NotDir),
        }
    }

    fn file(&self) -> KResult<&Mutex<Vec<u8>>> {
        match &self.entry {
            Entry::File(f) => Ok(f),
            Entry::Dir { .. } => Err(KernelError::IsDir),
        }
    }
}

fn insert_child(dir_ops: &RamFsOps, name: &str, vnode: Arc<Vnode>) -> KResult<()> {
    let children = dir_ops.children()?;
    let mut entries = children.lock();
    if entries.contains_key(name) {
        return Err(KernelError::Exists);
    }
    entries.insert(name.to_string(), vnode);
    Ok(())
}

impl VnodeOps for RamFsOps {
    fn lookup(&self, dir: &Arc<Vnode>, name: &str) -> KResult<Arc<Vnode>> {
        if name == "." {
            return Ok(Arc::clone(dir));
        }
        if let Entry::Dir { children, parent } = &self.entry {
            if name == ".." {
                return Ok(parent
                    .lock()
                    .as_ref()
                    .and_then(Weak::upgrade)
                    .unwrap_or_else(|| Arc::clone(dir)));
            }
            children.lock().get(name).map(Arc::clone).ok_or(KernelError::NoEntry)
        } else {
            Err(KernelError::NotDir)
        }
    }

    fn create(&self, _dir: &Arc<Vnode>, name: &str) -> KResult<Arc<Vnode>> {
        let child = Vnode::new(VnodeType::Regular, RamFsOps::new_file());
        insert_child(self, name, Arc::clone(&child))?;
        Ok(child)
    }

    fn mkdir(&self, dir: &Arc<Vnode>, name: &str) -> KResult<()> {
        let child_ops = RamFsOps::new_dir();
        let child = Vnode::new(VnodeType::Directory, Arc::clone(&child_ops) as Arc<dyn VnodeOps>);
        child_ops.set_parent(dir);
        insert_child(self, name, child)
    }

    fn mknod(&self, _dir: &Arc<Vnode>, name: &str, vtype: VnodeType, major: u32, minor: u32) -> KResult<()> {
        let child = Vnode::new(vtype, super::devfs::ops_for(major, minor));
        insert_child(self, name, child)
    }

    fn unlink(&self, _dir: &Arc<Vnode>, name: &str) -> KResult<()> {
        let children = self.children()?;
        let mut entries = children.lock();
        match entries.get(name) {
            Some(v) if v.is_dir() => Err(KernelError::IsDir),
            Some(_) => {
                entries.remove(name);
                Ok(())
            }
            None => Err(KernelError::NoEntry),
        }
    }

    fn rmdir(&self, _dir: &Arc<Vnode>, name: &str) -> KResult<()> {
        let children = self.children()?;
        let mut entries = children.lock();
        match entries.get(name) {
            None => Err(KernelError::NoEntry),
            Some(v) if !v.is_dir() => Err(KernelError::NotDir),
            Some(v) => {
                let empty = v.ops.readdir(v, 0).map(|r| r.is_none()).unwrap_or(true);
                if !empty {
                    return Err(KernelError::NotEmpty);
                }
                entries.remove(name);
                Ok(())
            }
        }
    }

    fn link(&self, _dir: &Arc<Vnode>, name: &str, target: &Arc<Vnode>) -> KResult<()> {
        if target.is_dir() {
            return Err(KernelError::IsDir);
        }
        insert_child(self, name, Arc::clone(target))
    }

    fn readdir(&self, _dir: &Arc<Vnode>, offset: u64) -> KResult<Option<(String, u64)>> {
        let children = self.children()?;
        let entries = children.lock();
        Ok(entries
            .keys()
            .nth(offset as usize)
            .map(|name| (name.clone(), offset + 1)))
    }

    fn read(&self, _node: &Arc<Vnode>, offset: u64, buf: &mut [u8]) -> KResult<usize> {
        let file = self.file()?;
        let data = file.lock();
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(0);
        }
        let n = (data.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write(&self, _node: &Arc<Vnode>, offset: u64, buf: &[u8]) -> KResult<usize> {
        let file = self.file()?;
        let mut data = file.lock();
        let offset = offset as usize;
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn stat(&self, node: &Vnode) -> super::vnode::Stat {
        let size = match &self.entry {
            Entry::File(f) => f.lock().len() as u64,
            Entry::Dir { children, .. } => children.lock().len() as u64,
        };
        super::vnode::Stat {
            st_mode: super::vnode::mode_for(node.vtype) | 0o755,
            st_size: size,
            st_nlink: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_root() -> Arc<Vnode> {
        let ops = RamFsOps::new_dir();
        let root = Vnode::new(VnodeType::Directory, Arc::clone(&ops) as Arc<dyn VnodeOps>);
        ops.set_parent(&root);
        root
    }

    #[test]
    fn dot_and_dotdot_resolve_without_allocating_entries() {
        let root = new_root();
        root.ops.mkdir(&root, "a").unwrap();
        let a = root.ops.lookup(&root, "a").unwrap();

        let dot = a.ops.lookup(&a, ".").unwrap();
        assert!(Arc::ptr_eq(&dot, &a));

        let dotdot = a.ops.lookup(&a, "..").unwrap();
        assert!(Arc::ptr_eq(&dotdot, &root));

        let root_dotdot = root.ops.lookup(&root, "..").unwrap();
        assert!(Arc::ptr_eq(&root_dotdot, &root));
    }

    #[test]
    fn mkdir_rejects_duplicate_names() {
        let root = new_root();
        root.ops.mkdir(&root, "a").unwrap();
        assert_eq!(root.ops.mkdir(&root, "a").unwrap_err(), KernelError::Exists);
    }

    #[test]
    fn rmdir_requires_empty_directory() {
        let root = new_root();
        root.ops.mkdir(&root, "a").unwrap();
        let a = root.ops.lookup(&root, "a").unwrap();
        a.ops.mkdir(&a, "b").unwrap();
        assert_eq!(root.ops.rmdir(&root, "a").unwrap_err(), KernelError::NotEmpty);
        a.ops.rmdir(&a, "b").unwrap();
        root.ops.rmdir(&root, "a").unwrap();
        assert_eq!(root.ops.lookup(&root, "a").unwrap_err(), KernelError::NoEntry);
    }

    #[test]
    fn file_read_write_round_trip_at_offset() {
        let root = new_root();
        let f = root.ops.create(&root, "f").unwrap();
        f.ops.write(&f, 0, b"hello").unwrap();
        f.ops.write(&f, 5, b" world").unwrap();
        let mut buf = [0u8; 11];
        let n = f.ops.read(&f, 0, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello world");
    }
}
