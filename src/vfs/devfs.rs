//! Character-device nodes: `/dev/null`, `/dev/zero`, `/dev/tty0`.
//!
//! These are the three nodes the bootstrap sequence `mknod`s, matching
//! `kernel/fs/dev*` and the major/minor pairs `kernel/drivers/dev.c`
//! assigns them (1,0 / 1,1 / 2,0). The TTY node wraps the real hardware
//! TTY layer in `crate::components::tty` rather than modeling a fake one.

use alloc::sync::Arc;

use crate::errno::{KernelError, KResult};

use super::vnode::{Vnode, VnodeOps, VnodeType};

pub const MAJOR_MEM: u32 = 1;
pub const MINOR_NULL: u32 = 0;
pub const MINOR_ZERO: u32 = 1;

pub const MAJOR_TTY: u32 = 2;
pub const MINOR_TTY0: u32 = 0;

struct NullOps;
struct ZeroOps;
struct TtyOps {
    id: u8,
}

impl VnodeOps for NullOps {
    fn read(&self, _node: &Arc<Vnode>, _offset: u64, _buf: &mut [u8]) -> KResult<usize> {
        Ok(0)
    }

    fn write(&self, _node: &Arc<Vnode>, _offset: u64, buf: &[u8]) -> KResult<usize> {
        Ok(buf.len())
    }
}

impl VnodeOps for ZeroOps {
    fn read(&self, _node: &Arc<Vnode>, _offset: u64, buf: &mut [u8]) -> KResult<usize> {
        buf.fill(0);
        Ok(buf.len())
    }

    fn write(&self, _node: &Arc<Vnode>, _offset: u64, buf: &[u8]) -> KResult<usize> {
        Ok(buf.len())
    }
}

impl VnodeOps for TtyOps {
    /// Input is delivered to the TTY layer by the keyboard interrupt
    /// handler, not synchronously here; a `read` on the console device
    /// with nothing buffered simply reports EOF-for-now rather than
    /// blocking, since line discipline is owned by `components::tty`.
    fn read(&self, _node: &Arc<Vnode>, _offset: u64, _buf: &mut [u8]) -> KResult<usize> {
        if self.id == 0 {
            Ok(0)
        } else {
            Err(KernelError::NoDevice)
        }
    }

    fn write(&self, _node: &Arc<Vnode>, _offset: u64, buf: &[u8]) -> KResult<usize> {
        if self.id != 0 {
            return Err(KernelError::NoDevice);
        }
        let text = core::str::from_utf8(buf).unwrap_or("\u{FFFD}");
        crate::components::tty::tty0_write_str(text);
        Ok(buf.len())
    }
}

/// Resolve the driver for a `(major, minor)` pair, as `mknod` would.
pub fn ops_for(major: u32, minor: u32) -> Arc<dyn VnodeOps> {
    match (major, minor) {
        (MAJOR_MEM, MINOR_NULL) => Arc::new(NullOps),
        (MAJOR_MEM, MINOR_ZERO) => Arc::new(ZeroOps),
        (MAJOR_TTY, id) => Arc::new(TtyOps { id: id as u8 }),
        _ => Arc::new(NullOps),
    }
}

/// Bootstrap helper: create `/dev` under `root` and populate it with
/// `null`, `zero`, and `tty0`, exactly as the bootstrap sequence does via
/// three `mknod` calls.
pub fn install(root: &Arc<Vnode>) -> KResult<()> {
    root.ops.mkdir(root, "dev")?;
    let dev = root.ops.lookup(root, "dev")?;
    dev.ops.mknod(&dev, "null", VnodeType::CharDevice, MAJOR_MEM, MINOR_NULL)?;
    dev.ops.mknod(&dev, "zero", VnodeType::CharDevice, MAJOR_MEM, MINOR_ZERO)?;
    dev.ops.mknod(&dev, "tty0", VnodeType::CharDevice, MAJOR_TTY, MINOR_TTY0)?;
    Ok(())
}
