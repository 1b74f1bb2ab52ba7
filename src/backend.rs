//! Pluggable I/O backend capability trait.
//!
//! The original gated PLFS, FUSE-chunker, tape, and synthetic-data paths
//! behind `#ifdef` feature families selected at compile time. Here each is a
//! backend behind one small trait, selected at startup by configuration
//! (`PathItem::ftype`/`desttype`) rather than by build flag.

use crate::error::PfError;
use crate::path_item::{FileType, StatInfo};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Which concrete backend a `PathItem`'s `ftype` selects. Stands in for the
/// original's compile-time `#ifdef` family selection; a real deployment
/// dispatches on this to pick a PLFS/FUSE-chunker/tape/synth backend, all
/// implementing [`IoBackend`]. This crate ships only [`PosixBackend`], which
/// `kind_of` routes `Regular`, `Link`, and `Dir` to.
pub fn kind_of(ftype: FileType) -> FileType {
    ftype
}

pub trait IoBackend: Send + Sync {
    type Handle;

    fn open_read(&self, path: &Path) -> Result<Self::Handle, PfError>;
    fn open_write(&self, path: &Path, flags: OpenFlags) -> Result<Self::Handle, PfError>;
    fn read_at(&self, handle: &mut Self::Handle, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, PfError>;
    fn write_at(&self, handle: &mut Self::Handle, path: &Path, offset: u64, buf: &[u8]) -> Result<usize, PfError>;
    fn close(&self, handle: Self::Handle) -> Result<(), PfError>;
    fn stat(&self, path: &Path) -> Result<StatInfo, PfError>;
    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), PfError>;
    fn chmod(&self, path: &Path, mode: u32) -> Result<(), PfError>;
    fn utime(&self, path: &Path, atime: i64, mtime: i64) -> Result<(), PfError>;
}

/// Destination open-flag selection, spec.md §4.5 step 5.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenFlags {
    pub concurrent_write: bool,
}

/// Default POSIX backend, the only one this crate ships a concrete
/// implementation of. PLFS/FUSE-chunker/tape/synth-data backends are external
/// collaborators implementing the same trait (spec.md §1).
pub struct PosixBackend;

impl IoBackend for PosixBackend {
    type Handle = File;

    fn open_read(&self, path: &Path) -> Result<File, PfError> {
        File::open(path).map_err(|source| PfError::Io { path: path.to_path_buf(), source })
    }

    fn open_write(&self, path: &Path, _flags: OpenFlags) -> Result<File, PfError> {
        use std::os::unix::fs::OpenOptionsExt;
        // Concurrent-write on a parallel filesystem is a capability of that
        // filesystem's own open path (e.g. PLFS container semantics); a plain
        // POSIX backend has nothing further to set beyond create/write/mode.
        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .mode(0o600)
            .open(path)
            .map_err(|source| PfError::Io { path: path.to_path_buf(), source })
    }

    fn read_at(&self, handle: &mut File, path: &Path, offset: u64, buf: &mut [u8]) -> Result<usize, PfError> {
        handle
            .seek(SeekFrom::Start(offset))
            .map_err(|source| PfError::Io { path: path.to_path_buf(), source })?;
        handle.read(buf).map_err(|source| PfError::Io { path: path.to_path_buf(), source })
    }

    fn write_at(&self, handle: &mut File, path: &Path, offset: u64, buf: &[u8]) -> Result<usize, PfError> {
        handle
            .seek(SeekFrom::Start(offset))
            .map_err(|source| PfError::Io { path: path.to_path_buf(), source })?;
        handle.write(buf).map_err(|source| PfError::Io { path: path.to_path_buf(), source })
    }

    fn close(&self, handle: File) -> Result<(), PfError> {
        drop(handle);
        Ok(())
    }

    fn stat(&self, path: &Path) -> Result<StatInfo, PfError> {
        let meta = std::fs::symlink_metadata(path).map_err(|source| PfError::Stat { path: path.to_path_buf(), source })?;
        Ok(StatInfo::from_metadata(&meta))
    }

    fn chown(&self, path: &Path, uid: u32, gid: u32) -> Result<(), PfError> {
        nix::unistd::chown(path, Some(nix::unistd::Uid::from_raw(uid)), Some(nix::unistd::Gid::from_raw(gid)))
            .map_err(|e| PfError::Io { path: path.to_path_buf(), source: nix_err_to_io(e) })
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<(), PfError> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .map_err(|source| PfError::Io { path: path.to_path_buf(), source })
    }

    fn utime(&self, path: &Path, atime: i64, mtime: i64) -> Result<(), PfError> {
        use nix::sys::stat::{utimensat, UtimensatFlags};
        use nix::sys::time::{TimeSpec, TimeValLike};
        let atime = TimeSpec::seconds(atime);
        let mtime = TimeSpec::seconds(mtime);
        utimensat(None, path, &atime, &mtime, UtimensatFlags::NoFollowSymlink)
            .map_err(|e| PfError::Io { path: path.to_path_buf(), source: nix_err_to_io(e) })
    }
}

/// `nix::Error` (0.19) is `Sys(Errno)` plus a few non-errno variants
/// (`InvalidPath`, `InvalidUtf8`, `UnsupportedOperation`), not a bare errno
/// newtype, so it can't be cast directly. Mirrors the `err.as_errno()`
/// extraction pattern used elsewhere against this same nix version.
fn nix_err_to_io(e: nix::Error) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.as_errno().map_or(libc::EIO, |errno| errno as i32))
}
