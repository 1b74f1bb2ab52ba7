//! Filesystem-kind oracle (spec.md §6). The concrete `statfs`-magic probe is
//! an external collaborator; this module defines the trait boundary and one
//! libc-backed implementation, grounded on the `statfs`-based network-FS
//! check pattern used elsewhere in the retrieval pack.

use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsKind {
    Gpfs,
    Panasas,
    Fuse,
    AnyFs,
}

impl FsKind {
    pub fn requires_concurrent_write(self) -> bool {
        matches!(self, FsKind::Panasas)
    }
}

pub trait FsProbe: Send + Sync {
    /// Classify the filesystem backing `path`. Symlinks always report
    /// `FsKind::Gpfs` for the purposes of open-flag selection (spec.md §6).
    fn fs_kind(&self, path: &Path) -> FsKind;
}

/// `statfs`-based oracle. Magic numbers below are the well-known Linux
/// `f_type` values for the filesystems spec.md calls out by name; anything
/// else (including a failed probe) falls back to `AnyFs`.
pub struct StatfsProbe;

#[cfg(target_os = "linux")]
mod magic {
    pub const GPFS_MAGIC: i64 = 0x47504653; // "GPFS" packed, placeholder magic used by GPFS's own statfs shim
    pub const PANFS_MAGIC: i64 = 0xaad7aaea;
    pub const FUSE_MAGIC: i64 = 0x65735546; // "Fuse" little-endian
}

impl FsProbe for StatfsProbe {
    #[cfg(target_os = "linux")]
    fn fs_kind(&self, path: &Path) -> FsKind {
        use std::os::unix::ffi::OsStrExt;

        if let Ok(meta) = std::fs::symlink_metadata(path) {
            if meta.file_type().is_symlink() {
                return FsKind::Gpfs;
            }
        }

        let Ok(c_path) = std::ffi::CString::new(path.as_os_str().as_bytes()) else {
            return FsKind::AnyFs;
        };

        unsafe {
            let mut buf: libc::statfs = std::mem::zeroed();
            if libc::statfs(c_path.as_ptr(), &mut buf) != 0 {
                return FsKind::AnyFs;
            }
            match buf.f_type as i64 {
                magic::GPFS_MAGIC => FsKind::Gpfs,
                magic::PANFS_MAGIC => FsKind::Panasas,
                magic::FUSE_MAGIC => FsKind::Fuse,
                _ => FsKind::AnyFs,
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn fs_kind(&self, path: &Path) -> FsKind {
        if let Ok(meta) = std::fs::symlink_metadata(path) {
            if meta.file_type().is_symlink() {
                return FsKind::Gpfs;
            }
        }
        FsKind::AnyFs
    }
}

/// `fstype` string, as attached to `PathItem::fstype`, to the matching [`FsKind`].
pub fn fstype_str_to_kind(fstype: &str) -> FsKind {
    if fstype.eq_ignore_ascii_case("panfs") {
        FsKind::Panasas
    } else if fstype.eq_ignore_ascii_case("gpfs") {
        FsKind::Gpfs
    } else if fstype.eq_ignore_ascii_case("fuse") {
        FsKind::Fuse
    } else {
        FsKind::AnyFs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panfs_string_requires_concurrent_write() {
        assert!(fstype_str_to_kind("panfs").requires_concurrent_write());
        assert!(!fstype_str_to_kind("gpfs").requires_concurrent_write());
        assert!(!fstype_str_to_kind("unknown").requires_concurrent_write());
    }
}
