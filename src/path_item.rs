//! `PathItem`: the universal currency of the protocol. A fixed-layout record
//! copied by value, never mutated in place once packed.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Source- or destination-side type tag for a filesystem object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Link,
    Dir,
    Plfs,
    Fuse,
    Synth,
    Tape,
    Premigrated,
    Migrated,
}

/// A POSIX stat snapshot, bounded to the fields the engines actually consult.
/// Distinct from `std::fs::Metadata` so it can be carried by value across the
/// channel matrix without borrowing a filesystem handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatInfo {
    pub mode: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub nlink: u64,
    pub ino: u64,
    pub dev: u64,
}

impl StatInfo {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            mode: meta.mode(),
            size: meta.size(),
            uid: meta.uid(),
            gid: meta.gid(),
            atime: meta.atime(),
            mtime: meta.mtime(),
            nlink: meta.nlink(),
            ino: meta.ino(),
            dev: meta.dev(),
        }
    }

    pub fn is_symlink(&self) -> bool {
        (self.mode & libc::S_IFMT) == libc::S_IFLNK
    }
}

/// One source-filesystem object, possibly describing a single chunk of it.
#[derive(Clone, Debug)]
pub struct PathItem {
    pub path: PathBuf,
    pub st: StatInfo,
    pub ftype: FileType,
    pub desttype: FileType,
    pub fstype: String,
    /// Chunk index; 0 for unchunked files.
    pub chkidx: u64,
    /// Chunk size in bytes; 0 means one logical chunk covering the whole file.
    pub chksz: u64,
}

impl PathItem {
    pub fn new(path: impl Into<PathBuf>, st: StatInfo, ftype: FileType) -> Self {
        Self {
            path: path.into(),
            st,
            ftype,
            desttype: ftype,
            fstype: String::new(),
            chkidx: 0,
            chksz: 0,
        }
    }

    /// Total chunk count per spec.md §3: `ceil(S/C)` when `S >= chunk_at` and
    /// chunking is enabled; otherwise a single chunk.
    pub fn chunk_count(size: u64, chunk_at: u64, chunk_size: u64) -> u64 {
        if chunk_size > 0 && size >= chunk_at {
            size.div_ceil(chunk_size)
        } else {
            1
        }
    }

    /// Total chunk count implied by this item's own `chksz`/`st.size`, for
    /// receivers (like the accumulator) that only see one `PathItem` at a
    /// time and have no access to the job's `chunk_at` threshold.
    pub fn total_chunks(&self) -> u64 {
        if self.chksz == 0 {
            1
        } else {
            self.st.size.div_ceil(self.chksz)
        }
    }

    /// Byte range covered by chunk `chkidx` of a file of size `size` with
    /// chunk size `chksz` (0 meaning "whole file, one chunk").
    pub fn chunk_range(chkidx: u64, chksz: u64, size: u64) -> (u64, u64) {
        if chksz == 0 {
            (0, size)
        } else {
            let offset = chkidx * chksz;
            let length = chksz.min(size.saturating_sub(offset));
            (offset, length)
        }
    }

    /// Expand a single regular-file `PathItem` into one `PathItem` per chunk,
    /// per spec.md §4.5's chunking policy. Each clone carries its own
    /// `chkidx`/`chksz`; `chksz` is left 0 (single chunk) when the file does
    /// not meet the chunking threshold.
    pub fn expand_chunks(&self, chunk_at: u64, chunk_size: u64) -> Vec<PathItem> {
        let size = self.st.size;
        let count = Self::chunk_count(size, chunk_at, chunk_size);
        if count <= 1 {
            let mut item = self.clone();
            item.chkidx = 0;
            item.chksz = 0;
            return vec![item];
        }
        (0..count)
            .map(|i| {
                let mut item = self.clone();
                item.chkidx = i;
                item.chksz = chunk_size;
                item
            })
            .collect()
    }
}

pub fn system_time_to_epoch(t: SystemTime) -> i64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn basename(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or_else(|| path.as_os_str())
}
