//! Runtime configuration surface.
//!
//! The core never parses CLI arguments or a config file itself; the owning
//! binary fills in a [`Config`] and hands it to the roles. Mirrors the
//! `-p/-c/-j/-w/-i/-s/-C/-S/-n/-r/-t/-l/-P/-M` invocation surface.

use std::path::PathBuf;

/// What the job as a whole is doing. Closed set, unlike the original's `-w` string flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkType {
    Copy,
    List,
    Compare,
}

/// Size/threshold constants with sane defaults, in the same spirit as the
/// marker-struct-of-consts idiom used for tuning knobs elsewhere in this crate.
pub struct ChunkDefaults;

impl ChunkDefaults {
    /// Default block size used for read/write/compare loops (1 MiB).
    pub const BLOCK_SIZE: u64 = 1024 * 1024;
    /// Files at or above this size get split into chunks (1 MiB).
    pub const CHUNK_AT: u64 = 1024 * 1024;
    /// Chunk size once a file is large enough to chunk (1 MiB).
    pub const CHUNK_SIZE: u64 = 1024 * 1024;
    /// Max `PathItem`s packed into one `WorkBuf`.
    pub const MESSAGE_BUFFER: usize = 512;
}

/// Full runtime configuration, threaded through the engines and roles.
#[derive(Clone, Debug)]
pub struct Config {
    pub src_root: PathBuf,
    pub dest_root: PathBuf,
    pub job_id: String,
    pub work_type: WorkType,
    pub block_size: u64,
    pub chunk_at: u64,
    pub chunk_size: u64,
    pub message_buffer_cap: usize,
    /// `-n`: only copy if source and destination differ.
    pub only_if_different: bool,
    /// `-r`: recurse into directories.
    pub recurse: bool,
    /// `-t`: destination filesystem type hint, e.g. `"panfs"`.
    pub dest_fstype: String,
    /// `-l`: also send `LOG` (not just `OUT`) for output lines.
    pub log_to_sink: bool,
    /// `-P`: force treating the destination as a parallel filesystem.
    pub force_parallel_dest: bool,
    /// `-M`: block-level compare; default (false) is metadata-only.
    pub block_compare: bool,
}

impl Config {
    pub fn new(src_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>, work_type: WorkType) -> Self {
        Self {
            src_root: src_root.into(),
            dest_root: dest_root.into(),
            job_id: String::new(),
            work_type,
            block_size: ChunkDefaults::BLOCK_SIZE,
            chunk_at: ChunkDefaults::CHUNK_AT,
            chunk_size: ChunkDefaults::CHUNK_SIZE,
            message_buffer_cap: ChunkDefaults::MESSAGE_BUFFER,
            only_if_different: false,
            recurse: false,
            dest_fstype: String::new(),
            log_to_sink: false,
            force_parallel_dest: false,
            block_compare: false,
        }
    }

    /// Whether `meta_only` compare semantics apply (spec default: metadata-only unless `-M`).
    pub fn meta_only_compare(&self) -> bool {
        !self.block_compare
    }
}
