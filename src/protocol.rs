//! The command protocol: the closed 19-member opcode alphabet and the typed
//! payloads that travel with each one.
//!
//! In the original this was an integer opcode followed by a fixed sequence of
//! raw messages; here the payload rides along with the variant so the
//! receiver's "state machine expecting them in order" collapses into a match
//! arm.

use crate::path_item::PathItem;
use std::fmt;

pub type WorkerId = usize;

/// Category a batch of `PathItem`s belongs to on the manager's queues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Input,
    Dir,
    Regs,
    Tape,
}

impl Category {
    /// Dispatch priority order: input before dir before regs before tape.
    pub const PRIORITY: [Category; 4] = [Category::Input, Category::Dir, Category::Regs, Category::Tape];
}

/// Delta stats carried by `COPYSTATS`. `bytes` is a float to mirror the
/// original's `double` used to exceed a 32-bit byte count.
#[derive(Clone, Copy, Debug, Default)]
pub struct CopyStats {
    pub files: u64,
    pub bytes: f64,
}

/// Delta stats carried by `EXAMINEDSTATS`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExaminedStats {
    pub files: u64,
    pub bytes: f64,
    pub dirs: u64,
}

/// The full command alphabet, stable discriminant ordering matching spec.md §4.1.
#[derive(Debug)]
pub enum Command {
    Exit,
    UpdChunk { items: Vec<PathItem> },
    Out { line: String },
    BufferOut { lines: Vec<String> },
    Log { line: String },
    QueueSize { reply_to: WorkerId },
    QueueSizeReply { size: usize },
    Stat { items: Vec<PathItem> },
    Compare { items: Vec<PathItem> },
    Copy { items: Vec<PathItem> },
    Process { items: Vec<PathItem> },
    Input { items: Vec<PathItem> },
    Dir { items: Vec<PathItem> },
    Tape { items: Vec<PathItem> },
    TapeStat { items: Vec<PathItem> },
    WorkDone { from: WorkerId },
    NonFatalInc { from: WorkerId },
    ChunkBusy { from: WorkerId, item: PathItem },
    CopyStats { from: WorkerId, stats: CopyStats },
    ExaminedStats { from: WorkerId, stats: ExaminedStats },

    /// Worker → manager, sent once per item handed to the accumulator via
    /// `UpdChunk`. Not part of spec.md §4.1's wire alphabet: a THREADS_ONLY
    /// bookkeeping signal so the manager can track "outstanding accumulator
    /// work" (spec.md §4.2's termination predicate) without assuming any
    /// ordering between the worker→accumulator and worker→manager channels.
    ChunkDispatched { from: WorkerId, count: u64 },
    /// Accumulator → manager, acknowledging `count` dispatched items have
    /// been accounted for (whether or not they completed a file). Always
    /// sent after any `CopyStats`/`ExaminedStats` for the same batch, so
    /// pairwise FIFO guarantees those stats are already queued ahead of it.
    ChunkAccounted { count: u64 },
}

impl Command {
    /// The category queue this command's items belong to on the manager, if any.
    pub fn category(&self) -> Option<Category> {
        match self {
            Command::Input { .. } => Some(Category::Input),
            Command::Dir { .. } => Some(Category::Dir),
            Command::Process { .. } => Some(Category::Regs),
            Command::Tape { .. } => Some(Category::Tape),
            _ => None,
        }
    }

    /// Debug-friendly opcode name, the `cmd2str` equivalent called out in design notes.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Exit => "EXIT",
            Command::UpdChunk { .. } => "UPDCHUNK",
            Command::Out { .. } => "OUT",
            Command::BufferOut { .. } => "BUFFEROUT",
            Command::Log { .. } => "LOG",
            Command::QueueSize { .. } => "QUEUESIZE",
            Command::QueueSizeReply { .. } => "QUEUESIZEREPLY",
            Command::Stat { .. } => "STAT",
            Command::Compare { .. } => "COMPARE",
            Command::Copy { .. } => "COPY",
            Command::Process { .. } => "PROCESS",
            Command::Input { .. } => "INPUT",
            Command::Dir { .. } => "DIR",
            Command::Tape { .. } => "TAPE",
            Command::TapeStat { .. } => "TAPESTAT",
            Command::WorkDone { .. } => "WORKDONE",
            Command::NonFatalInc { .. } => "NONFATALINC",
            Command::ChunkBusy { .. } => "CHUNKBUSY",
            Command::CopyStats { .. } => "COPYSTATS",
            Command::ExaminedStats { .. } => "EXAMINEDSTATS",
            Command::ChunkDispatched { .. } => "CHUNKDISPATCHED",
            Command::ChunkAccounted { .. } => "CHUNKACCOUNTED",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
