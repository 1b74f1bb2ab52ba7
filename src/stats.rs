//! Manager-owned job statistics and worker status, spec.md §3/§4.2.

use crate::protocol::{CopyStats, ExaminedStats, WorkerId};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcState {
    Idle,
    Busy,
}

/// `ProcStatus[rank]`, now a map keyed by logical worker id rather than a
/// fixed-size array indexed by MPI rank.
#[derive(Default)]
pub struct ProcStatus {
    state: HashMap<WorkerId, ProcState>,
}

impl ProcStatus {
    pub fn new(workers: impl IntoIterator<Item = WorkerId>) -> Self {
        let state = workers.into_iter().map(|id| (id, ProcState::Idle)).collect();
        Self { state }
    }

    pub fn mark_busy(&mut self, id: WorkerId) {
        self.state.insert(id, ProcState::Busy);
    }

    pub fn mark_idle(&mut self, id: WorkerId) {
        self.state.insert(id, ProcState::Idle);
    }

    pub fn is_idle(&self, id: WorkerId) -> bool {
        matches!(self.state.get(&id), Some(ProcState::Idle))
    }

    pub fn all_idle(&self) -> bool {
        self.state.values().all(|s| *s == ProcState::Idle)
    }

    /// Lowest-ranked idle worker, mirroring the original's linear low-to-high scan.
    pub fn free_worker(&self) -> Option<WorkerId> {
        let mut ids: Vec<WorkerId> = self.state.iter().filter(|(_, s)| **s == ProcState::Idle).map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.into_iter().next()
    }
}

/// Accumulated job statistics: additive, so arrival order of deltas doesn't matter.
#[derive(Default, Clone, Copy, Debug)]
pub struct JobStats {
    pub copied_files: u64,
    pub copied_bytes: f64,
    pub examined_files: u64,
    pub examined_bytes: f64,
    pub examined_dirs: u64,
    pub nonfatal_errors: u64,
}

impl JobStats {
    pub fn apply_copy(&mut self, delta: CopyStats) {
        self.copied_files += delta.files;
        self.copied_bytes += delta.bytes;
    }

    pub fn apply_examined(&mut self, delta: ExaminedStats) {
        self.examined_files += delta.files;
        self.examined_bytes += delta.bytes;
        self.examined_dirs += delta.dirs;
    }

    pub fn incr_nonfatal(&mut self) {
        self.nonfatal_errors += 1;
    }

    /// Final summary line, spec.md §7 "user-visible behavior".
    pub fn summary_line(&self) -> String {
        format!(
            "copied {} files ({} bytes), examined {} files / {} dirs ({} bytes), {} non-fatal errors",
            self.copied_files,
            self.copied_bytes as u64,
            self.examined_files,
            self.examined_dirs,
            self.examined_bytes as u64,
            self.nonfatal_errors
        )
    }
}
