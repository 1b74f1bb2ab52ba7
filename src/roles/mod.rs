//! The channel matrix standing in for the MPI communicator (spec.md §5, §9).
//!
//! Rank numbers match the original's fixed well-known ranks: manager is 0,
//! output is 1, accumulator is 2, workers are everything from 3 up. Each role
//! gets its own inbound `crossbeam-channel` receiver; the [`Hub`] holds every
//! outbound sender so any role can address any other by rank.

pub mod accumulator;
pub mod manager;
pub mod output;
pub mod worker;

use crate::protocol::Command;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;

pub type RoleId = usize;

pub const MANAGER_RANK: RoleId = 0;
pub const OUTPUT_RANK: RoleId = 1;
pub const ACCUMULATOR_RANK: RoleId = 2;
pub const FIRST_WORKER_RANK: RoleId = 3;

/// A command plus the rank that sent it.
#[derive(Debug)]
pub struct Envelope {
    pub from: RoleId,
    pub cmd: Command,
}

#[derive(Clone)]
pub struct Hub {
    senders: HashMap<RoleId, Sender<Envelope>>,
}

impl Hub {
    pub fn send(&self, from: RoleId, to: RoleId, cmd: Command) {
        if let Some(tx) = self.senders.get(&to) {
            let _ = tx.send(Envelope { from, cmd });
        }
    }
}

pub struct Topology {
    pub hub: Hub,
    pub inboxes: HashMap<RoleId, Receiver<Envelope>>,
    pub worker_ranks: Vec<RoleId>,
}

/// Build the fixed-role topology for `num_workers` worker threads.
pub fn build_topology(num_workers: usize) -> Topology {
    let mut senders = HashMap::new();
    let mut inboxes = HashMap::new();
    let worker_ranks: Vec<RoleId> = (0..num_workers).map(|i| FIRST_WORKER_RANK + i).collect();

    let all_ranks = [MANAGER_RANK, OUTPUT_RANK, ACCUMULATOR_RANK]
        .into_iter()
        .chain(worker_ranks.iter().copied());

    for rank in all_ranks {
        let (tx, rx) = unbounded();
        senders.insert(rank, tx);
        inboxes.insert(rank, rx);
    }

    Topology { hub: Hub { senders }, inboxes, worker_ranks }
}
