//! Accumulator (spec.md §4.4): collates chunk-completion updates per file and
//! reports completion to the manager exactly once per source file.

use super::{Hub, RoleId, MANAGER_RANK};
use crate::protocol::{Command, CopyStats, ExaminedStats};
use crossbeam_channel::Receiver;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

type Key = (PathBuf, u64);

pub fn run(rank: RoleId, inbox: &Receiver<super::Envelope>, hub: &Hub) {
    let mut seen: HashMap<Key, (HashSet<u64>, u64)> = HashMap::new();

    loop {
        let envelope = match inbox.recv() {
            Ok(e) => e,
            Err(_) => return,
        };

        match envelope.cmd {
            Command::Exit => return,
            Command::UpdChunk { items } => {
                let count = items.len() as u64;
                for item in items {
                    let total = item.total_chunks();
                    let key: Key = (item.path.clone(), total);
                    let entry = seen.entry(key.clone()).or_insert_with(|| (HashSet::new(), item.st.size));
                    entry.0.insert(item.chkidx);

                    if entry.0.len() as u64 >= total {
                        let size = entry.1;
                        debug!("{} chunks complete for {}, reporting completion", total, key.0.display());
                        hub.send(rank, MANAGER_RANK, Command::CopyStats { from: rank, stats: CopyStats { files: 1, bytes: size as f64 } });
                        hub.send(
                            rank,
                            MANAGER_RANK,
                            Command::ExaminedStats { from: rank, stats: ExaminedStats { files: 1, bytes: size as f64, dirs: 0 } },
                        );
                        seen.remove(&key);
                    }
                }
                // Sent after any CopyStats/ExaminedStats above: pairwise FIFO to
                // the manager guarantees those land first, so the manager's
                // outstanding-chunk counter only reaches zero once they have.
                hub.send(rank, MANAGER_RANK, Command::ChunkAccounted { count });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_item::{FileType, PathItem, StatInfo};
    use crate::roles::build_topology;

    fn item(path: &str, size: u64, chkidx: u64, chksz: u64) -> PathItem {
        let st = StatInfo { mode: 0o100644, size, uid: 0, gid: 0, atime: 0, mtime: 0, nlink: 1, ino: 0, dev: 0 };
        let mut i = PathItem::new(path, st, FileType::Regular);
        i.chkidx = chkidx;
        i.chksz = chksz;
        i
    }

    #[test]
    fn reports_exactly_once_per_file_and_ignores_duplicate_chunks() {
        let topo = build_topology(0);
        let hub = topo.hub.clone();
        let acc_rank = crate::roles::ACCUMULATOR_RANK;
        let inbox = &topo.inboxes[&acc_rank];
        let manager_inbox = &topo.inboxes[&MANAGER_RANK];

        hub.send(10, acc_rank, Command::UpdChunk { items: vec![item("/a/f", 200, 0, 100)] });
        hub.send(10, acc_rank, Command::UpdChunk { items: vec![item("/a/f", 200, 0, 100)] }); // duplicate
        hub.send(10, acc_rank, Command::UpdChunk { items: vec![item("/a/f", 200, 1, 100)] });
        hub.send(10, acc_rank, Command::Exit);

        run(acc_rank, inbox, &hub);

        let mut reports = 0;
        while let Ok(env) = manager_inbox.try_recv() {
            if matches!(env.cmd, Command::CopyStats { .. }) {
                reports += 1;
            }
        }
        assert_eq!(reports, 1);
    }
}
