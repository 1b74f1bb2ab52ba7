//! Manager main loop (spec.md §4.2).

use super::{Hub, RoleId, MANAGER_RANK, OUTPUT_RANK};
use crate::config::WorkType;
use crate::path_list::{pack_list, PathList, WorkBufList};
use crate::protocol::{Category, Command};
use crate::stats::{JobStats, ProcStatus};
use crossbeam_channel::Receiver;
use log::debug;
use std::collections::HashMap;

/// Run the manager to completion, returning the final job statistics.
///
/// Dispatch priority: `input > dir > regs > tape`, so discovery flows before
/// copies. Free-worker search is linear low-to-high rank ([`ProcStatus::free_worker`]).
/// Termination: every category queue empty, every worker idle, and no
/// outstanding accumulator work (spec.md §4.2), then `EXIT` is broadcast to
/// workers, output, and the accumulator.
pub fn run(
    inbox: &Receiver<super::Envelope>,
    hub: &Hub,
    worker_ranks: &[RoleId],
    message_buffer_cap: usize,
    work_type: WorkType,
) -> JobStats {
    let mut queues: HashMap<Category, WorkBufList> =
        Category::PRIORITY.iter().map(|c| (*c, WorkBufList::new())).collect();
    let mut pending: HashMap<Category, PathList> = Category::PRIORITY.iter().map(|c| (*c, PathList::new())).collect();
    let mut status = ProcStatus::new(worker_ranks.iter().copied());
    let mut stats = JobStats::default();
    // Chunks a worker has handed to the accumulator (CHUNKDISPATCHED) minus
    // chunks the accumulator has acknowledged accounting for (CHUNKACCOUNTED).
    // Zero means the accumulator has fully drained every completion it owes
    // the manager; see `handle`'s CHUNKDISPATCHED/CHUNKACCOUNTED arms.
    let mut outstanding_chunks: u64 = 0;

    loop {
        dispatch_ready(&mut queues, &mut status, hub, work_type);

        if all_queues_empty(&queues) && status.all_idle() && outstanding_chunks == 0 && inbox.is_empty() {
            // A worker may have gone idle holding a batch under
            // `message_buffer_cap` items that never crossed the flush
            // threshold; drain it before declaring the job done.
            flush_all_pending(&mut pending, &mut queues, message_buffer_cap);
            if !all_queues_empty(&queues) {
                continue;
            }
            debug!("all queues drained, all workers idle, and accumulator drained, broadcasting EXIT");
            for &w in worker_ranks {
                hub.send(MANAGER_RANK, w, Command::Exit);
            }
            hub.send(MANAGER_RANK, OUTPUT_RANK, Command::Exit);
            hub.send(MANAGER_RANK, super::ACCUMULATOR_RANK, Command::Exit);
            return stats;
        }

        let envelope = match inbox.recv() {
            Ok(e) => e,
            Err(_) => return stats,
        };

        handle(envelope, &mut queues, &mut pending, &mut status, &mut stats, &mut outstanding_chunks, hub, message_buffer_cap);
    }
}

fn handle(
    envelope: super::Envelope,
    queues: &mut HashMap<Category, WorkBufList>,
    pending: &mut HashMap<Category, PathList>,
    status: &mut ProcStatus,
    stats: &mut JobStats,
    outstanding_chunks: &mut u64,
    hub: &Hub,
    message_buffer_cap: usize,
) {
    let from = envelope.from;
    match envelope.cmd {
        Command::Input { items } => enqueue(pending, queues, Category::Input, items, message_buffer_cap),
        Command::Dir { items } => enqueue(pending, queues, Category::Dir, items, message_buffer_cap),
        Command::Process { items } => enqueue(pending, queues, Category::Regs, items, message_buffer_cap),
        Command::Tape { items } => enqueue(pending, queues, Category::Tape, items, message_buffer_cap),
        Command::WorkDone { from } => status.mark_idle(from),
        Command::NonFatalInc { .. } => stats.incr_nonfatal(),
        Command::ChunkBusy { item, .. } => enqueue(pending, queues, Category::Regs, vec![item], message_buffer_cap),
        Command::CopyStats { stats: delta, .. } => stats.apply_copy(delta),
        Command::ExaminedStats { stats: delta, .. } => stats.apply_examined(delta),
        Command::ChunkDispatched { count, .. } => *outstanding_chunks += count,
        Command::ChunkAccounted { count } => *outstanding_chunks = outstanding_chunks.saturating_sub(count),
        Command::QueueSize { reply_to } => {
            let size: usize = queues.values().map(|q| q.item_count()).sum();
            hub.send(MANAGER_RANK, reply_to, Command::QueueSizeReply { size });
        }
        _ => {
            let _ = from;
        }
    }
}

fn enqueue(
    pending: &mut HashMap<Category, PathList>,
    queues: &mut HashMap<Category, WorkBufList>,
    category: Category,
    items: Vec<crate::path_item::PathItem>,
    message_buffer_cap: usize,
) {
    let list = pending.get_mut(&category).expect("category always present");
    for item in items {
        list.enqueue_path(item);
    }
    if list.len() >= message_buffer_cap {
        let drained = std::mem::take(list);
        for buf in pack_list(drained, message_buffer_cap) {
            queues.get_mut(&category).expect("category always present").enqueue_buf_list(buf);
        }
    }
}

fn flush_all_pending(
    pending: &mut HashMap<Category, PathList>,
    queues: &mut HashMap<Category, WorkBufList>,
    message_buffer_cap: usize,
) {
    for category in Category::PRIORITY {
        let list = std::mem::take(pending.get_mut(&category).expect("category always present"));
        if !list.is_empty() {
            for buf in pack_list(list, message_buffer_cap) {
                queues.get_mut(&category).expect("category always present").enqueue_buf_list(buf);
            }
        }
    }
}

fn dispatch_ready(queues: &mut HashMap<Category, WorkBufList>, status: &mut ProcStatus, hub: &Hub, work_type: WorkType) {
    loop {
        let Some(worker) = status.free_worker() else { break };
        let Some(category) = Category::PRIORITY.into_iter().find(|c| !queues[c].is_empty()) else { break };
        let buf = queues.get_mut(&category).expect("just checked non-empty").dequeue_buf_list().expect("non-empty");
        status.mark_busy(worker);
        let items = buf.into_items();
        debug!("dispatching {} {:?} item(s) to worker {worker}", items.len(), category);
        let cmd = match category {
            Category::Dir => Command::Dir { items },
            Category::Input | Category::Regs | Category::Tape => match work_type {
                WorkType::Copy => Command::Copy { items },
                WorkType::Compare => Command::Compare { items },
                WorkType::List => Command::Stat { items },
            },
        };
        hub.send(MANAGER_RANK, worker, cmd);
    }
}

fn all_queues_empty(queues: &HashMap<Category, WorkBufList>) -> bool {
    queues.values().all(WorkBufList::is_empty)
}
