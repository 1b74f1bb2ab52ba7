//! pftool-core: coordination and data-movement core of a parallel file tool.
//!
//! Role-based worker topology and command protocol, chunked copy/compare
//! engine, and path-list packed-buffer queueing. The CLI, the concrete
//! filesystem probe, and vendor-specific backends (PLFS, FUSE-chunker, tape,
//! synthetic data) are external collaborators; this crate exposes the trait
//! boundaries they plug into.

pub mod backend;
pub mod compare_engine;
pub mod config;
pub mod copy_engine;
pub mod error;
pub mod fs_probe;
pub mod path_derive;
pub mod path_item;
pub mod path_list;
pub mod protocol;
pub mod roles;
pub mod stats;
pub mod utils;

pub use config::{Config, WorkType};
pub use error::PfError;
pub use path_item::PathItem;
pub use stats::JobStats;

use backend::PosixBackend;
use fs_probe::StatfsProbe;
use roles::output::LogSink;
use std::thread;

/// Single entry point: run one job (copy/compare/list rooted at
/// `cfg.src_root`) against `num_workers` worker threads, and return the final
/// job statistics once the topology drains and shuts down.
///
/// This is the THREADS_ONLY variant from spec.md §5/§9: one OS thread per
/// logical role, `crossbeam-channel` channels standing in for the
/// communicator. A real cluster deployment would instead run one process per
/// rank over an actual message-passing fabric; the role loops themselves
/// (`roles::manager`, `roles::worker`, `roles::accumulator`, `roles::output`)
/// don't know the difference.
pub fn run_job(cfg: Config, num_workers: usize, log_sink: Option<&dyn LogSink>) -> JobStats {
    let topo = roles::build_topology(num_workers);
    let hub = topo.hub;
    let worker_ranks = topo.worker_ranks.clone();

    let src_root = cfg.src_root.clone();
    let meta = std::fs::symlink_metadata(&src_root);
    let seed_ftype = match &meta {
        Ok(m) if m.is_dir() => path_item::FileType::Dir,
        Ok(m) if m.file_type().is_symlink() => path_item::FileType::Link,
        _ => path_item::FileType::Regular,
    };
    if let Ok(m) = meta {
        let st = path_item::StatInfo::from_metadata(&m);
        let seed = path_item::PathItem::new(src_root, st, seed_ftype);
        let category_cmd = match seed_ftype {
            path_item::FileType::Dir => protocol::Command::Dir { items: vec![seed] },
            _ => protocol::Command::Process { items: vec![seed] },
        };
        hub.send(roles::MANAGER_RANK, roles::MANAGER_RANK, category_cmd);
    }

    thread::scope(|scope| {
        let output_inbox = &topo.inboxes[&roles::OUTPUT_RANK];
        scope.spawn(move || roles::output::run(roles::OUTPUT_RANK, output_inbox, log_sink));

        let accumulator_inbox = &topo.inboxes[&roles::ACCUMULATOR_RANK];
        let accumulator_hub = hub.clone();
        scope.spawn(move || roles::accumulator::run(roles::ACCUMULATOR_RANK, accumulator_inbox, &accumulator_hub));

        for &rank in &worker_ranks {
            let worker_inbox = &topo.inboxes[&rank];
            let worker_hub = hub.clone();
            let worker_cfg = cfg.clone();
            let backend = PosixBackend;
            let probe = StatfsProbe;
            scope.spawn(move || roles::worker::run(rank, worker_inbox, &worker_hub, &worker_cfg, &backend, &probe));
        }

        let manager_inbox = &topo.inboxes[&roles::MANAGER_RANK];
        roles::manager::run(manager_inbox, &hub, &worker_ranks, cfg.message_buffer_cap, cfg.work_type)
    })
}
