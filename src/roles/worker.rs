//! Stateless worker loop (spec.md §4.3).

use super::{Hub, RoleId, ACCUMULATOR_RANK, MANAGER_RANK, OUTPUT_RANK};
use crate::backend::IoBackend;
use crate::compare_engine::{compare_file, CompareResult};
use crate::config::Config;
use crate::copy_engine::copy_file;
use crate::error::PfError;
use crate::fs_probe::FsProbe;
use crate::path_item::{FileType, PathItem, StatInfo};
use crate::path_list::{pack_list, PathList};
use crate::protocol::{Command, ExaminedStats};
use crossbeam_channel::Receiver;
use log::debug;
use rayon::prelude::*;

/// Block on `recv`, execute one command, emit `WORKDONE`, repeat until `EXIT`.
pub fn run<B: IoBackend<Handle = std::fs::File> + Sync>(
    rank: RoleId,
    inbox: &Receiver<super::Envelope>,
    hub: &Hub,
    cfg: &Config,
    backend: &B,
    fs_probe: &dyn FsProbe,
) {
    loop {
        let envelope = match inbox.recv() {
            Ok(e) => e,
            Err(_) => return,
        };

        match envelope.cmd {
            Command::Exit => return,
            Command::Dir { items } => handle_dir(rank, hub, cfg, backend, fs_probe, items),
            Command::Copy { items } => handle_copy(rank, hub, cfg, backend, items),
            Command::Compare { items } => handle_compare(rank, hub, cfg, backend, items),
            Command::Stat { items } => handle_stat(rank, hub, backend, items),
            _ => {}
        }

        hub.send(rank, MANAGER_RANK, Command::WorkDone { from: rank });
    }
}

fn classify(meta: &std::fs::Metadata) -> FileType {
    if meta.file_type().is_symlink() {
        FileType::Link
    } else if meta.is_dir() {
        FileType::Dir
    } else {
        FileType::Regular
    }
}

/// For each directory `PathItem`, readdir it, `lstat` each child, classify,
/// and pack the results into per-category buffers flushed via `Input`/`Dir`/`Process`.
fn handle_dir<B: IoBackend<Handle = std::fs::File> + Sync>(
    rank: RoleId,
    hub: &Hub,
    cfg: &Config,
    backend: &B,
    fs_probe: &dyn FsProbe,
    items: Vec<PathItem>,
) {
    let mut dirs = PathList::new();
    let mut regs = PathList::new();
    let mut examined_dirs = 0u64;

    for item in &items {
        if item.ftype != FileType::Dir {
            continue;
        }
        let entries = match std::fs::read_dir(&item.path) {
            Ok(rd) => rd,
            Err(source) => {
                report_error(rank, hub, PfError::Io { path: item.path.clone(), source });
                continue;
            }
        };
        examined_dirs += 1;

        let paths: Vec<std::path::PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        debug!("worker {rank}: read {} entries under {}", paths.len(), item.path.display());
        let classified: Vec<Option<PathItem>> = paths
            .par_iter()
            .map(|path| {
                std::fs::symlink_metadata(path).ok().map(|meta| {
                    let ftype = classify(&meta);
                    let st = StatInfo::from_metadata(&meta);
                    let mut child = PathItem::new(path.clone(), st, ftype);
                    child.fstype = format!("{:?}", fs_probe.fs_kind(path));
                    child
                })
            })
            .collect();

        for child in classified.into_iter().flatten() {
            match child.ftype {
                FileType::Dir => dirs.enqueue_path(child),
                _ => {
                    // Chunking is a copy-only policy (spec.md §4.5: "applied
                    // upstream, before enqueueing for copy"); compare/list
                    // jobs keep one PathItem per file so each gets a single
                    // whole-file verdict.
                    let chunkable = cfg.work_type == crate::config::WorkType::Copy
                        && child.st.size >= cfg.chunk_at
                        && cfg.chunk_size > 0;
                    if chunkable {
                        for chunk in child.expand_chunks(cfg.chunk_at, cfg.chunk_size) {
                            regs.enqueue_path(chunk);
                        }
                    } else {
                        regs.enqueue_path(child);
                    }
                }
            }
        }
    }

    hub.send(
        rank,
        MANAGER_RANK,
        Command::ExaminedStats { from: rank, stats: ExaminedStats { files: 0, bytes: 0.0, dirs: examined_dirs } },
    );

    for buf in pack_list(dirs, cfg.message_buffer_cap) {
        hub.send(rank, MANAGER_RANK, Command::Dir { items: buf.into_items() });
    }
    for buf in pack_list(regs, cfg.message_buffer_cap) {
        hub.send(rank, MANAGER_RANK, Command::Process { items: buf.into_items() });
    }
}

fn handle_copy<B: IoBackend<Handle = std::fs::File> + Sync>(rank: RoleId, hub: &Hub, cfg: &Config, backend: &B, items: Vec<PathItem>) {
    for src in items {
        let dest_path = crate::path_derive::get_output_path(&cfg.src_root, &src.path, &cfg.dest_root, cfg);
        let mut dst = src.clone();
        dst.path = dest_path;
        dst.fstype = cfg.dest_fstype.clone();

        // mkdir -p semantics for the destination's parent (spec.md §6); only
        // the first chunk of a given file to reach a worker pays for this,
        // mkpath is idempotent for the rest.
        if let Some(parent) = dst.path.parent() {
            if let Err(e) = crate::path_derive::mkpath(parent, 0o755) {
                report_error(rank, hub, e);
                continue;
            }
        }

        match copy_file(&src, &dst, cfg.block_size, cfg.force_parallel_dest, backend, None) {
            // The accumulator, not the worker, reports COPYSTATS/EXAMINEDSTATS
            // to the manager once a file's last chunk lands (spec.md §2, §4.4)
            // — only UPDCHUNK goes out here, to avoid double-counting bytes.
            // CHUNKDISPATCHED lets the manager track this chunk as outstanding
            // accumulator work until CHUNKACCOUNTED confirms it landed.
            Ok(_outcome) => {
                hub.send(rank, ACCUMULATOR_RANK, Command::UpdChunk { items: vec![src.clone()] });
                hub.send(rank, MANAGER_RANK, Command::ChunkDispatched { from: rank, count: 1 });
            }
            Err(e) => report_error(rank, hub, e),
        }
    }
}

fn handle_compare<B: IoBackend<Handle = std::fs::File> + Sync>(rank: RoleId, hub: &Hub, cfg: &Config, backend: &B, items: Vec<PathItem>) {
    for src in items {
        let dest_path = crate::path_derive::get_output_path(&cfg.src_root, &src.path, &cfg.dest_root, cfg);
        let mut dst = src.clone();
        dst.path = dest_path;

        match compare_file(&src, &dst, cfg.block_size, cfg.meta_only_compare(), backend) {
            Ok(result) => {
                let line = match result {
                    CompareResult::Equal => format!("EQUAL {}", src.path.display()),
                    CompareResult::Different => format!("DIFFERENT {}", src.path.display()),
                    CompareResult::Missing => format!("MISSING {}", src.path.display()),
                };
                hub.send(rank, OUTPUT_RANK, Command::Out { line });
                hub.send(
                    rank,
                    MANAGER_RANK,
                    Command::ExaminedStats { from: rank, stats: ExaminedStats { files: 1, bytes: src.st.size as f64, dirs: 0 } },
                );
            }
            Err(e) => report_error(rank, hub, e),
        }
    }
}

/// `STAT` is the manager's terminal action for `-w list` jobs on already-
/// classified regular/tape `PathItem`s reaching the `regs`/`tape` queues
/// (everything `DIR` finds that isn't itself a directory, which stays on the
/// `Dir` category and is dispatched as `DIR` regardless of `work_type`). Stat
/// re-verifies the path still exists, then lists it via `OUT` — it does not
/// feed items back into `Input`/`Dir`/`Process`, which would loop forever for
/// a category the manager keeps routing through `STAT`.
fn handle_stat<B: IoBackend<Handle = std::fs::File> + Sync>(rank: RoleId, hub: &Hub, backend: &B, items: Vec<PathItem>) {
    for item in items {
        match backend.stat(&item.path) {
            Ok(st) => {
                hub.send(rank, OUTPUT_RANK, Command::Out { line: item.path.display().to_string() });
                hub.send(
                    rank,
                    MANAGER_RANK,
                    Command::ExaminedStats { from: rank, stats: ExaminedStats { files: 1, bytes: st.size as f64, dirs: 0 } },
                );
            }
            Err(e) => report_error(rank, hub, e),
        }
    }
}

fn report_error(rank: RoleId, hub: &Hub, err: PfError) {
    hub.send(rank, OUTPUT_RANK, Command::Out { line: err.output_line() });
    hub.send(rank, MANAGER_RANK, Command::NonFatalInc { from: rank });
}
