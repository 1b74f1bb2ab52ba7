//! End-to-end exercises of the whole role topology through [`run_job`]:
//! seed a small tree, copy it, then compare it, all over the THREADS_ONLY
//! channel matrix (spec.md §5/§9).

use pftool_core::roles::output::LogSink;
use pftool_core::{run_job, Config, WorkType};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

fn scratch_dir(name: &str) -> PathBuf {
    let d = std::env::temp_dir().join(format!("pftool-core-e2e-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&d);
    std::fs::create_dir_all(&d).unwrap();
    d
}

#[derive(Default)]
struct CapturingSink {
    lines: Mutex<Vec<String>>,
}

impl LogSink for CapturingSink {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

fn write_tree(root: &Path) {
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::write(root.join("a.txt"), b"top level file").unwrap();
    std::fs::write(root.join("sub/b.txt"), b"nested file contents").unwrap();
}

#[test]
fn copy_then_compare_round_trips_a_small_tree() {
    let src = scratch_dir("copy-src");
    let dst = scratch_dir("copy-dst");
    write_tree(&src);
    // dst must exist as a directory but start empty so get_output_path's
    // recurse-into-existing-dir rule (spec.md §4.7) has somewhere to land.
    std::fs::remove_dir_all(&dst).unwrap();

    let mut cfg = Config::new(&src, &dst, WorkType::Copy);
    cfg.recurse = true;

    let copy_stats = run_job(cfg, 4, None);
    assert_eq!(copy_stats.copied_files, 2);
    assert_eq!(copy_stats.nonfatal_errors, 0);
    assert_eq!(std::fs::read(dst.join("a.txt")).unwrap(), b"top level file");
    assert_eq!(std::fs::read(dst.join("sub/b.txt")).unwrap(), b"nested file contents");

    let mut cmp_cfg = Config::new(&src, &dst, WorkType::Compare);
    cmp_cfg.recurse = true;
    let sink = CapturingSink::default();
    let cmp_stats = run_job(cmp_cfg, 4, Some(&sink));
    assert_eq!(cmp_stats.examined_files, 2);
    assert_eq!(cmp_stats.nonfatal_errors, 0);

    std::fs::remove_dir_all(&src).unwrap();
    std::fs::remove_dir_all(&dst).unwrap();
}

#[test]
fn compare_reports_different_when_destination_content_diverges() {
    let src = scratch_dir("diff-src");
    let dst = scratch_dir("diff-dst");
    std::fs::write(src.join("f.txt"), b"source bytes").unwrap();
    std::fs::write(dst.join("f.txt"), b"other bytes!").unwrap();

    let mut cfg = Config::new(&src, &dst, WorkType::Compare);
    cfg.recurse = false;
    let stats = run_job(cfg, 2, None);
    assert_eq!(stats.examined_files, 1);

    std::fs::remove_dir_all(&src).unwrap();
    std::fs::remove_dir_all(&dst).unwrap();
}

#[test]
fn list_job_terminates_and_reports_every_file_once() {
    let src = scratch_dir("list-src");
    write_tree(&src);

    let mut cfg = Config::new(&src, &src, WorkType::List);
    cfg.recurse = true;

    // The regression this guards: STAT used to re-enqueue classified items
    // back into the manager's regs/tape queues, which List mode routes right
    // back through STAT, so the job never drained and run_job never returned.
    let stats = run_job(cfg, 3, None);
    assert_eq!(stats.examined_files, 2);
    assert_eq!(stats.nonfatal_errors, 0);

    std::fs::remove_dir_all(&src).unwrap();
}

#[test]
fn large_file_chunking_produces_exactly_one_completion_report() {
    let src = scratch_dir("chunk-src");
    let dst = scratch_dir("chunk-dst");
    std::fs::remove_dir_all(&dst).unwrap();
    let data = vec![9u8; 5 * 1024 * 1024 + 37];
    std::fs::write(src.join("big.bin"), &data).unwrap();

    let mut cfg = Config::new(&src, &dst, WorkType::Copy);
    cfg.recurse = true;
    cfg.chunk_at = 1024 * 1024;
    cfg.chunk_size = 1024 * 1024;

    let stats = run_job(cfg, 4, None);
    assert_eq!(stats.copied_files, 1);
    assert_eq!(stats.copied_bytes as u64, data.len() as u64);

    let copied = std::fs::read(dst.join("big.bin")).unwrap();
    assert_eq!(copied, data);

    std::fs::remove_dir_all(&src).unwrap();
    std::fs::remove_dir_all(&dst).unwrap();
}
