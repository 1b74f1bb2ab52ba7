//! pftool demo binary: wires `Config` and the role topology together for a
//! single local run. The real command-line parser is out of scope for this
//! crate (spec.md §1); this is just enough argument handling to drive the
//! THREADS_ONLY topology end to end.

use pftool_core::{run_job, Config, WorkType};
use std::env;
use std::process::ExitCode;

fn usage(program: &str) -> String {
    format!("usage: {program} <src> <dest> [copy|compare|list] [num_workers]")
}

fn main() -> ExitCode {
    pftool_core::utils::setup_logging(env::var("PFTOOL_VERBOSE").is_ok());

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("{}", usage(&args[0]));
        return ExitCode::FAILURE;
    }

    let work_type = match args.get(3).map(String::as_str) {
        None | Some("copy") => WorkType::Copy,
        Some("compare") => WorkType::Compare,
        Some("list") => WorkType::List,
        Some(other) => {
            eprintln!("unknown work type '{other}'\n{}", usage(&args[0]));
            return ExitCode::FAILURE;
        }
    };

    let num_workers = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .or_else(pftool_core::utils::max_workers_by_fd_limit)
        .unwrap_or(4)
        .max(1);

    let cfg = Config::new(&args[1], &args[2], work_type);
    let stats = run_job(cfg, num_workers, None);
    log::info!("{}", stats.summary_line());
    println!("{}", stats.summary_line());

    ExitCode::SUCCESS
}
