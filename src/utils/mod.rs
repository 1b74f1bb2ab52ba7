pub mod fd_limit;
pub mod logger;

pub use fd_limit::{max_open_fds, max_workers_by_fd_limit, FDS_PER_WORKER};
pub use logger::setup_logging;
