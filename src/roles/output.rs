//! Output role (spec.md §4.1): the only role permitted to touch stdout or the
//! log sink. Serializes `OUT`/`LOG`/`BUFFEROUT` lines.

use super::RoleId;
use crate::protocol::Command;
use crossbeam_channel::Receiver;

/// Pluggable log sink. The core does not own a concrete sink (spec.md §1);
/// the owning binary supplies one (or none) for `LOG` lines.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

pub fn run(_rank: RoleId, inbox: &Receiver<super::Envelope>, sink: Option<&dyn LogSink>) {
    loop {
        let envelope = match inbox.recv() {
            Ok(e) => e,
            Err(_) => return,
        };

        match envelope.cmd {
            Command::Exit => return,
            Command::Out { line } => println!("{line}"),
            Command::Log { line } => {
                println!("{line}");
                if let Some(sink) = sink {
                    sink.log(&line);
                }
            }
            Command::BufferOut { lines } => {
                for line in lines {
                    println!("{line}");
                }
            }
            _ => {}
        }
    }
}
