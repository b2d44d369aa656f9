use std::io::{self, Write};
use std::time::Instant;

/// Stderr progress reporter prefixed with elapsed time. A disabled instance
/// swallows everything, so library callers can pass one unconditionally and
/// tests stay quiet.
pub struct ConsoleProgress {
    enabled: bool,
    started: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(msg.as_ref());
    }

    pub fn progress(&self, label: &str, current: usize, total: usize) {
        let total = total.max(1);
        let pct = current.min(total) * 100 / total;
        self.emit(&format!("{label} {current}/{total} ({pct}%)"));
    }

    fn emit(&self, line: &str) {
        if !self.enabled {
            return;
        }
        let elapsed = self.started.elapsed().as_secs();
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{:02}:{:02}] {line}", elapsed / 60, elapsed % 60);
    }
}
