use console::{style, StyledObject};
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Counts repositories that reached a counted terminal state and prints one status line per
/// increment.
///
/// The increment and its line happen under the same lock, so printed sequence numbers are
/// strictly increasing and never repeat. Diagnostics go to a separate writer and never take
/// the counter lock.
pub struct Progress {
    total: usize,
    state: Mutex<State>,
    diagnostics: Mutex<Box<dyn Write + Send>>,
}

struct State {
    done: usize,
    out: Box<dyn Write + Send>,
}

impl Progress {
    pub fn with_outputs(
        total: usize,
        out: impl Write + Send + 'static,
        diagnostics: impl Write + Send + 'static,
    ) -> Self {
        Progress {
            total,
            state: Mutex::new(State {
                done: 0,
                out: Box::new(out),
            }),
            diagnostics: Mutex::new(Box::new(diagnostics)),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn done(&self) -> usize {
        self.lock().done
    }

    pub fn skipped(&self, name: &str) -> usize {
        self.advance(style("Skipped").yellow(), name, " (already exists)")
    }

    pub fn cloned(&self, name: &str) -> usize {
        self.advance(style("Cloned").green(), name, "")
    }

    /// Writes a line that is not tied to the counter.
    pub fn println(&self, line: &str) {
        let mut state = self.lock();
        if let Err(e) = writeln!(state.out, "{}", line) {
            log::warn!("Failed to write progress: {}", e);
        }
    }

    /// Writes a diagnostic line without touching the counter.
    pub fn eprintln(&self, line: &str) {
        let mut diagnostics = self
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(diagnostics, "{}", line) {
            log::warn!("Failed to write diagnostic: {}", e);
        }
    }

    fn advance(&self, verb: StyledObject<&str>, name: &str, suffix: &str) -> usize {
        let mut state = self.lock();
        state.done += 1;
        let done = state.done;
        let total = self.total;
        if let Err(e) = writeln!(
            state.out,
            "[{}/{}] {} {}{}",
            done,
            total,
            verb,
            style(name).bold(),
            suffix
        ) {
            log::warn!("Failed to write progress: {}", e);
        }
        done
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
