//! Collapsible log sections.
//!
//! Under GitHub Actions a section is wrapped in `::group::` / `::endgroup::`
//! so the runner folds it. Interactively it gets a `==== name ====` banner
//! and the phase duration when it closes.

use std::io::Write;
use std::time::Instant;

/// An open log section. Closes when dropped.
pub struct LogGroup {
    name: String,
    ci: bool,
    start: Instant,
}

impl LogGroup {
    /// Open a section.
    pub fn start(name: &str, ci: bool) -> Self {
        if ci {
            println!("::group::{}", name);
        } else {
            println!("==== {} ====", name);
        }
        flush();
        Self {
            name: name.to_string(),
            ci,
            start: Instant::now(),
        }
    }
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        if self.ci {
            println!("::endgroup::");
        } else {
            let secs = self.start.elapsed().as_secs_f64();
            if secs >= 60.0 {
                println!("  [{:.1}m] {}", secs / 60.0, self.name);
            } else {
                println!("  [{:.1}s] {}", secs, self.name);
            }
        }
        flush();
    }
}

fn flush() {
    std::io::stdout().flush().ok();
    std::io::stderr().flush().ok();
}

/// Run `f` inside a section.
pub fn grouped<T>(name: &str, ci: bool, f: impl FnOnce() -> T) -> T {
    let _group = LogGroup::start(name, ci);
    f()
}
