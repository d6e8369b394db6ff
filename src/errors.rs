//! Context ring buffer + fatal-error reporting.
//!
//! Mirrors the original geoloc's error.cpp: a small ring buffer of the most
//! recent log-context lines (~4 KiB), dumped to stderr alongside the
//! triggering message when something fatal happens. Kept as an explicit
//! thread-local handle rather than process-wide mutable statics.

use std::cell::RefCell;
use std::collections::VecDeque;

const RING_CAPACITY_BYTES: usize = 4096;

thread_local! {
    static CONTEXT: RefCell<ContextRing> = RefCell::new(ContextRing::new());
}

struct ContextRing {
    lines: VecDeque<String>,
    bytes: usize,
}

impl ContextRing {
    fn new() -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
        }
    }

    fn push(&mut self, line: String) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line);

        while self.bytes > RING_CAPACITY_BYTES {
            if let Some(dropped) = self.lines.pop_front() {
                self.bytes -= dropped.len() + 1;
            } else {
                break;
            }
        }
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Append a line to the current thread's context ring buffer.
pub fn log_context(line: impl Into<String>) {
    CONTEXT.with(|c| c.borrow_mut().push(line.into()));
}

/// Render the accumulated context (oldest first).
pub fn dump_context() -> String {
    CONTEXT.with(|c| c.borrow().dump())
}

/// Print `err` plus the accumulated context to stderr and exit the process
/// with status 1. Never returns.
pub fn fatal(err: &anyhow::Error) -> ! {
    eprintln!("error: {err:#}");

    let context = dump_context();
    if !context.is_empty() {
        eprintln!("context:");
        eprint!("{context}");
    }

    std::process::exit(1);
}

/// `REL_ASSERT` equivalent: fail the whole process (with context dump)
/// rather than unwind, matching the original's invariant-violation policy.
macro_rules! rel_assert {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            let err = anyhow::anyhow!($($arg)*);
            $crate::errors::fatal(&err);
        }
    };
}

pub(crate) use rel_assert;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_keeps_most_recent_lines() {
        CONTEXT.with(|c| *c.borrow_mut() = ContextRing::new());

        for i in 0..2000 {
            log_context(format!("line {i}"));
        }

        let dump = dump_context();
        assert!(dump.len() <= RING_CAPACITY_BYTES + 64);
        assert!(dump.contains("line 1999"));
        assert!(!dump.contains("line 0\n"));
    }

    #[test]
    fn dump_is_empty_with_no_context() {
        CONTEXT.with(|c| *c.borrow_mut() = ContextRing::new());
        assert_eq!(dump_context(), "");
    }
}
