//! Terminal output: status notes on stderr, events as JSON lines on stdout.

use std::io::Write;

use tessera_core::DashboardEvent;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

pub fn note_success(msg: &str) {
    if supports_color() {
        eprintln!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        eprintln!("OK: {msg}");
    }
}

/// One event per line, in its wire form.
pub fn event_line(event: &DashboardEvent) -> String {
    serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"type\":\"{}\",\"error\":\"{e}\"}}", event.kind))
}

/// Write a line and flush, ignoring a closed pipe.
pub fn write_line(writer: &mut impl Write, line: &str) {
    let _ = writeln!(writer, "{line}").and_then(|_| writer.flush());
}
