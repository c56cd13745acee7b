//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction so the REPL does
//! not care how a transcript line reaches the terminal.  The default
//! implementation prints bubbles with ANSI escape codes, one color per author.

use std::io::{self, Stdout, Write};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::session::SessionStatus;
use crate::transcript::{Author, Transcript, TranscriptEntry};

/// ANSI escape code for dim text (used for timestamps).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the local author).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the remote author).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for yellow text (used while connecting).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one transcript line.
    fn print_entry(&mut self, entry: &TranscriptEntry);

    /// Print a whole transcript, oldest first.
    fn print_transcript(&mut self, transcript: &Transcript) {
        if transcript.is_empty() {
            self.print_info("(no messages yet)");
        }
        for entry in transcript {
            self.print_entry(entry);
        }
    }

    /// Print the session status.
    fn print_status(&mut self, status: SessionStatus);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    offset: UtcOffset,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        }
    }

    /// Formats one transcript line without printing it.
    pub fn format_entry(&self, entry: &TranscriptEntry) -> String {
        let (label, color) = match entry.author {
            Author::Local => ("You", ANSI_CYAN),
            Author::Remote => ("Server", ANSI_GREEN),
        };
        let time = self.format_time(entry.at);
        if self.use_color {
            format!(
                "{ANSI_DIM}[{time}]{ANSI_RESET} {color}{label}:{ANSI_RESET} {}",
                entry.text
            )
        } else {
            format!("[{time}] {label}: {}", entry.text)
        }
    }

    /// Formats the session status without printing it.
    pub fn format_status(&self, status: SessionStatus) -> String {
        let text = match status {
            SessionStatus::Idle => "Not connected.",
            SessionStatus::Connecting => "Connecting...",
            SessionStatus::Connected => "Connected.",
            SessionStatus::Failed => "Not connected (last attempt failed; /connect to retry).",
        };
        if !self.use_color {
            return text.to_string();
        }
        let color = match status {
            SessionStatus::Idle => ANSI_DIM,
            SessionStatus::Connecting => ANSI_YELLOW,
            SessionStatus::Connected => ANSI_GREEN,
            SessionStatus::Failed => ANSI_RED,
        };
        format!("{color}{text}{ANSI_RESET}")
    }

    fn format_time(&self, at: OffsetDateTime) -> String {
        at.to_offset(self.offset)
            .format(TIME_FORMAT)
            .unwrap_or_default()
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_entry(&mut self, entry: &TranscriptEntry) {
        println!("{}", self.format_entry(entry));
        self.flush();
    }

    fn print_status(&mut self, status: SessionStatus) {
        println!("{}", self.format_status(status));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error:{ANSI_RESET} {error}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}
