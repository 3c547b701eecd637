//! Terminal styling for CLI output.
//!
//! Styles are only applied when the target stream is a terminal, so piped
//! output stays plain.

use is_terminal::IsTerminal;
use owo_colors::{OwoColorize, Style};

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn is_terminal(self) -> bool {
        match self {
            Stream::Stdout => std::io::stdout().is_terminal(),
            Stream::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

fn paint(stream: Stream, style: Style, text: &str) -> String {
    if stream.is_terminal() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Left-align `text` in a column of `width`. Padding is measured on the
/// plain text and added after styling.
pub fn cell<F>(text: &str, width: usize, style: F) -> String
where
    F: FnOnce(&str) -> String,
{
    let pad = width.saturating_sub(text.chars().count());
    format!("{}{}", style(text), " ".repeat(pad))
}

pub fn error(msg: &str) -> String {
    let label = paint(Stream::Stderr, Style::new().red().bold(), "error:");
    format!("{} {}", label, msg)
}

pub fn warning(msg: &str) -> String {
    let label = paint(Stream::Stderr, Style::new().yellow().bold(), "warning:");
    format!("{} {}", label, msg)
}

pub fn success(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().green(), msg)
}

pub fn info(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().cyan(), msg)
}

/// Secondary text, on stdout or stderr.
pub fn dim(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().dimmed(), msg)
}

pub fn dim_err(msg: &str) -> String {
    paint(Stream::Stderr, Style::new().dimmed(), msg)
}

pub fn bold(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().bold(), msg)
}

/// Table column headings.
pub fn header(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().bold().blue(), msg)
}

pub fn path(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().underline(), msg)
}

/// Pin ids and counts.
pub fn number(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().cyan(), msg)
}

/// Zoom and opacity figures.
pub fn figure(msg: &str) -> String {
    paint(Stream::Stdout, Style::new().yellow().bold(), msg)
}

/// "yes" in green or "no" dimmed.
pub fn flag(on: bool) -> String {
    if on {
        paint(Stream::Stdout, Style::new().green(), "yes")
    } else {
        paint(Stream::Stdout, Style::new().dimmed(), "no")
    }
}

/// Export task name, colored by what it leaves behind.
pub fn task(name: &str) -> String {
    let style = match name {
        "save" => Style::new().green(),
        "pin" => Style::new().magenta(),
        "upload" => Style::new().yellow(),
        _ => Style::new().cyan(),
    };
    paint(Stream::Stdout, style, name)
}
