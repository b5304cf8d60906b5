use crossterm::execute;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use nexplorer_core::{
    ActivityLog, DirectoryEntry, LogEntry, LogLevel, Preview, PreviewBody, Prompt, SessionState,
};
use std::io::{self, Write};

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::User => Color::White,
        LogLevel::Ai => Color::Cyan,
        LogLevel::System => Color::DarkGrey,
        LogLevel::Success => Color::Green,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Error => Color::Red,
    }
}

pub fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "[{}] {}: {}",
        entry.at.format("%H:%M:%S"),
        entry.level.label(),
        entry.message
    )
}

pub fn format_entry(entry: &DirectoryEntry) -> String {
    if entry.is_dir() {
        format!("  {}/", entry.name)
    } else {
        format!("  {:<40} {:>8}", entry.name, entry.size_display)
    }
}

pub fn format_preview(preview: &Preview) -> String {
    let body = match &preview.body {
        PreviewBody::Directory => "[Directory Selected]".to_string(),
        PreviewBody::Image => "[Image preview unavailable]".to_string(),
        PreviewBody::Text(text) if text.is_empty() => "[Empty file]".to_string(),
        PreviewBody::Text(text) => text.clone(),
        PreviewBody::Unreadable(reason) => format!("[Could not read file: {reason}]"),
    };
    format!(
        "--- {} ({}) ---\n{}",
        preview.path, preview.entry.size_display, body
    )
}

pub fn print_new_log(log: &ActivityLog, cursor: &mut u64) -> io::Result<()> {
    let mut out = io::stdout();
    for entry in log.since(*cursor) {
        execute!(
            out,
            SetForegroundColor(level_color(entry.level)),
            Print(format_log_line(entry)),
            ResetColor,
            Print("\n")
        )?;
    }
    *cursor = log.next_seq();
    Ok(())
}

pub fn print_listing(state: &SessionState) -> io::Result<()> {
    let mut out = io::stdout();
    execute!(
        out,
        SetAttribute(Attribute::Bold),
        Print(format!("{} ({} entries)\n", state.current_path(), state.listing.len())),
        SetAttribute(Attribute::Reset)
    )?;
    for entry in &state.listing {
        let color = if entry.is_dir() { Color::Blue } else { Color::Reset };
        execute!(
            out,
            SetForegroundColor(color),
            Print(format_entry(entry)),
            ResetColor,
            Print("\n")
        )?;
    }
    Ok(())
}

pub fn print_preview(preview: &Preview) -> io::Result<()> {
    let mut out = io::stdout();
    writeln!(out, "{}", format_preview(preview))?;
    out.flush()
}

pub fn print_prompt(prompt: &Prompt) -> io::Result<()> {
    let mut out = io::stdout();
    execute!(
        out,
        SetForegroundColor(Color::Yellow),
        SetAttribute(Attribute::Bold),
        Print(format!("\n{}\n", prompt.title)),
        SetAttribute(Attribute::Reset),
        ResetColor,
        Print(format!("{}\n[y/N] ", prompt.message))
    )?;
    out.flush()
}

pub fn print_input_marker(state: &SessionState) -> io::Result<()> {
    let mut out = io::stdout();
    let busy = if state.is_busy() { " [thinking]" } else { "" };
    execute!(
        out,
        SetForegroundColor(Color::DarkGrey),
        Print(format!("{}:{}{}", state.mode.label(), state.current_path(), busy)),
        ResetColor,
        Print("> ")
    )?;
    out.flush()
}

pub fn print_text(text: &str) -> io::Result<()> {
    let mut out = io::stdout();
    writeln!(out, "{text}")?;
    out.flush()
}
