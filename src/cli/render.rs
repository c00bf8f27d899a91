//! Plain-text rendering of frames and messages

use crate::frame::{Frame, Message, MessageLevel};
use colored::*;

/// Title line, view name and pretty-printed props of a frame
pub fn frame_text(frame: &Frame) -> String {
    let title = if frame.title().is_empty() { frame.path.as_str() } else { frame.title() };
    let mut text = format!(
        "{}  {} {}\n{} {}\n",
        title.bright_white().bold(),
        frame.path.bright_blue(),
        frame.id.to_string().dimmed(),
        "view:".dimmed(),
        frame.view.bright_cyan()
    );
    if !frame.props.is_null() {
        let props = serde_json::to_string_pretty(&frame.props).unwrap_or_else(|_| frame.props.to_string());
        for line in props.lines() {
            text.push_str("  ");
            text.push_str(line);
            text.push('\n');
        }
    }
    text
}

/// A frame drawn inside a box, used for overlays
pub fn overlay_text(frame: &Frame) -> String {
    let body = frame_text(frame);
    let mut text = format!("{}\n", "┌─ overlay ─────────────────────────".bright_magenta());
    for line in body.lines() {
        text.push_str(&format!("{} {}\n", "│".bright_magenta(), line));
    }
    text.push_str(&format!("{}\n", "└───────────────────────────────────".bright_magenta()));
    text
}

pub fn message_line(message: &Message) -> String {
    let marker = match message.level {
        MessageLevel::Info => "ℹ".bright_blue().bold(),
        MessageLevel::Success => "✓".bright_green().bold(),
        MessageLevel::Warning => "⚠".bright_yellow().bold(),
        MessageLevel::Error => "✗".bright_red().bold(),
    };
    format!("{} {}", marker, message.text)
}
