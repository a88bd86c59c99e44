use std::io::{self, Write};

use console::style;

use crate::core::StatusSnapshot;
use crate::watch::Notification;

pub fn disable_colors() {
    console::set_colors_enabled(false);
    console::set_colors_enabled_stderr(false);
}

pub fn info(message: &str) {
    let _ = writeln!(io::stderr(), "{}", message);
}

pub fn warn(message: &str) {
    let _ = writeln!(io::stderr(), "{}", style(message).yellow());
}

pub fn error(message: &str) {
    let _ = writeln!(io::stderr(), "{}", style(message).red());
}

pub fn notification(notification: &Notification) {
    warn(&notification.to_string());
}

pub fn render_snapshot(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();
    if let Some(root) = snapshot.root.as_ref() {
        out.push_str(&format!("Root: {}\n", root.display()));
    }
    if snapshot.is_clean() {
        out.push_str("nothing to report, working tree clean\n");
        return out;
    }

    if !snapshot.staged.is_empty() {
        out.push_str("Staged:\n");
        for entry in &snapshot.staged {
            out.push_str(&format!("  {}\n", style(entry.path()).green()));
        }
    }
    if !snapshot.unstaged.is_empty() {
        out.push_str("Unstaged:\n");
        for entry in &snapshot.unstaged {
            out.push_str(&format!("  {}\n", style(entry.path()).red()));
        }
    }
    out
}

pub fn print_snapshot(snapshot: &StatusSnapshot) {
    print!("{}", render_snapshot(snapshot));
    let _ = io::stdout().flush();
}
