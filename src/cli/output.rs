use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use colored::Colorize;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);

/// Turns ANSI styling on or off; `NO_COLOR` always wins.
pub fn set_color_enabled(enabled: bool) {
    let allowed = enabled && std::env::var_os("NO_COLOR").is_none();
    COLOR_ENABLED.store(allowed, Ordering::Relaxed);
    colored::control::set_override(allowed);
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Info => "INFO",
        MessageKind::Success => "SUCCESS",
        MessageKind::Warning => "WARNING",
        MessageKind::Error => "ERROR",
        MessageKind::Hint => "HINT",
        MessageKind::Section => "",
    }
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        _ => format!("{}: {}", label(kind), text),
    };

    if !COLOR_ENABLED.load(Ordering::Relaxed) {
        return formatted;
    }

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Hint => formatted.bright_cyan().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{formatted}"),
        _ => println!("{formatted}"),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Prints rows under a header with columns padded to their widest cell.
/// Columns after the first are right-aligned.
pub fn table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.len()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let header = render_row(&header_cells, &widths);
    if COLOR_ENABLED.load(Ordering::Relaxed) {
        println!("{}", header.bold());
    } else {
        println!("{header}");
    }
    println!("{}", "-".repeat(header.chars().count()));
    for row in rows {
        println!("{}", render_row(row, &widths));
    }
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, width))| {
            if idx == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Amount with thousands separators and two decimals, e.g. `PKR 12,000.00`.
pub fn money(amount: f64, currency: &str) -> String {
    format!("{currency} {}", group_thousands(amount))
}

pub fn group_thousands(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::new();
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(12_000.0), "12,000.00");
        assert_eq!(group_thousands(999.5), "999.50");
        assert_eq!(group_thousands(-1_234_567.891), "-1,234,567.89");
        assert_eq!(money(500.0, "PKR"), "PKR 500.00");
    }

    #[test]
    fn plain_style_has_labels() {
        set_color_enabled(false);
        assert_eq!(apply_style(MessageKind::Warning, "careful"), "WARNING: careful");
        assert_eq!(apply_style(MessageKind::Section, " Report "), "=== Report ===");
    }
}
