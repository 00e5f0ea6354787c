//! CLI theme and styling.

use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(60).dimmed().to_string()
    }

    /// Color the leading `PASS`/`FAIL` token of each text report line.
    pub(crate) fn report(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for line in text.lines() {
            let styled = if let Some(rest) = line.strip_prefix("PASS") {
                format!("{}{rest}", "PASS".green().bold())
            } else if let Some(rest) = line.strip_prefix("FAIL") {
                format!("{}{rest}", "FAIL".red().bold())
            } else if line.starts_with("  - ") {
                line.yellow().to_string()
            } else {
                line.to_owned()
            };
            out.push_str(&styled);
            out.push('\n');
        }
        out
    }
}
