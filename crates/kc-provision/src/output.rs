//! Output formatting utilities.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prints a section heading.
pub fn heading(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count().max(40)));
}

/// Prints an indented `label: value` line.
pub fn detail(label: &str, value: &str) {
    println!("   - {}: {}", label.dimmed(), value);
}

/// Prints rows as a rounded table.
pub fn table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        info("No results.");
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

/// Prompts for password input (hidden).
pub fn prompt_password(prompt: &str) -> crate::ProvisionResult<String> {
    rpassword::prompt_password(prompt).map_err(crate::ProvisionError::Io)
}
