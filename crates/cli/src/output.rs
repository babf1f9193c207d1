//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use ids_lib::{fields::FieldKind, Verdict};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table, or the items as JSON
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Verdict banner: red for intrusions, green for normal traffic
pub fn format_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Intrusion => format!("🚨 {} 🚨", verdict).red().bold().to_string(),
        Verdict::Normal => format!("✅ {}", verdict).green().bold().to_string(),
    }
}

/// Feature value without a trailing `.0` for whole numbers
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Human-readable description of a field's accepted values
pub fn format_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Count { min } => format!("integer >= {}", format_value(*min)),
        FieldKind::Ratio { min, max } => {
            format!("{} to {}", format_value(*min), format_value(*max))
        }
        FieldKind::Choice { options } => options
            .iter()
            .map(|o| format_value(*o))
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" | "normal" => status.green().to_string(),
        "degraded" | "defaulted" => status.yellow().to_string(),
        "unhealthy" | "intrusion" | "ignored" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Format a unix timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}
