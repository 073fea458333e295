//! Output formatting utilities for CLI.
//!
//! Provides table-based and JSON output modes with optional colorization.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output formatter
pub struct OutputFormatter {
    colored: bool,
    pub json_mode: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(colored: bool, json_mode: bool) -> Self {
        Self { colored, json_mode }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("{} {}", "✓".green().bold(), message.green());
        } else {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("{} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("✗ {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("{} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("⚠ {}", message);
        }
    }

    /// Print a header
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n{}", title.bold().underline());
        } else {
            println!("\n{}", title);
        }
    }

    /// Print key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("  {}: {}", key.bold(), value);
        } else {
            println!("  {}: {}", key, value);
        }
    }

    /// Print as JSON
    pub fn json<T: Serialize>(&self, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        println!("{}", json);
        Ok(())
    }

    /// Print a table
    pub fn table<T: Tabled>(&self, data: Vec<T>) {
        if data.is_empty() {
            self.warning("No certificates to display");
            return;
        }

        let mut table = Table::new(data);
        table.with(Style::rounded());

        println!("\n{}", table);
    }

    /// Output data in the configured format (table or JSON)
    pub fn output<T: Serialize + Tabled>(&self, data: Vec<T>) -> Result<()> {
        if self.json_mode {
            self.json(&data)
        } else {
            self.table(data);
            Ok(())
        }
    }

    /// Format boolean with color
    pub fn format_bool(&self, value: bool) -> String {
        if !self.colored {
            return value.to_string();
        }

        if value {
            "true".green().to_string()
        } else {
            "false".red().to_string()
        }
    }

    /// Format a list, or a dash when it is empty
    pub fn format_list(&self, items: &[String]) -> String {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bool_plain() {
        let formatter = OutputFormatter::new(false, false);
        assert_eq!(formatter.format_bool(true), "true");
        assert_eq!(formatter.format_bool(false), "false");
    }

    #[test]
    fn test_format_list() {
        let formatter = OutputFormatter::new(false, false);
        assert_eq!(formatter.format_list(&[]), "-");
        assert_eq!(
            formatter.format_list(&["a.local".to_string(), "b.local".to_string()]),
            "a.local, b.local"
        );
    }
}
