//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use allot_domain::{Pool, PoolOperationCallback};
use allot_gatekeeper::ValidationResult;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the validation result for one pool.
    pub fn format_result(&self, pool_id: &str, result: &ValidationResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "pool": pool_id,
                "successful": result.is_successful(),
                "errors": result.errors(),
                "warnings": result.warnings(),
            }))?),
            OutputFormat::Table => Ok(self.format_result_table(pool_id, result)),
        }
    }

    fn format_result_table(&self, pool_id: &str, result: &ValidationResult) -> String {
        let verdict = if result.is_successful() {
            self.success(&format!("Pool {} passes all rules", pool_id))
        } else {
            self.error(&format!("Pool {} fails {} rule(s)", pool_id, result.errors().len()))
        };

        if !result.has_errors() && !result.has_warnings() {
            return verdict;
        }

        let mut builder = Builder::default();
        builder.push_record(["Kind", "Key", "Details"]);
        for error in result.errors() {
            let details = error.message.clone().unwrap_or_else(|| error.args.join(", "));
            builder.push_record([self.colorize("error", "red"), error.key.clone(), details]);
        }
        for warning in result.warnings() {
            builder.push_record([
                self.colorize("warning", "yellow"),
                warning.key.clone(),
                warning.args.join(", "),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        format!("{}\n{}", verdict, table)
    }

    /// Format a list of pools.
    pub fn format_pools(&self, pools: &[&Pool]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(pools)?),
            OutputFormat::Table => {
                if pools.is_empty() {
                    return Ok(self.colorize("No pools available.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["ID", "Product", "Quantity", "Consumed", "Exported", "Ends"]);
                for pool in pools {
                    builder.push_record([
                        pool.id.clone(),
                        pool.product_id.clone(),
                        pool.quantity.to_string(),
                        pool.consumed.to_string(),
                        pool.exported.to_string(),
                        pool.end_date.to_string(),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format the pool operations produced by a bind or unbind.
    pub fn format_callback(&self, callback: &PoolOperationCallback) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "created": callback.pools_to_create(),
                "quantities": callback.final_quantities(),
            }))?),
            OutputFormat::Table => {
                if callback.is_empty() {
                    return Ok(self.info("No pool changes."));
                }

                let mut builder = Builder::default();
                builder.push_record(["Operation", "Pool", "Quantity"]);
                for pool in callback.pools_to_create() {
                    builder.push_record(["create".to_string(), pool.id.clone(), pool.quantity.to_string()]);
                }
                for (pool_id, quantity) in callback.final_quantities() {
                    builder.push_record(["set quantity".to_string(), pool_id, quantity.to_string()]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
