//! Result card rendering.
//!
//! Renders a [`ScanReport`] as:
//! - Markdown (a grid of cards, 2 or 3 per row, for terminals and docs)
//! - JSON (the full report, series included, for other front ends)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use screener_common::config::OutputSettings;

use super::result::{ScanReport, ScanResult};
use crate::strategy::format_price;

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Markdown card grid (human-readable)
    Markdown,
    /// JSON document (machine-readable)
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Sparkline
// ============================================================================

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Block-character sparkline of `values`; a flat input draws a flat line.
pub fn sparkline(values: &[f64]) -> String {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    let top = (SPARK_LEVELS.len() - 1) as f64;

    values
        .iter()
        .map(|&v| {
            let level = if span > 0.0 {
                ((v - min) / span * top).round() as usize
            } else {
                SPARK_LEVELS.len() / 2
            };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

// ============================================================================
// Card Renderer
// ============================================================================

/// Turns scan reports into text.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    format: ReportFormat,
    columns: usize,
    sparkline_width: usize,
}

impl Default for CardRenderer {
    fn default() -> Self {
        Self {
            format: ReportFormat::Markdown,
            columns: 3,
            sparkline_width: 26,
        }
    }
}

impl CardRenderer {
    /// Create a renderer; `columns` must be 2 or 3.
    pub fn new(format: ReportFormat, columns: usize) -> Result<Self> {
        if !(2..=3).contains(&columns) {
            bail!("columns must be 2 or 3, got {}", columns);
        }
        Ok(Self {
            format,
            columns,
            ..Self::default()
        })
    }

    /// Create from output settings.
    pub fn from_settings(settings: &OutputSettings) -> Result<Self> {
        let format = settings
            .format
            .parse::<ReportFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(Self::new(format, settings.columns)?.with_sparkline_width(settings.sparkline_width))
    }

    pub fn with_sparkline_width(mut self, width: usize) -> Self {
        self.sparkline_width = width;
        self
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    /// Render in the configured format.
    pub fn render(&self, report: &ScanReport) -> Result<String> {
        match self.format {
            ReportFormat::Markdown => Ok(self.to_markdown(report)),
            ReportFormat::Json => self.to_json(report),
        }
    }

    /// Render and save; adds the format's extension when `path` has none.
    pub fn save_to_file(&self, report: &ScanReport, path: &Path) -> Result<PathBuf> {
        let content = self.render(report)?;

        let file_path = if path.extension().is_none() {
            path.with_extension(self.format.extension())
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create report directory")?;
        }

        std::fs::write(&file_path, content).context("Failed to write report file")?;

        Ok(file_path)
    }

    /// Generate the markdown card grid.
    pub fn to_markdown(&self, report: &ScanReport) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "# Weekly Screener: {}\n\n**Scan ID**: {}\n**Market**: {}\n**Time**: {}\n**Duration**: {:.1}s\n\n",
            report.strategy.title(),
            report.id,
            report.market,
            report.completed_at.format("%Y-%m-%d %H:%M:%S"),
            report.duration_secs
        ));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Scanned**: {} symbols\n", report.stats.symbols_requested));
        md.push_str(&format!("- **Matched**: {}\n", report.stats.matched));
        md.push_str(&format!("- **No match**: {}\n", report.stats.not_matched));
        md.push_str(&format!("- **Skipped (data)**: {}\n", report.stats.data_problems()));
        md.push_str(&format!(
            "- **Failed batches**: {} / {}\n\n",
            report.stats.batches_failed, report.stats.batches_total
        ));

        md.push_str(&format!("## Matches ({})\n\n", report.results.len()));

        if report.results.is_empty() {
            md.push_str("_No tickers matched the conditions._\n");
            return md;
        }

        md.push('|');
        md.push_str(&" |".repeat(self.columns));
        md.push('\n');
        md.push('|');
        md.push_str(&"---|".repeat(self.columns));
        md.push('\n');

        let cards: Vec<String> = report
            .results
            .iter()
            .map(|r| self.card(r, report.market.currency()))
            .collect();

        for row in cards.chunks(self.columns) {
            md.push('|');
            for i in 0..self.columns {
                md.push(' ');
                md.push_str(row.get(i).map(String::as_str).unwrap_or(""));
                md.push_str(" |");
            }
            md.push('\n');
        }

        md
    }

    /// One card as a single table cell.
    fn card(&self, result: &ScanResult, currency: &str) -> String {
        let mut lines = vec![
            format!("**{}**", escape_cell(&result.display_name)),
            format!(
                "`{}` · {}{}",
                result.ticker,
                currency,
                format_price(result.current_price)
            ),
        ];

        for metric in &result.metrics {
            lines.push(format!("{}: {}", metric.label, metric.formatted()));
        }

        let closes: Vec<f64> = result
            .series
            .tail(self.sparkline_width)
            .iter()
            .map(|b| b.close)
            .collect();
        if !closes.is_empty() && self.sparkline_width > 0 {
            lines.push(format!("`{}`", sparkline(&closes)));
        }

        lines.join("<br>")
    }

    /// Generate the JSON report.
    pub fn to_json(&self, report: &ScanReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize report")
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

// ============================================================================
// Tests
// ============================================================================
