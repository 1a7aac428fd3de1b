//! Batch screening.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   batches of 20   ┌──────────────────┐
//! │ TickerUniverse│ ────────────────▶ │ SeriesRepository │
//! │ (capped head) │                   │   (one fetch)    │
//! └──────────────┘                   └────────┬─────────┘
//!                                             │ RawBar per symbol
//!                                             ▼
//!                       clean ─▶ ScreeningStrategy::evaluate
//!                                             │
//!              ┌──────────────────────────────┴───────────┐
//!              ▼                                          ▼
//!        ScanResults (matches, scan order)         ScanStats (skips)
//!              │
//!              ▼
//!        CardRenderer (markdown grid / JSON)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use weekly_screener::screener::{BatchScanner, ScanConfig};
//!
//! let scanner = BatchScanner::new(ScanConfig::from_config(&config)?, repository)?;
//! let report = scanner.run(&universe, &mut |done, total| {
//!     eprintln!("batch {}/{}", done, total);
//! }).await?;
//! ```

pub mod config;
pub mod engine;
pub mod report;
pub mod result;

pub use config::{ScanConfig, ScanError};
pub use engine::{BatchScanner, NoProgress, ProgressSink};
pub use report::{sparkline, CardRenderer, ReportFormat};
pub use result::{ScanReport, ScanResult, ScanResults, ScanStats};
