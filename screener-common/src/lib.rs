//! Screener Common - shared configuration, errors, and logging.
//!
//! This crate provides:
//! - Configuration types and loading with env overrides
//! - Configuration validation
//! - Error types
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    Config, DataSourceSettings, ObservabilityConfig, OutputSettings, ReversalSettings,
    ScreenerSettings, TrendSettings,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
