//! Configuration validation.
//!
//! Checks that every configured value is present and within range before
//! a scan starts, so a bad file fails fast instead of mid-run.

use thiserror::Error;

use crate::config::{Config, ObservabilityConfig, OutputSettings, ScreenerSettings};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Fold a list of errors into a single result.
fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.screener.validate() {
            errors.push(e);
        }

        collect(errors)
    }

    /// Load (with env overrides) and validate configuration.
    pub fn load_and_validate(path: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let config = Self::load_with_env(path)?;
        config.validate().map_err(crate::error::Error::from)?;
        Ok(config)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid(
                "observability.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(invalid(
                "observability.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }
}

impl Validate for ScreenerSettings {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.market.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "screener.market".into(),
            });
        }

        let drop = self.reversal.drop_threshold;
        if !(drop > 0.0 && drop < 1.0) {
            errors.push(invalid(
                "screener.reversal.drop_threshold",
                "must be within (0, 1)",
            ));
        }

        let recover = self.reversal.recover_threshold;
        if !(recover > 0.0 && recover < 1.0) {
            errors.push(invalid(
                "screener.reversal.recover_threshold",
                "must be within (0, 1)",
            ));
        }

        let margin = self.trend.ma_margin;
        if !(0.0..1.0).contains(&margin) {
            errors.push(invalid("screener.trend.ma_margin", "must be within [0, 1)"));
        }

        if self.max_tickers == 0 {
            errors.push(invalid("screener.max_tickers", "must be greater than 0"));
        }

        if self.batch_size == 0 {
            errors.push(invalid("screener.batch_size", "must be greater than 0"));
        }

        if self.lookback_years == 0 {
            errors.push(invalid("screener.lookback_years", "must be greater than 0"));
        }

        if self.data.rate_limit_rpm == 0 {
            errors.push(invalid("screener.data.rate_limit_rpm", "must be greater than 0"));
        }

        if let Err(e) = self.output.validate() {
            errors.push(e);
        }

        collect(errors)
    }
}

impl Validate for OutputSettings {
    fn validate(&self) -> ValidationResult<()> {
        let valid_formats = ["markdown", "md", "json"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(invalid(
                "screener.output.format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !(2..=3).contains(&self.columns) {
            return Err(invalid("screener.output.columns", "must be 2 or 3"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
