//! Series repository abstraction.
//!
//! Defines the `SeriesRepository` trait the batch scanner fetches from.
//! A repository receives one batch of symbols and answers with whatever
//! it could find; symbols it does not know are simply absent.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use super::{Lookback, RawBar, Timeframe};

/// Bars per symbol for one batch request.
pub type SeriesBatch = HashMap<String, Vec<RawBar>>;

// ============================================================================
// Provider Error
// ============================================================================

/// Errors raised by series repositories.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Rate limit exceeded
    RateLimited { retry_after_secs: Option<u64> },
    /// No data for the requested symbol
    DataNotAvailable(String),
    /// Repository is temporarily unavailable
    Unavailable(String),
    /// Response could not be decoded
    InvalidResponse(String),
    /// Invalid request parameters
    InvalidRequest(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::Unavailable(msg) => write!(f, "Repository unavailable: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Check if the error is transient (worth retrying later)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }

    /// Check if the error only means "this symbol has no data"
    pub fn is_missing_symbol(&self) -> bool {
        matches!(self, Self::DataNotAvailable(_))
    }
}

// ============================================================================
// Series Repository Trait
// ============================================================================

/// Source of OHLC history for a batch of symbols.
///
/// The batch fetch is one operation with one outcome: an `Err` means the
/// whole batch is unusable. Implementations may fetch symbols
/// concurrently, and must omit unknown symbols instead of failing.
#[async_trait]
pub trait SeriesRepository: Send + Sync {
    /// Repository name for logging (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch bars for every symbol in `symbols`.
    async fn fetch(
        &self,
        symbols: &[String],
        lookback: Lookback,
        interval: Timeframe,
    ) -> Result<SeriesBatch, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_recoverable() {
        assert!(ProviderError::Network("timeout".into()).is_recoverable());
        assert!(ProviderError::RateLimited { retry_after_secs: Some(60) }.is_recoverable());
        assert!(ProviderError::Unavailable("maintenance".into()).is_recoverable());
        assert!(!ProviderError::DataNotAvailable("no data".into()).is_recoverable());
        assert!(!ProviderError::InvalidResponse("bad json".into()).is_recoverable());
    }

    #[test]
    fn test_missing_symbol() {
        assert!(ProviderError::DataNotAvailable("ZZZZ.T".into()).is_missing_symbol());
        assert!(!ProviderError::Network("reset".into()).is_missing_symbol());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(err.to_string().contains("30 seconds"));

        let err = ProviderError::Network("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
