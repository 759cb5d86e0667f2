//! Domain error types.

/// Top-level error type for tickercompare.
#[derive(Debug, thiserror::Error)]
pub enum TickerCompareError {
    #[error("{reason}")]
    Retrieval { symbol: String, reason: String },

    #[error("No data found for {symbol}")]
    NoData { symbol: String },

    #[error("row {row}: {reason}")]
    Coercion { row: usize, reason: String },

    #[error("Invalid period. Valid periods are: 1mo, 3mo, 6mo, 1y, 2y, 5y")]
    InvalidPeriod { value: String },

    #[error(
        "Invalid interval '{value}'. Valid intervals are: 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo"
    )]
    InvalidInterval { value: String },

    #[error("invalid strategy selector: {reason}")]
    InvalidStrategy { reason: String },

    #[error("failed to launch backtest for {symbol}: {reason}")]
    ProcessLaunch { symbol: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    Persist { path: String, reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{message}")]
    Usage { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TickerCompareError> for std::process::ExitCode {
    fn from(err: &TickerCompareError) -> Self {
        let code: u8 = match err {
            TickerCompareError::Io(_)
            | TickerCompareError::Persist { .. }
            | TickerCompareError::Serialization(_) => 1,
            TickerCompareError::ConfigParse { .. }
            | TickerCompareError::ConfigMissing { .. }
            | TickerCompareError::ConfigInvalid { .. }
            | TickerCompareError::Usage { .. } => 2,
            TickerCompareError::ProcessLaunch { .. } => 3,
            TickerCompareError::InvalidPeriod { .. }
            | TickerCompareError::InvalidInterval { .. }
            | TickerCompareError::InvalidStrategy { .. } => 4,
            TickerCompareError::Retrieval { .. }
            | TickerCompareError::NoData { .. }
            | TickerCompareError::Coercion { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
