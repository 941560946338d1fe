//! Domain error types.

/// Why a single buy or sell was refused by the ledger.
///
/// These are expected, recoverable outcomes inside a run: strategies inspect
/// them and decide whether to skip the opportunity, square off, or halt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("trade quantity must be positive and fit a position")]
    InvalidQuantity,

    #[error("invalid unit price: {price}")]
    InvalidPrice { price: f64 },

    #[error("insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("insufficient shares of {instrument}: requested {requested}, held {held}")]
    InsufficientShares {
        instrument: String,
        requested: u64,
        held: i64,
    },
}

/// Top-level error type for stocksim.
#[derive(Debug, thiserror::Error)]
pub enum StocksimError {
    #[error("price series for {instrument} is empty")]
    EmptySeries { instrument: String },

    #[error("snapshot key cannot be empty")]
    EmptyKey,

    #[error("data unavailable for {instrument}: {reason}")]
    DataUnavailable { instrument: String, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StocksimError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        StocksimError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn data_unavailable(instrument: &str, reason: impl Into<String>) -> Self {
        StocksimError::DataUnavailable {
            instrument: instrument.to_string(),
            reason: reason.into(),
        }
    }

    /// Short taxonomy label used when a request is rejected at the boundary.
    pub fn label(&self) -> &'static str {
        match self {
            StocksimError::EmptySeries { .. } => "EmptySeries",
            StocksimError::EmptyKey => "EmptyKey",
            StocksimError::DataUnavailable { .. } => "DataUnavailable",
            StocksimError::InvalidParameter { .. } => "InvalidParameter",
            StocksimError::Database { .. } | StocksimError::DatabaseQuery { .. } => "Database",
            StocksimError::Snapshot(_) => "Snapshot",
            StocksimError::ConfigParse { .. }
            | StocksimError::ConfigMissing { .. }
            | StocksimError::ConfigInvalid { .. } => "Config",
            StocksimError::Io(_) => "Io",
        }
    }
}

impl From<&StocksimError> for std::process::ExitCode {
    fn from(err: &StocksimError) -> Self {
        let code: u8 = match err {
            StocksimError::Io(_) => 1,
            StocksimError::ConfigParse { .. }
            | StocksimError::ConfigMissing { .. }
            | StocksimError::ConfigInvalid { .. } => 2,
            StocksimError::Database { .. }
            | StocksimError::DatabaseQuery { .. }
            | StocksimError::Snapshot(_) => 3,
            StocksimError::InvalidParameter { .. } | StocksimError::EmptyKey => 4,
            StocksimError::DataUnavailable { .. } | StocksimError::EmptySeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
