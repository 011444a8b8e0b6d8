use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidAddress,
    DuplicateOwner,
    OwnerNotFound,
    RequirementOutOfRange,
    UnknownTransaction,
    RemoteCall,
    CallTimeout,
    SubscriptionLost,
    SyncFailed,
    SessionClosed,
    StoreLock,
    ConfigError,
    Message,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid address: {input} ({reason})")]
    InvalidAddress { input: String, reason: &'static str },

    #[error("address is already an owner: {0}")]
    DuplicateOwner(String),

    #[error("address is not an owner: {0}")]
    OwnerNotFound(String),

    #[error("requirement {requested} out of range (owners: {owner_count})")]
    RequirementOutOfRange { requested: u32, owner_count: usize },

    #[error("unknown transaction id: {0}")]
    UnknownTransaction(u64),

    #[error("remote call failed during {operation}: {details}")]
    RemoteCall { operation: String, details: String },

    #[error("remote call timed out during {operation} after {timeout_ms}ms")]
    CallTimeout { operation: String, timeout_ms: u64 },

    #[error("event subscription lost: {0}")]
    SubscriptionLost(String),

    #[error("sync failed, no usable cached state: {0}")]
    SyncFailed(String),

    #[error("session closed")]
    SessionClosed,

    #[error("store lock poisoned during {operation}")]
    StoreLock { operation: &'static str },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::InvalidAddress { .. } => ErrorCode::InvalidAddress,
            SyncError::DuplicateOwner(_) => ErrorCode::DuplicateOwner,
            SyncError::OwnerNotFound(_) => ErrorCode::OwnerNotFound,
            SyncError::RequirementOutOfRange { .. } => ErrorCode::RequirementOutOfRange,
            SyncError::UnknownTransaction(_) => ErrorCode::UnknownTransaction,
            SyncError::RemoteCall { .. } => ErrorCode::RemoteCall,
            SyncError::CallTimeout { .. } => ErrorCode::CallTimeout,
            SyncError::SubscriptionLost(_) => ErrorCode::SubscriptionLost,
            SyncError::SyncFailed(_) => ErrorCode::SyncFailed,
            SyncError::SessionClosed => ErrorCode::SessionClosed,
            SyncError::StoreLock { .. } => ErrorCode::StoreLock,
            SyncError::ConfigError(_) => ErrorCode::ConfigError,
            SyncError::Message(_) => ErrorCode::Message,
        }
    }

    /// Locally-checkable precondition failures. These never reach the gateway
    /// and are surfaced immediately to the caller of the mutating operation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::InvalidAddress
                | ErrorCode::DuplicateOwner
                | ErrorCode::OwnerNotFound
                | ErrorCode::RequirementOutOfRange
                | ErrorCode::UnknownTransaction
        )
    }

    pub fn remote_call(operation: impl Into<String>, details: impl ToString) -> Self {
        SyncError::RemoteCall { operation: operation.into(), details: details.to_string() }
    }
}

impl From<hex::FromHexError> for SyncError {
    fn from(err: hex::FromHexError) -> Self {
        SyncError::InvalidAddress { input: err.to_string(), reason: "not valid hex" }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

// NOTE: Avoid adding generic "stringly" error conversions here.
// Use structured `SyncError` variants at the call site to preserve context.
