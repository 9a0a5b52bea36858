use cpk_calendar::CalendarError;
use cpk_money::MoneyError;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Typed failure returned by every public operation of the engine.
///
/// Each kind has a stable machine code (`code()`) for callers to branch on;
/// the `Display` output is the human message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed amount, date, recurrence or command. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Referenced record is absent or belongs to another tenant.
    #[error("not found: {0}")]
    NotFound(String),

    /// The record is in a state that forbids the operation.
    #[error("conflict: {0}")]
    ConflictState(String),

    /// A cent-exact invariant failed. The operation must abort.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    /// Index-rate, ingestion or persistence collaborator failed.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgument(_) => "INVALID_ARGUMENT",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::ConflictState(_) => "CONFLICT_STATE",
            CoreError::InternalConsistency(_) => "INTERNAL_CONSISTENCY",
            CoreError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
        }
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            CoreError::InvalidArgument(m)
            | CoreError::NotFound(m)
            | CoreError::ConflictState(m)
            | CoreError::InternalConsistency(m)
            | CoreError::UpstreamUnavailable(m) => m,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::UpstreamUnavailable(_))
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::ConflictState(msg.into())
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{what} {id}"))
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        CoreError::UpstreamUnavailable(msg.into())
    }
}

impl From<MoneyError> for CoreError {
    fn from(e: MoneyError) -> Self {
        if e.is_internal() {
            CoreError::InternalConsistency(e.to_string())
        } else {
            CoreError::InvalidArgument(e.to_string())
        }
    }
}

impl From<CalendarError> for CoreError {
    fn from(e: CalendarError) -> Self {
        CoreError::InvalidArgument(e.to_string())
    }
}
