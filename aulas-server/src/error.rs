use axum::http::StatusCode;

/// A stored token (weekday, shift) that does not name a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized {kind} '{value}'")]
pub struct ParseTokenError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseTokenError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Failures that abort an assignment run. Nothing is persisted when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("invalid period id {0}")]
    InvalidPeriod(i32),

    #[error("period {0} not found")]
    PeriodNotFound(i32),

    #[error("career {0} does not exist")]
    UnknownCareer(i32),

    #[error("room {0} not found")]
    RoomNotFound(i32),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AssignmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AssignmentError::InvalidPeriod(_) | AssignmentError::UnknownCareer(_) => {
                StatusCode::BAD_REQUEST
            }
            AssignmentError::PeriodNotFound(_) | AssignmentError::RoomNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AssignmentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
