use thiserror::Error;

/// Why a scan could not be recorded. Duplicates and reconnections are not
/// errors; they come back as a successful `ConnectOutcome`.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("You cannot connect with yourself.")]
    SelfConnection,
    #[error("You are not registered for this event.")]
    NotRegistered,
    #[error("Event not found.")]
    EventNotFound,
    #[error("This event has ended.")]
    EventClosed,
    #[error("User not found.")]
    UnknownUser,
    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for ConnectError {
    fn from(e: rusqlite::Error) -> Self {
        ConnectError::Database(e.into())
    }
}
