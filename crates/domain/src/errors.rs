use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Transaction {0} has no response yet")]
    TransactionIncomplete(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}
