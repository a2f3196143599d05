use thiserror::Error;

/// The gate could not read virtual time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("Time authority unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed time response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Arrival queue is full (capacity {0})")]
    Full(usize),

    #[error("Arrival queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The blocking wait for a free token was cut short.
    #[error("Token wait interrupted")]
    Interrupted,
}

/// Transport-level failure while asking a peer gate for a token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BorrowError {
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("Peer {peer} timed out")]
    Timeout { peer: String },

    #[error("Peer {peer} answered with an invalid response: {reason}")]
    InvalidResponse { peer: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("Parking space unreachable: {0}")]
    Unreachable(String),

    #[error("Parking space rejected vehicle: {0}")]
    Rejected(String),
}
