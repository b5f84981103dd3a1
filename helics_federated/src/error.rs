//! Errors a transport can raise establishing or carrying a connection.

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire codec error: {0}")]
    Wire(#[from] helics_message::wire::WireError),

    #[error("connection closed")]
    Closed,

    #[error("invalid broker address {0:?}")]
    InvalidAddress(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
