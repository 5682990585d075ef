use thiserror::Error;

/// Main error type for DNP3 outstation operations
#[derive(Error, Debug)]
pub enum Dnp3Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Object header parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Timeout")]
    Timeout,
}

/// Result type alias for DNP3 outstation operations
pub type Dnp3Result<T> = Result<T, Dnp3Error>;
