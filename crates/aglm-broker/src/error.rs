use thiserror::Error;

/// Errors surfaced by the broker client. Distinguishes a transport failure
/// from a broker-side error reply so callers can decide whether a retry is
/// even meaningful.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("broker protocol error: {0}")]
    Protocol(String),

    #[error("broker returned an error reply: {0}")]
    Server(String),
}
