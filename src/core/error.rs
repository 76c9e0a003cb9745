#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Insufficient {what}: need at least {required} points, got {actual}")]
    InsufficientSeries {
        what: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Computation error: {0}")]
    Computation(String),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
