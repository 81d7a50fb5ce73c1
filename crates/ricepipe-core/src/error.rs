//! Error types for decoding and pipeline operations.

use thiserror::Error;

/// Result type alias for ricepipe operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Decoder and pipeline error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A Golomb-Rice code ran past the maximum quotient without a terminator.
    #[error("invalid symbol: {leading_ones} leading ones exceed maximum quotient {max_quotient}")]
    InvalidSymbol { leading_ones: u32, max_quotient: u32 },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Access outside the bounds of a memory.
    #[error("{memory} address {addr} out of range (size {size})")]
    AddressOutOfRange {
        memory: &'static str,
        addr: usize,
        size: usize,
    },

    /// Operation requested in the wrong state.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Encoder input that cannot be represented.
    #[error("{what} value {value} out of range (max {max})")]
    ValueOutOfRange {
        what: &'static str,
        value: u64,
        max: u64,
    },

    /// A run did not reach completion within its tick budget.
    #[error("stalled after {ticks} ticks in state {state}")]
    Stalled { ticks: u64, state: &'static str },
}

impl Error {
    /// Create an invalid symbol error.
    pub fn invalid_symbol(leading_ones: u32, max_quotient: u32) -> Self {
        Error::InvalidSymbol {
            leading_ones,
            max_quotient,
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }

    /// Create an out-of-range address error.
    pub fn out_of_range(memory: &'static str, addr: usize, size: usize) -> Self {
        Error::AddressOutOfRange { memory, addr, size }
    }

    /// Create an invalid state error.
    pub fn invalid_state(expected: &'static str, actual: &'static str) -> Self {
        Error::InvalidState { expected, actual }
    }

    /// Create a value out of range error.
    pub fn value_out_of_range(what: &'static str, value: u64, max: u64) -> Self {
        Error::ValueOutOfRange { what, value, max }
    }

    /// Check if the error comes from malformed stream contents rather than
    /// misuse of the API.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Error::InvalidSymbol { .. })
    }

    /// Get error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidSymbol { .. } => "invalid_symbol",
            Error::InvalidConfig(_) => "invalid_config",
            Error::AddressOutOfRange { .. } => "address_out_of_range",
            Error::InvalidState { .. } => "invalid_state",
            Error::ValueOutOfRange { .. } => "value_out_of_range",
            Error::Stalled { .. } => "stalled",
        }
    }
}
