use thiserror::Error;

/// Reasons a balance request is turned away before any lookup starts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("no valid addresses found in input")]
    NoAddresses,
    #[error("too many addresses ({found}), limit is {limit} per request")]
    TooManyAddresses { found: usize, limit: usize },
}
