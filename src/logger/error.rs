use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    /// A template referenced a custom token that has no resolver registered.
    /// Raised at format time, not compile time, so a broken configuration
    /// fails loudly on the first request instead of dropping log lines.
    #[error("No resolver registered for custom token: {0}")]
    MissingResolver(String),
}
