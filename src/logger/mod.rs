pub use access_logger::{access_log_sink, AccessLogger, LogFormat, LoggerConfig, RequestLifecycle, Sink};
pub use duration::{format_duration, format_elapsed};
pub use error::LogError;
pub use http_records::{RequestRecord, ResponseRecord};
pub use template::Formatter;
pub use token::{CustomResolver, StandardToken, TokenResolvers, TokenSet};

pub type LogResult<R> = Result<R, LogError>;

mod access_logger;
mod duration;
mod error;
mod http_records;
mod template;
mod token;

#[cfg(feature = "settings")]
pub mod settings;

pub mod utils;
