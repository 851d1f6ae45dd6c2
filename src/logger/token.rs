use std::collections::HashMap;
use std::fmt;

use crate::logger::{RequestRecord, ResponseRecord};

/// Closed set of built-in template tokens. Which of these a template may use
/// is decided per [`TokenSet`], since deployments differ on whether they log
/// wall-clock time or response content headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardToken {
    StatusCode,
    Duration,
    Proto,
    Method,
    Path,
    IsoTime,
    ContentType,
    ContentLength,
}

impl StandardToken {
    pub fn name(&self) -> &'static str {
        match self {
            StandardToken::StatusCode => "status-code",
            StandardToken::Duration => "duration",
            StandardToken::Proto => "proto",
            StandardToken::Method => "method",
            StandardToken::Path => "path",
            StandardToken::IsoTime => "iso-time",
            StandardToken::ContentType => "content-type",
            StandardToken::ContentLength => "content-length",
        }
    }
}

impl fmt::Display for StandardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The token names a compilation recognizes: an ordered standard subset plus
/// any explicitly declared custom names. Standard names are matched before
/// custom ones, so a custom token that reuses a standard name is never
/// reached.
#[derive(Debug, Clone)]
pub struct TokenSet {
    standard: Vec<StandardToken>,
    custom: Vec<String>,
}

impl TokenSet {
    /// status-code, duration, proto, method, path and iso-time.
    pub fn classic() -> TokenSet {
        TokenSet {
            standard: vec![
                StandardToken::StatusCode,
                StandardToken::Duration,
                StandardToken::Proto,
                StandardToken::Method,
                StandardToken::Path,
                StandardToken::IsoTime,
            ],
            custom: Vec::new(),
        }
    }

    /// Variant trading iso-time for content-type and content-length.
    pub fn with_content_headers() -> TokenSet {
        TokenSet {
            standard: vec![
                StandardToken::StatusCode,
                StandardToken::Duration,
                StandardToken::Proto,
                StandardToken::Method,
                StandardToken::Path,
                StandardToken::ContentType,
                StandardToken::ContentLength,
            ],
            custom: Vec::new(),
        }
    }

    /// Declare a custom token name without binding a resolver. Formatting a
    /// template that uses the name without a registered resolver fails with
    /// [`LogError::MissingResolver`](crate::logger::LogError).
    pub fn custom(mut self, name: &str) -> TokenSet {
        if !self.custom.iter().any(|existing| existing == name) {
            self.custom.push(name.to_string());
        }
        self
    }

    pub(crate) fn standard(&self) -> &[StandardToken] {
        &self.standard
    }

    pub(crate) fn custom_names(&self) -> &[String] {
        &self.custom
    }
}

impl Default for TokenSet {
    fn default() -> TokenSet {
        TokenSet::classic()
    }
}

pub type CustomResolver =
    Box<dyn Fn(&RequestRecord, &ResponseRecord, &str, bool) -> String + Send + Sync>;

/// Registry of caller-supplied token resolvers. Registration order is kept
/// because it decides match preference between overlapping custom names.
#[derive(Default)]
pub struct TokenResolvers {
    names: Vec<String>,
    resolvers: HashMap<String, CustomResolver>,
}

impl TokenResolvers {
    pub fn new() -> TokenResolvers {
        TokenResolvers::default()
    }

    /// Register a resolver under `name`. Re-registering replaces the resolver
    /// but keeps the original match position.
    pub fn register<F>(&mut self, name: &str, resolver: F)
    where
        F: Fn(&RequestRecord, &ResponseRecord, &str, bool) -> String + Send + Sync + 'static,
    {
        if !self.names.iter().any(|existing| existing == name) {
            self.names.push(name.to_string());
        }
        self.resolvers.insert(name.to_string(), Box::new(resolver));
    }

    pub fn with<F>(mut self, name: &str, resolver: F) -> TokenResolvers
    where
        F: Fn(&RequestRecord, &ResponseRecord, &str, bool) -> String + Send + Sync + 'static,
    {
        self.register(name, resolver);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CustomResolver> {
        self.resolvers.get(name)
    }
}

impl fmt::Debug for TokenResolvers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResolvers")
            .field("names", &self.names)
            .finish()
    }
}
