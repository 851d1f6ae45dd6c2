use chrono::Local;
use http::header;

use crate::logger::token::{StandardToken, TokenResolvers, TokenSet};
use crate::logger::{LogError, LogResult, RequestRecord, ResponseRecord};

/// One placeholder in a compiled template. Standard tokens are resolved by
/// enum dispatch; only custom tokens pay for a name lookup at format time.
#[derive(Debug, Clone)]
enum TokenRef {
    Standard(StandardToken),
    Custom(String),
}

impl TokenRef {
    fn name(&self) -> &str {
        match self {
            TokenRef::Standard(kind) => kind.name(),
            TokenRef::Custom(name) => name,
        }
    }
}

/// A template compiled into alternating literal chunks and token references.
/// Compilation happens once; formatting walks the compiled sequence and never
/// parses again. Invariant: `literals.len() == tokens.len() + 1`, so every
/// token sits between two literal chunks (possibly empty ones).
#[derive(Debug)]
pub struct Formatter {
    literals: Vec<String>,
    tokens: Vec<TokenRef>,
    resolvers: TokenResolvers,
}

impl Formatter {
    /// Compiles `template` against the recognized token names: the standard
    /// names of `tokens` first, then declared custom names, then resolver
    /// registrations. A `:` followed by none of those names stays literal
    /// text. There is no escaping mechanism.
    pub fn compile(template: &str, tokens: &TokenSet, resolvers: TokenResolvers) -> Formatter {
        let candidates = candidate_tokens(tokens, &resolvers);

        let mut literals = Vec::new();
        let mut refs = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(colon) = rest.find(':') {
            let (head, tail) = rest.split_at(colon);
            let after = &tail[1..];

            literal.push_str(head);

            // First recognized name that prefixes the remainder wins, which
            // is why candidate order matters.
            match candidates.iter().find(|token| after.starts_with(token.name())) {
                Some(token) => {
                    literals.push(std::mem::take(&mut literal));
                    refs.push(token.clone());
                    rest = &after[token.name().len()..];
                }
                None => {
                    literal.push(':');
                    rest = after;
                }
            }
        }

        literal.push_str(rest);
        literals.push(literal);

        Formatter {
            literals,
            tokens: refs,
            resolvers,
        }
    }

    /// Renders one log line. `duration` is the pre-rendered elapsed-time
    /// string; `finished` tells custom resolvers whether the response
    /// completed normally or the connection dropped first.
    pub fn format(
        &self,
        request: &RequestRecord,
        response: &ResponseRecord,
        duration: &str,
        finished: bool,
    ) -> LogResult<String> {
        let mut line = String::with_capacity(self.capacity_hint());

        for (index, literal) in self.literals.iter().enumerate() {
            line.push_str(literal);

            if let Some(token) = self.tokens.get(index) {
                match token {
                    TokenRef::Standard(kind) => {
                        append_standard(&mut line, *kind, request, response, duration);
                    }
                    TokenRef::Custom(name) => {
                        let resolver = self
                            .resolvers
                            .get(name)
                            .ok_or_else(|| LogError::MissingResolver(name.clone()))?;

                        line.push_str(&resolver(request, response, duration, finished));
                    }
                }
            }
        }

        Ok(line)
    }

    fn capacity_hint(&self) -> usize {
        let literal_len: usize = self.literals.iter().map(|literal| literal.len()).sum();
        literal_len + self.tokens.len() * 16
    }
}

fn candidate_tokens(tokens: &TokenSet, resolvers: &TokenResolvers) -> Vec<TokenRef> {
    let mut candidates: Vec<TokenRef> = tokens
        .standard()
        .iter()
        .map(|kind| TokenRef::Standard(*kind))
        .collect();

    // Custom names go after the standard set, so a colliding custom name is
    // shadowed rather than rejected.
    for name in tokens.custom_names().iter().chain(resolvers.names()) {
        if !candidates.iter().any(|existing| existing.name() == name) {
            candidates.push(TokenRef::Custom(name.clone()));
        }
    }

    candidates
}

fn append_standard(
    line: &mut String,
    kind: StandardToken,
    request: &RequestRecord,
    response: &ResponseRecord,
    duration: &str,
) {
    match kind {
        StandardToken::StatusCode => line.push_str(response.status.as_str()),
        StandardToken::Duration => line.push_str(duration),
        StandardToken::Proto => line.push_str(if request.encrypted { "https" } else { "http" }),
        StandardToken::Method => line.push_str(request.method.as_str()),
        StandardToken::Path => line.push_str(&request.path),
        // Wall-clock time is taken per format call, not at compile time.
        StandardToken::IsoTime => line.push_str(&Local::now().to_rfc3339()),
        StandardToken::ContentType => {
            if let Some(value) = response.header(&header::CONTENT_TYPE) {
                line.push_str(value);
            }
        }
        StandardToken::ContentLength => {
            if let Some(value) = response.header(&header::CONTENT_LENGTH) {
                line.push_str(value);
            }
        }
    }
}
