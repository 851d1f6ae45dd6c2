use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
#[allow(unused_imports)]
use log::{debug, error, info, warn};
use tokio::sync::oneshot;

use crate::logger::duration::format_elapsed;
use crate::logger::template::Formatter;
use crate::logger::token::{TokenResolvers, TokenSet};
use crate::logger::{RequestRecord, ResponseRecord};

/// Destination for finished log lines. Called exactly once per tracked
/// request; `message` is `None` when no format was configured.
pub type Sink =
    Box<dyn Fn(Option<&str>, &RequestRecord, &ResponseRecord, &str, bool) + Send + Sync>;

/// Either a template to compile or an already compiled formatter. Resolved
/// once when the logger is built.
pub enum LogFormat {
    Template(String),
    Compiled(Formatter),
}

pub struct LoggerConfig {
    pub log: Sink,
    pub format: Option<LogFormat>,
    pub tokens: TokenSet,
    pub resolvers: TokenResolvers,
}

impl LoggerConfig {
    pub fn new(log: Sink) -> LoggerConfig {
        LoggerConfig {
            log,
            format: None,
            tokens: TokenSet::default(),
            resolvers: TokenResolvers::new(),
        }
    }

    pub fn template(mut self, template: &str) -> LoggerConfig {
        self.format = Some(LogFormat::Template(template.to_string()));
        self
    }

    pub fn formatter(mut self, formatter: Formatter) -> LoggerConfig {
        self.format = Some(LogFormat::Compiled(formatter));
        self
    }

    pub fn tokens(mut self, tokens: TokenSet) -> LoggerConfig {
        self.tokens = tokens;
        self
    }

    pub fn resolver<F>(mut self, name: &str, resolver: F) -> LoggerConfig
    where
        F: Fn(&RequestRecord, &ResponseRecord, &str, bool) -> String + Send + Sync + 'static,
    {
        self.resolvers.register(name, resolver);
        self
    }
}

struct LoggerInner {
    sink: Sink,
    formatter: Option<Formatter>,
}

/// Shared, reentrant access logger. Cloning is cheap; all clones share one
/// compiled formatter and sink.
#[derive(Clone)]
pub struct AccessLogger {
    inner: Arc<LoggerInner>,
}

impl AccessLogger {
    pub fn new(config: LoggerConfig) -> AccessLogger {
        let LoggerConfig {
            log,
            format,
            tokens,
            resolvers,
        } = config;

        // A template compiles here, once; a pre-compiled formatter already
        // owns its resolvers and ignores the config's.
        let formatter = format.map(|format| match format {
            LogFormat::Template(template) => Formatter::compile(&template, &tokens, resolvers),
            LogFormat::Compiled(formatter) => formatter,
        });

        AccessLogger {
            inner: Arc::new(LoggerInner {
                sink: log,
                formatter,
            }),
        }
    }

    /// Builds a logger from the global `access_log` settings section:
    /// the `format` template and the `content_headers` token-set switch.
    #[cfg(feature = "settings")]
    pub fn from_settings(log: Sink, resolvers: TokenResolvers) -> AccessLogger {
        let access_log = crate::logger::settings::access_log_settings();

        let tokens = if access_log.content_headers {
            TokenSet::with_content_headers()
        } else {
            TokenSet::classic()
        };

        AccessLogger::new(LoggerConfig {
            log,
            format: access_log.format.map(LogFormat::Template),
            tokens,
            resolvers,
        })
    }

    /// Starts tracking one request: captures the monotonic start time and
    /// returns the per-request lifecycle record.
    pub fn track(&self, request: RequestRecord) -> RequestLifecycle {
        RequestLifecycle {
            logger: self.clone(),
            request,
            started_at: Instant::now(),
            logged: false,
        }
    }
}

/// Per-request state: Timing until the first terminal event, Logged after.
/// Logged is absorbing, so whichever of finish/close fires second is a no-op.
pub struct RequestLifecycle {
    logger: AccessLogger,
    request: RequestRecord,
    started_at: Instant,
    logged: bool,
}

impl RequestLifecycle {
    /// Terminal event: the response completed normally.
    pub fn finished(&mut self, response: &ResponseRecord) -> anyhow::Result<()> {
        self.terminate(response, true)
    }

    /// Terminal event: the connection dropped before the response finished.
    pub fn closed(&mut self, response: &ResponseRecord) -> anyhow::Result<()> {
        self.terminate(response, false)
    }

    /// Races the two terminal-event channels; the first sender wins and the
    /// loser is detached when its receiver drops. If neither sender ever
    /// fires, nothing is logged (a hung connection leaks its record).
    pub async fn watch(
        mut self,
        mut finished: oneshot::Receiver<ResponseRecord>,
        mut closed: oneshot::Receiver<ResponseRecord>,
    ) -> anyhow::Result<()> {
        tokio::select! {
            response = &mut finished => match response {
                Ok(response) => self.finished(&response)?,
                // finish side went away without firing; only close remains
                Err(_) => if let Ok(response) = closed.await {
                    self.closed(&response)?;
                },
            },
            response = &mut closed => match response {
                Ok(response) => self.closed(&response)?,
                Err(_) => if let Ok(response) = finished.await {
                    self.finished(&response)?;
                },
            },
        }

        Ok(())
    }

    fn terminate(&mut self, response: &ResponseRecord, finished: bool) -> anyhow::Result<()> {
        if self.logged {
            return Ok(());
        }

        // Terminal before formatting: a format error still consumes the
        // request's single log slot.
        self.logged = true;

        let duration = format_elapsed(&self.started_at.elapsed());

        let message = match &self.logger.inner.formatter {
            Some(formatter) => Some(
                formatter
                    .format(&self.request, response, &duration, finished)
                    .with_context(|| "Error in formatting access log line")?,
            ),
            None => None,
        };

        (self.logger.inner.sink)(message.as_deref(), &self.request, response, &duration, finished);

        Ok(())
    }
}

/// Ready-made sink writing lines through the `log` facade at target
/// `access_log`, the conventional target for a dedicated appender.
pub fn access_log_sink() -> Sink {
    Box::new(|message, _request, _response, _duration, _finished| {
        if let Some(message) = message {
            info!(target: "access_log", "{}", message);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{HeaderMap, Method, StatusCode};

    use super::*;

    type Captured = Arc<Mutex<Vec<(Option<String>, String, bool)>>>;

    fn capture_sink(captured: &Captured) -> Sink {
        let captured = Arc::clone(captured);
        Box::new(move |message, _request, _response, duration, finished| {
            captured.lock().unwrap().push((
                message.map(str::to_string),
                duration.to_string(),
                finished,
            ));
        })
    }

    fn request() -> RequestRecord {
        RequestRecord {
            method: Method::GET,
            path: "/health".to_string(),
            encrypted: false,
        }
    }

    fn response() -> ResponseRecord {
        ResponseRecord {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn close_wins_and_late_finish_is_a_noop() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured)).template(":method :path"),
        );

        let mut lifecycle = logger.track(request());
        lifecycle.closed(&response()).unwrap();
        lifecycle.finished(&response()).unwrap();

        let entries = captured.lock().unwrap();
        assert_eq!(entries.len(), 1);

        let (message, _duration, finished) = &entries[0];
        assert_eq!(message.as_deref(), Some("GET /health"));
        assert!(!*finished);
    }

    #[test]
    fn finished_requests_log_with_the_flag_set() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured))
                .template(":method :path - :status-code in :duration"),
        );

        logger.track(request()).finished(&response()).unwrap();

        let entries = captured.lock().unwrap();
        assert_eq!(entries.len(), 1);

        let (message, duration, finished) = &entries[0];
        let message = message.as_deref().unwrap();
        assert!(message.starts_with("GET /health - 200 in "));
        assert!(message.ends_with("ms"));
        assert!(duration.ends_with("ms"));
        assert!(*finished);
    }

    #[test]
    fn absent_format_still_fires_the_sink_once() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(LoggerConfig::new(capture_sink(&captured)));

        logger.track(request()).finished(&response()).unwrap();

        let entries = captured.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, None);
        assert!(entries[0].2);
    }

    #[test]
    fn custom_resolver_flows_through_the_config() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured))
                .template(":user logged in")
                .resolver("user", |_req, _res, _duration, _finished| "abc".to_string()),
        );

        logger.track(request()).finished(&response()).unwrap();

        let entries = captured.lock().unwrap();
        assert_eq!(entries[0].0.as_deref(), Some("abc logged in"));
    }

    #[test]
    fn missing_resolver_surfaces_and_still_consumes_the_log_slot() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured))
                .template(":user logged in")
                .tokens(TokenSet::classic().custom("user")),
        );

        let mut lifecycle = logger.track(request());
        assert!(lifecycle.finished(&response()).is_err());

        // the failed format was terminal; no retry, no sink call
        lifecycle.closed(&response()).unwrap();
        assert!(captured.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn watch_logs_once_when_close_fires_first() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured)).template(":status-code"),
        );

        let (finish_tx, finish_rx) = oneshot::channel();
        let (close_tx, close_rx) = oneshot::channel();

        close_tx.send(response()).unwrap();
        drop(finish_tx);

        logger
            .track(request())
            .watch(finish_rx, close_rx)
            .await
            .unwrap();

        let entries = captured.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.as_deref(), Some("200"));
        assert!(!entries[0].2);
    }

    #[tokio::test]
    async fn watch_logs_once_when_finish_fires_first() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured)).template(":status-code"),
        );

        let (finish_tx, finish_rx) = oneshot::channel();
        let (close_tx, close_rx) = oneshot::channel();

        let lifecycle = logger.track(request());
        let watcher = tokio::spawn(lifecycle.watch(finish_rx, close_rx));

        finish_tx.send(response()).unwrap();
        watcher.await.unwrap().unwrap();

        // the close side was detached when watch returned
        assert!(close_tx.send(response()).is_err());

        let entries = captured.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].2);
    }

    #[tokio::test]
    async fn watch_without_any_event_logs_nothing() {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let logger = AccessLogger::new(
            LoggerConfig::new(capture_sink(&captured)).template(":status-code"),
        );

        let (finish_tx, finish_rx) = oneshot::channel::<ResponseRecord>();
        let (close_tx, close_rx) = oneshot::channel::<ResponseRecord>();

        drop(finish_tx);
        drop(close_tx);

        logger
            .track(request())
            .watch(finish_rx, close_rx)
            .await
            .unwrap();

        assert!(captured.lock().unwrap().is_empty());
    }
}
