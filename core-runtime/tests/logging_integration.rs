//! Integration tests for the host logger bridge.
//!
//! The global subscriber can only be installed once per process, so every
//! assertion that needs it lives in a single test.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::log::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_link, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl CollectingSink {
    fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

#[test]
fn test_sink_receives_structured_events() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_filter("debug")
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    let link = "https://open.spotify.com/playlist/37i9?si=abcdef";
    {
        let span = tracing::info_span!("handle_link");
        let _entered = span.enter();
        tracing::info!(link = %redact_link(link), redirected = true, "Routed link");
    }
    tracing::debug!("below the sink's minimum level");
    tracing::warn!(provider = "tidal", "Stored provider is not in the registry");

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);

    let routed = &entries[0];
    assert_eq!(routed.level, LogLevel::Info);
    assert_eq!(routed.message, "Routed link");
    assert_eq!(
        routed.fields.get("link").map(String::as_str),
        Some("https://open.spotify.com/playlist/37i9")
    );
    assert_eq!(routed.fields.get("redirected").map(String::as_str), Some("true"));
    assert_eq!(routed.span.as_deref(), Some("handle_link"));

    let warned = &entries[1];
    assert_eq!(warned.level, LogLevel::Warn);
    assert_eq!(warned.fields.get("provider").map(String::as_str), Some("tidal"));
    assert!(warned.span.is_none());

    // A second global subscriber is refused.
    assert!(init_logging(LoggingConfig::default()).is_err());
}
