//! Text binding: trace-ID injection for the `tracing-subscriber` fmt pipeline
//!
//! Rendered lines gain a `trace_id=<identifier>` prefix whenever a trace
//! is active on the emitting thread, so console and file output can be
//! correlated with a distributed trace. The prefix disappears the moment
//! the trace scope ends; there is no per-thread state to clean up in the
//! logging framework itself.

mod format;

pub use format::TraceFormat;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::{Layer, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use tracelink_core::{InjectionConfig, InjectionHook, LogContextProvider};

/// Build a fmt layer whose events carry the active trace identifier
pub fn layer<S>(config: &InjectionConfig) -> Layer<S, DefaultFields, TraceFormat<Format>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer().event_format(TraceFormat::new(
        tracing_subscriber::fmt::format(),
        config.key.clone(),
    ))
}

/// Like [`layer`], but writing to a custom destination
pub fn layer_with_writer<S, W>(
    config: &InjectionConfig,
    make_writer: W,
) -> Layer<S, DefaultFields, TraceFormat<Format>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    layer(config).with_writer(make_writer)
}

/// Provider installing the fmt pipeline as the global subscriber
pub struct FmtProvider {
    config: InjectionConfig,
}

impl FmtProvider {
    pub fn new(config: InjectionConfig) -> Self {
        Self { config }
    }
}

impl LogContextProvider for FmtProvider {
    fn backend(&self) -> &str {
        "tracing-fmt"
    }

    fn register(&self) -> bool {
        if self.config.validate().is_err() {
            return false;
        }

        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // try_init fails when a global subscriber is already installed;
        // that is a refusal, not an error, and logging proceeds without
        // injection.
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer(&self.config))
            .try_init()
            .is_ok()
    }
}

/// Install the text binding and return its lifecycle hook
///
/// Installation is idempotent through the hook; when another subscriber
/// already owns the process, the hook simply stays unregistered.
pub fn install(config: &InjectionConfig) -> InjectionHook {
    let hook = InjectionHook::with_config(Box::new(FmtProvider::new(config.clone())), config);
    hook.install();
    hook
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};

    use tracelink_core::{TraceContext, TraceIdentifier, TraceScope};

    #[derive(Clone, Default)]
    struct Capture {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
        }
    }

    struct CaptureWriter {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl io::Write for CaptureWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CaptureWriter {
                buf: self.buf.clone(),
            }
        }
    }

    #[test]
    fn test_active_trace_is_rendered() {
        let capture = Capture::default();
        let config = InjectionConfig::default();
        let subscriber = tracing_subscriber::registry()
            .with(layer_with_writer(&config, capture.clone()).with_ansi(false));

        let id = TraceContext::new().identifier();

        tracing::subscriber::with_default(subscriber, || {
            let scope = TraceScope::new(id.clone());
            tracing::info!("hello");
            drop(scope);
            tracing::info!("bye");
        });

        let output = capture.contents();
        let mut lines = output.lines();

        let hello = lines.next().unwrap();
        assert!(hello.starts_with(&format!("trace_id={id} ")));
        assert!(hello.contains("hello"));

        // After the scope ends the key is absent, not stale
        let bye = lines.next().unwrap();
        assert!(!bye.contains("trace_id="));
        assert!(bye.contains("bye"));
    }

    #[test]
    fn test_configured_key_is_used() {
        let capture = Capture::default();
        let config = InjectionConfig {
            key: "correlation_id".to_string(),
            ..InjectionConfig::default()
        };
        let subscriber = tracing_subscriber::registry()
            .with(layer_with_writer(&config, capture.clone()).with_ansi(false));

        let id = TraceIdentifier::new("abc123").unwrap();

        tracing::subscriber::with_default(subscriber, || {
            let _scope = TraceScope::new(id);
            tracing::info!("hello");
        });

        let output = capture.contents();
        assert!(output.starts_with("correlation_id=abc123 "));
        assert!(!output.contains("trace_id="));
    }

    #[test]
    fn test_other_threads_do_not_inherit_the_trace() {
        let id = TraceIdentifier::new("main-thread-only").unwrap();
        let _scope = TraceScope::new(id);

        let output = std::thread::spawn(|| {
            let capture = Capture::default();
            let config = InjectionConfig::default();
            let subscriber = tracing_subscriber::registry()
                .with(layer_with_writer(&config, capture.clone()).with_ansi(false));

            tracing::subscriber::with_default(subscriber, || tracing::info!("from elsewhere"));
            capture.contents()
        })
        .join()
        .unwrap();

        assert!(output.contains("from elsewhere"));
        assert!(!output.contains("main-thread-only"));
        assert!(!output.contains("trace_id="));
    }
}
