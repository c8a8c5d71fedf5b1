//! JSON binding: trace-ID injection for structured log output
//!
//! Log shippers consume JSON lines; this binding adds a top-level
//! `"trace_id"` member to every emitted object while a trace is active on
//! the emitting thread. Injection happens at write time in front of the
//! destination writer, so any JSON-producing pipeline (including one the
//! application already owns) can be fronted by the adapter.

mod writer;

pub use writer::{TraceInjectingMake, TraceInjectingWriter};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{Layer, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tracelink_core::{InjectionConfig, InjectionHook, LogContextProvider};

/// Build a JSON fmt layer writing through the injecting adapter
pub fn layer<S, W>(
    config: &InjectionConfig,
    make_writer: W,
) -> Layer<S, JsonFields, Format<Json>, TraceInjectingMake<W>>
where
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_writer(TraceInjectingMake::new(make_writer, &config.key))
}

/// Provider installing the JSON pipeline as the global subscriber
pub struct JsonProvider {
    config: InjectionConfig,
}

impl JsonProvider {
    pub fn new(config: InjectionConfig) -> Self {
        Self { config }
    }
}

impl LogContextProvider for JsonProvider {
    fn backend(&self) -> &str {
        "tracing-json"
    }

    fn register(&self) -> bool {
        if self.config.validate().is_err() {
            return false;
        }

        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // An already-installed subscriber is a refusal, not an error
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer(&self.config, std::io::stdout))
            .try_init()
            .is_ok()
    }
}

/// Install the JSON binding and return its lifecycle hook
pub fn install(config: &InjectionConfig) -> InjectionHook {
    let hook = InjectionHook::with_config(Box::new(JsonProvider::new(config.clone())), config);
    hook.install();
    hook
}
