//! Event format wrapper that stamps the active trace identifier

use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use tracelink_core::current_trace_identifier;

/// Wraps another event format and prefixes each rendered event with
/// `key=identifier` for the trace active on the emitting thread.
///
/// The accessor is consulted at format time, so the rendered value can
/// never be stale and no after-event cleanup is needed. When no trace is
/// active the event renders exactly as the inner format would have.
pub struct TraceFormat<E> {
    inner: E,
    key: String,
}

impl<E> TraceFormat<E> {
    /// Wrap `inner`, writing the identifier under `key`
    pub fn new(inner: E, key: impl Into<String>) -> Self {
        Self {
            inner,
            key: key.into(),
        }
    }

    /// The context key this format writes
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<S, N, E> FormatEvent<S, N> for TraceFormat<E>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
    E: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        if let Some(id) = current_trace_identifier() {
            write!(writer, "{}={} ", self.key, id)?;
        }
        self.inner.format_event(ctx, writer, event)
    }
}
