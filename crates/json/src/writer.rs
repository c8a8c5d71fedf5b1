//! Writer adapter injecting the trace identifier into JSON-lines output

use std::io::{self, Write};
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

use tracelink_core::current_trace_identifier;

/// `io::Write` adapter for JSON-lines log output.
///
/// Each line that parses as a JSON object gains a `"key": "identifier"`
/// member for the trace active on the writing thread. An object that
/// already carries the key is left alone, and anything that is not a JSON
/// object passes through byte-for-byte, so the adapter can sit in front
/// of mixed output without corrupting it.
pub struct TraceInjectingWriter<W> {
    inner: W,
    key: Arc<str>,
}

impl<W: Write> TraceInjectingWriter<W> {
    /// Wrap `inner`, injecting under `key`
    pub fn new(inner: W, key: impl AsRef<str>) -> Self {
        Self {
            inner,
            key: Arc::from(key.as_ref()),
        }
    }

    fn shared(inner: W, key: Arc<str>) -> Self {
        Self { inner, key }
    }
}

impl<W: Write> Write for TraceInjectingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(id) = current_trace_identifier() else {
            return self.inner.write(buf);
        };
        let Ok(text) = std::str::from_utf8(buf) else {
            return self.inner.write(buf);
        };
        let Ok(serde_json::Value::Object(mut map)) =
            serde_json::from_str::<serde_json::Value>(text)
        else {
            return self.inner.write(buf);
        };

        // An explicit field in the event wins over injection
        if map.contains_key(self.key.as_ref()) {
            return self.inner.write(buf);
        }

        map.insert(
            self.key.to_string(),
            serde_json::Value::String(id.as_str().to_owned()),
        );
        let Ok(mut line) = serde_json::to_string(&map) else {
            return self.inner.write(buf);
        };
        if text.ends_with('\n') {
            line.push('\n');
        }

        // Report the caller's byte count: from its point of view the
        // original buffer was written in full.
        self.inner.write_all(line.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `MakeWriter` wrapper so the adapter can front any writer factory
/// (stdout, a rolling file appender, a test buffer)
pub struct TraceInjectingMake<M> {
    inner: M,
    key: Arc<str>,
}

impl<M> TraceInjectingMake<M> {
    pub fn new(inner: M, key: impl AsRef<str>) -> Self {
        Self {
            inner,
            key: Arc::from(key.as_ref()),
        }
    }
}

impl<'a, M> MakeWriter<'a> for TraceInjectingMake<M>
where
    M: MakeWriter<'a>,
{
    type Writer = TraceInjectingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        TraceInjectingWriter::shared(self.inner.make_writer(), self.key.clone())
    }
}
