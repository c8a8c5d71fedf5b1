//! Active trace context and the thread-local accessor
//!
//! The accessor is the contract between the tracing core and the log
//! bindings: it reports the identifier of the trace active on the calling
//! thread, or nothing. It never blocks, never errors, and is safe to call
//! from any log call site, including unwind paths.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::id::{IdParseError, SegmentId, TraceId};

/// The trace/segment pair active while a unit of work runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: TraceId,
    segment_id: Option<SegmentId>,
}

impl TraceContext {
    /// Create a context with a freshly generated trace ID and no segment
    pub fn new() -> Self {
        Self {
            trace_id: TraceId::generate(),
            segment_id: None,
        }
    }

    /// Create a context for an existing trace
    pub fn from_trace_id(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            segment_id: None,
        }
    }

    /// Create a context for an existing trace and segment
    pub fn with_segment(trace_id: TraceId, segment_id: SegmentId) -> Self {
        Self {
            trace_id,
            segment_id: Some(segment_id),
        }
    }

    /// Get the trace ID
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// Get the segment ID, if one is active
    pub fn segment_id(&self) -> Option<&SegmentId> {
        self.segment_id.as_ref()
    }

    /// Derive a context for a sub-unit of work: same trace, fresh segment
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            segment_id: Some(SegmentId::generate()),
        }
    }

    /// The opaque token the log bindings consume
    pub fn identifier(&self) -> TraceIdentifier {
        TraceIdentifier(Arc::from(self.to_string().as_str()))
    }
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment_id {
            Some(segment) => write!(f, "{}@{}", self.trace_id, segment),
            None => write!(f, "{}", self.trace_id),
        }
    }
}

impl FromStr for TraceContext {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Format: trace or trace@segment
        match s.split_once('@') {
            Some((trace, segment)) => Ok(Self {
                trace_id: TraceId::from_str(trace)?,
                segment_id: Some(SegmentId::from_str(segment)?),
            }),
            None => Ok(Self {
                trace_id: TraceId::from_str(s)?,
                segment_id: None,
            }),
        }
    }
}

/// Errors that can occur when building a trace identifier token
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Trace identifier is empty")]
    Empty,
    #[error("Trace identifier contains whitespace or control characters")]
    InvalidCharacter,
}

/// Opaque string token naming the active trace
///
/// Identifiers minted by foreign systems pass through unmodified, so the
/// only validation is that the token can sit safely inside a `key=value`
/// log field. Cloning is cheap.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TraceIdentifier(Arc<str>);

impl TraceIdentifier {
    /// Accept an opaque token, validating it is embeddable in a log field
    pub fn new(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        if !is_log_safe(&token) {
            return Err(TokenError::InvalidCharacter);
        }
        Ok(Self(Arc::from(token.as_str())))
    }

    /// View the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&TraceContext> for TraceIdentifier {
    fn from(ctx: &TraceContext) -> Self {
        ctx.identifier()
    }
}

/// True when every character can appear inside a `key=value` log field
pub(crate) fn is_log_safe(s: &str) -> bool {
    !s.chars().any(|c| c.is_whitespace() || c.is_control())
}

thread_local! {
    static CURRENT_TRACE: std::cell::RefCell<Option<TraceIdentifier>> =
        const { std::cell::RefCell::new(None) };
}

/// Get the identifier of the trace active on this thread
///
/// Returns `None` when no trace is active or the thread-local storage is
/// unavailable (thread teardown). Never errors: logging must not fail
/// because tracing failed.
pub fn current_trace_identifier() -> Option<TraceIdentifier> {
    CURRENT_TRACE
        .try_with(|current| current.borrow().clone())
        .ok()
        .flatten()
}

/// Set or clear the trace active on this thread
pub fn set_current_trace(id: Option<TraceIdentifier>) {
    let _ = CURRENT_TRACE.try_with(|current| {
        *current.borrow_mut() = id;
    });
}

/// RAII guard scoping a trace identifier to a region of code
///
/// Construction installs the identifier; drop restores whatever was active
/// before, on every exit path including panics, so context never leaks
/// into unrelated log statements on a reused thread. Nested scopes restore
/// in LIFO order.
pub struct TraceScope {
    previous: Option<TraceIdentifier>,
}

impl TraceScope {
    /// Make `id` the active trace until the scope is dropped
    pub fn new(id: TraceIdentifier) -> Self {
        let previous = current_trace_identifier();
        set_current_trace(Some(id));
        Self { previous }
    }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        set_current_trace(self.previous.take());
    }
}
