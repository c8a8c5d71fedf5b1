//! Core contract for correlating log lines with distributed traces
//!
//! This crate owns the pieces every log binding shares: the identifier
//! data model, the thread-local accessor reporting the trace active on
//! the calling thread, the provider trait a binding implements, and the
//! idempotent registration lifecycle around it.

pub mod config;
pub mod context;
pub mod id;
pub mod provider;

pub use config::{ConfigError, DEFAULT_CONTEXT_KEY, InjectionConfig};
pub use context::{
    TokenError, TraceContext, TraceIdentifier, TraceScope, current_trace_identifier,
    set_current_trace,
};
pub use id::{IdParseError, SegmentId, TraceId};
pub use provider::{HookState, InjectionHook, LogContextProvider};
