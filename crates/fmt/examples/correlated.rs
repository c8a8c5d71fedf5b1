//! Emit a few correlated log lines to stdout.
//!
//! Run with: `cargo run -p tracelink-fmt --example correlated`

use anyhow::Result;

use tracelink_core::{InjectionConfig, TraceContext, TraceScope};

fn main() -> Result<()> {
    let config = InjectionConfig::from_env();
    config.validate()?;
    let _hook = tracelink_fmt::install(&config);

    tracing::info!("starting up without an active trace");

    let ctx = TraceContext::new().child();
    {
        let _scope = TraceScope::new(ctx.identifier());
        tracing::info!("handling request");
        tracing::warn!("request took longer than expected");
    }

    tracing::info!("trace ended; this line is uncorrelated");
    Ok(())
}
