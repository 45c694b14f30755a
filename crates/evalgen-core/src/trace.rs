pub use evalgen_types::{TokenUsage, Trace, TraceBuilder};

// Per-task collection of judge calls made while evaluating one case
use std::cell::RefCell;

tokio::task_local! {
    static TRACES: RefCell<Vec<Trace>>;
}

/// Run a future within a tracing scope and return the result along with the judge calls it made.
pub async fn scope_traces<F, R>(f: F) -> (R, Vec<Trace>)
where
    F: std::future::Future<Output = R>,
{
    let traces = RefCell::new(Vec::new());
    TRACES.scope(traces, async move {
        let result = f.await;
        let collected = TRACES.with(|t| t.take());
        (result, collected)
    }).await
}

/// Record a judge call in the current scope. Outside a scope this is a no-op.
pub fn report_trace(trace: Trace) {
    let _ = TRACES.try_with(|traces| {
        traces.borrow_mut().push(trace);
    });
}
