//! Progress notifications emitted during discovery

/// Receives human-readable discovery milestones
///
/// Any `Fn(&str) + Send + Sync` closure is a sink, which keeps tests and
/// embedding callers free of boilerplate.
pub trait ProgressSink: Send + Sync {
    /// Called once per milestone
    fn notify(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

/// Sink that forwards milestones to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn notify(&self, message: &str) {
        tracing::info!("{}", message);
    }
}
