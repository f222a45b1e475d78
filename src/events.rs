//! Lifecycle and error reporting.
//!
//! The service reports what it does through an [`EventSink`] instead of
//! logging directly, so hosts can route events wherever they keep them.
//! [`LogEventSink`] forwards everything to the `log` facade.

use std::error::Error;

/// Receiver for errors and notable lifecycle events.
///
/// Implementations must be cheap and must not panic: they are called from
/// the lookup path and from the background update task.
pub trait EventSink: Send + Sync {
    /// Reports an error that was handled (the caller continues).
    fn log_error(&self, context: &str, error: &dyn Error);

    /// Reports a lifecycle event (file opened, update applied, ...).
    fn trace(&self, message: &str, category: &str);
}

/// Default sink: writes events through the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn log_error(&self, context: &str, error: &dyn Error) {
        // Include the source chain, reqwest/io errors hide the useful part there
        let mut msg = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        log::error!("{}: {}", context, msg);
    }

    fn trace(&self, message: &str, category: &str) {
        log::info!("[{}] {}", category, message);
    }
}
