//! Error reporting port
//!
//! Errors the core cannot surface to a caller (a failed poll inside a
//! long-running loop, say) go to an [`ErrorReporter`]. The default reporter
//! writes them to the tracing subscriber.

use crate::Error;

pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &Error, context: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &Error, context: &str) {
        match error {
            Error::Unexpected(_) => tracing::error!(error = %error, context, "Unexpected error"),
            _ => tracing::warn!(error = %error, context, "Reported error"),
        }
    }
}

/// Wrap anything the crate has no variant for and report it
pub fn report_unexpected<R: ErrorReporter + ?Sized>(
    reporter: &R,
    error: impl std::fmt::Display,
    context: &str,
) -> Error {
    let error = Error::Unexpected(error.to_string());
    reporter.report(&error, context);
    error
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct CollectingReporter {
        pub(crate) reports: Mutex<Vec<(String, String)>>,
    }

    impl ErrorReporter for CollectingReporter {
        fn report(&self, error: &Error, context: &str) {
            self.reports
                .lock()
                .unwrap()
                .push((context.to_string(), error.to_string()));
        }
    }

    #[test]
    fn unexpected_errors_are_wrapped_and_reported() {
        let reporter = CollectingReporter::default();
        let error = report_unexpected(&reporter, "socket closed", "poll");

        assert!(matches!(error, Error::Unexpected(ref m) if m == "socket closed"));
        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "poll");
        assert!(reports[0].1.contains("socket closed"));
    }

    #[test]
    fn tracing_reporter_accepts_any_error() {
        TracingErrorReporter.report(&Error::Config("missing proxy".to_string()), "startup");
    }
}
