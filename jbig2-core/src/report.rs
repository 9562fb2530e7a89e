//! Reporting of problems found while decoding.
//!
//! Not every irregularity in a JBIG2 stream makes the image unusable. Those
//! that don't are passed to a [`Reporter`] as warnings and decoding
//! continues. A fatal error is reported once with [`Severity::Error`] before
//! it is returned to the caller.

/// How severe a reported problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Decoding continues.
    Warning,
    /// Decoding was aborted.
    Error,
}

/// A sink for problems found while decoding.
pub trait Reporter {
    /// Report a problem with the given severity.
    fn report(&mut self, severity: Severity, message: &str);
}

/// A reporter that forwards everything to the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => log::warn!("{message}"),
            Severity::Error => log::error!("{message}"),
        }
    }
}

/// A single collected report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The severity of the problem.
    pub severity: Severity,
    /// A human readable description.
    pub message: String,
}

impl Reporter for Vec<Report> {
    fn report(&mut self, severity: Severity, message: &str) {
        self.push(Report {
            severity,
            message: message.to_string(),
        });
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, severity: Severity, message: &str) {
        (**self).report(severity, message);
    }
}
