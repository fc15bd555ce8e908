//! Parse failures and error reporting.
//!
//! Scanning never fails: malformed fragments are left as literal text. The
//! structured grammars (item keys, function calls) do fail, and callers
//! absorb those failures by keeping the original string unchanged. The
//! failure carries the first chumsky error's reason and byte position so
//! debug tools can point at it.
//!
//! # Pretty Printing
//!
//! Use [`ErrorReporter`] for user-friendly output built on
//! [ariadne](https://crates.io/crates/ariadne):
//!
//! ```rust
//! use hostmacro_parser::error::ErrorReporter;
//! use hostmacro_parser::item_key::ItemKey;
//!
//! let source = "net.if.in[eth0";
//! let failure = ItemKey::parse(source).unwrap_err();
//! assert_eq!(failure.position, 14);
//!
//! let reporter = ErrorReporter::new("key", source);
//! // reporter.report_parse_failure(&failure); // Prints a labelled report
//! ```

use ariadne::{Color, Label, Report, ReportKind, Source};
use std::ops::Range;
use thiserror::Error;

/// A structured-grammar parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct ParseFailure {
    /// Human-readable description.
    pub message: String,
    /// Byte offset where the failure was detected.
    pub position: usize,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// The one-byte span reported by [`ErrorReporter`].
    pub fn span(&self) -> Range<usize> {
        self.position..self.position + 1
    }
}

/// Error reporter that uses ariadne for pretty error output.
pub struct ErrorReporter<'src> {
    source_name: String,
    source: &'src str,
}

impl<'src> ErrorReporter<'src> {
    /// Create a new error reporter.
    pub fn new(source_name: impl Into<String>, source: &'src str) -> Self {
        Self {
            source_name: source_name.into(),
            source,
        }
    }

    /// Report a parse failure to stderr.
    pub fn report_parse_failure(&self, failure: &ParseFailure) -> std::io::Result<()> {
        // ariadne tolerates a span one past the end; clamp anything further.
        let end = self.source.len();
        let span = failure.position.min(end)..(failure.position + 1).min(end + 1);

        Report::build(ReportKind::Error, &self.source_name, span.start)
            .with_message(&failure.message)
            .with_label(
                Label::new((&self.source_name, span))
                    .with_color(Color::Red)
                    .with_message("here"),
            )
            .finish()
            .eprint((&self.source_name, Source::from(self.source)))
    }
}
