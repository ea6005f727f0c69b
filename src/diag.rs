//! Diagnostic model shared by every stage of the toolchain.
//!
//! Each stage aborts on its first error, so a diagnostic here is always
//! fatal. The model still carries labeled spans, help text, and notes so the
//! scanner and assembler can point into their input; semantic diagnostics
//! deliberately carry no spans (the analyzer consumes a derivation stream,
//! not source text).

use miette::{Diagnostic, LabeledSpan, Report, Severity};
use std::fmt;

/// A byte range into stage input.
pub type Span = std::ops::Range<usize>;

/// A labeled span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagLabel {
    /// The span this label refers to.
    pub span: Span,
    /// The label text explaining this span's relevance.
    pub message: String,
}

/// A fatal diagnostic produced by one of the pipeline stages.
///
/// Stage binaries render this on stderr after the literal `ERROR` token;
/// library callers can convert it to a [`miette::Report`] for rich output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    /// The main diagnostic message.
    pub message: String,
    /// Labeled spans showing relevant input locations, possibly empty.
    pub labels: Vec<DiagLabel>,
    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,
    /// Additional notes providing context.
    pub notes: Vec<String>,
    /// Diagnostic code (e.g. `scan::invalid_character`).
    pub code: Option<String>,
}

impl Diag {
    /// Creates a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            labels: Vec::new(),
            help: None,
            notes: Vec::new(),
            code: None,
        }
    }

    /// Adds a labeled span to this diagnostic.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            span,
            message: message.into(),
        });
        self
    }

    /// Sets the help text for this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Sets the diagnostic code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Stage input text wrapped for diagnostic rendering.
///
/// Spans attached to a [`Diag`] are clamped against the actual input bounds
/// before conversion so a stale or synthetic span can never panic miette.
#[derive(Debug, Clone)]
pub struct SourceFile {
    content: String,
    name: Option<String>,
}

impl SourceFile {
    /// Creates a new source file from the given content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            name: None,
        }
    }

    /// Creates a new source file with a display name.
    pub fn with_name(content: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            name: Some(name.into()),
        }
    }

    /// Returns the input content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Clamps a span to valid bounds within this input.
    pub fn clamp_span(&self, span: &Span) -> Span {
        let len = self.content.len();
        let start = span.start.min(len);
        let end = span.end.min(len).max(start);
        start..end
    }
}

/// Converts a diagnostic to a miette report with source context attached.
pub fn to_report(diag: &Diag, source: &SourceFile) -> Report {
    let labels = diag
        .labels
        .iter()
        .map(|label| {
            let clamped = source.clamp_span(&label.span);
            LabeledSpan::new_primary_with_span(
                Some(label.message.clone()),
                (clamped.start, clamped.end - clamped.start),
            )
        })
        .collect();

    let built = BuiltDiagnostic {
        message: diag.message.clone(),
        code: diag.code.clone(),
        help: diag.help.clone(),
        labels,
        notes: diag.notes.clone(),
    };

    let report = Report::new(built);
    match &source.name {
        Some(name) => {
            report.with_source_code(miette::NamedSource::new(name, source.content.clone()))
        }
        None => report.with_source_code(source.content.clone()),
    }
}

#[derive(Debug)]
struct BuiltDiagnostic {
    message: String,
    code: Option<String>,
    help: Option<String>,
    labels: Vec<LabeledSpan>,
    notes: Vec<String>,
}

impl fmt::Display for BuiltDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\nnote: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuiltDiagnostic {}

impl Diagnostic for BuiltDiagnostic {
    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.code
            .as_ref()
            .map(|code| Box::new(code) as Box<dyn fmt::Display>)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        if self.labels.is_empty() {
            None
        } else {
            Some(Box::new(self.labels.clone().into_iter()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diag_builder() {
        let diag = Diag::error("unknown opcode")
            .with_label(4..7, "here")
            .with_help("valid opcodes are listed in the instruction table")
            .with_code("asm::unknown_opcode");

        assert_eq!(diag.message, "unknown opcode");
        assert_eq!(diag.labels.len(), 1);
        assert_eq!(diag.labels[0].span, 4..7);
        assert_eq!(diag.code.as_deref(), Some("asm::unknown_opcode"));
    }

    #[test]
    fn diag_display_is_message() {
        let diag = Diag::error("duplicate label").with_note("first defined above");
        assert_eq!(diag.to_string(), "duplicate label");
    }

    #[test]
    fn clamp_span_bounds() {
        let src = SourceFile::new("beq $1, $2, far");
        assert_eq!(src.clamp_span(&(0..100)), 0..15);
        assert_eq!(src.clamp_span(&(20..30)), 15..15);
        assert_eq!(src.clamp_span(&(4..6)), 4..6);
    }

    #[test]
    fn to_report_with_out_of_bounds_span() {
        let src = SourceFile::new("short");
        let diag = Diag::error("boom").with_label(0..100, "out of bounds");

        let report = to_report(&diag, &src);
        assert_eq!(report.to_string(), "boom");
    }

    #[test]
    fn to_report_carries_notes() {
        let src = SourceFile::with_name("x", "input.asm");
        let diag = Diag::error("bad").with_note("context");

        let report = to_report(&diag, &src);
        assert!(format!("{report}").contains("bad"));
    }
}
