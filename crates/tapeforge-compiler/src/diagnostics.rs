use tapeforge_core::Span;

/// Severity of a non-fatal diagnostic. Fatal conditions are returned as
/// `Err(Error)` directly (see `error.rs`); `Diagnostics` only accumulates
/// advisory notes collected while walking the tree (currently: none are
/// emitted by any pass, but the collector exists so passes can start adding
/// them without a signature change, mirroring `plotnik-lib`'s
/// `Diagnostics`/`DiagnosticsPrinter` split between "collect" and "print").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub severity: Severity,
    pub span: Option<Span>,
    pub message: String,
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {} (at {}..{})", self.severity, self.message, span.start, span.end),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, span: Option<Span>, message: impl Into<String>) {
        self.messages.push(DiagnosticMessage {
            severity,
            span,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }
}
