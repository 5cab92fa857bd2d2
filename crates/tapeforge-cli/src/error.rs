//! Renders a fatal pipeline error as a single `annotate-snippets` block
//! pointing at the offending source line.
//!
//! Grounded on `plotnik-lib::diagnostics::printer::DiagnosticsPrinter`'s use
//! of the same crate, scaled down to the one-error-at-a-time shape this
//! CLI needs (the compiler/VM crates return `Err` on the first fatal error
//! rather than accumulating a list).

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

/// Extracts a byte-range span from an error, if it carries one — only
/// `tapeforge_compiler::Error::Syntax` currently does.
fn span_of(error: &tapeforge_compiler::Error) -> Option<(usize, usize)> {
    match error {
        tapeforge_compiler::Error::Syntax { span: Some(span), .. } => {
            Some((span.start as usize, span.end as usize))
        }
        _ => None,
    }
}

/// Renders a compiler error against `source`, falling back to a plain
/// one-line message when the error carries no span.
pub fn render_compiler_error(error: &tapeforge_compiler::Error, source: &str, path: &str) -> String {
    let message = error.to_string();
    let Some((start, end)) = span_of(error) else {
        return format!("error: {message}");
    };
    let limit = source.len().max(1);
    let end = end.max(start + 1).min(limit);
    let start = start.min(end.saturating_sub(1));
    render_snippet(&message, source, path, start, end)
}

/// Renders a VM error, which never carries a source span (it's detected at
/// expansion/run time, past the point where source positions are tracked),
/// as a plain one-line message.
pub fn render_vm_error(error: &tapeforge_vm::Error) -> String {
    format!("error: {error}")
}

fn render_snippet(message: &str, source: &str, path: &str, start: usize, end: usize) -> String {
    let renderer = Renderer::plain();
    let snippet = Snippet::source(source)
        .path(path)
        .line_start(1)
        .annotation(AnnotationKind::Primary.span(start..end).label(message));
    let group = Level::ERROR.primary_title(message).element(snippet);
    format!("{}", renderer.render(&[group]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_plain_message_when_no_span_is_present() {
        let error = tapeforge_compiler::Error::UndefinedMacro("frobnicate".to_string());
        let rendered = render_compiler_error(&error, "source text", "test.tf");
        assert!(rendered.contains("frobnicate"));
    }

    #[test]
    fn renders_a_vm_error_message() {
        let error = tapeforge_vm::Error::UndefinedMacro("bogus".to_string());
        let rendered = render_vm_error(&error);
        assert!(rendered.contains("bogus"));
    }
}
