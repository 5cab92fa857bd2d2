/// Invariant violations detectable purely from the data model itself, before
/// any compiler pass runs (e.g. a grammar referencing an undeclared rule).
/// The richer taxonomy (`SyntaxError`, `TypeError`, ...) lives in
/// `tapeforge-compiler`, which is where those errors are actually raised.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("rule `{0}` is referenced but never defined")]
    UndefinedRule(String),
    #[error("duplicate rule name `{0}` in grammar")]
    DuplicateRule(String),
}
