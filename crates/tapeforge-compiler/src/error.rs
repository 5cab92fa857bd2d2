use tapeforge_core::Span;

/// The compiler's error taxonomy, carried as data-bearing variants rather
/// than a flat string so that callers (the CLI's `annotate-snippets`
/// renderer, test assertions) can pattern-match on kind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unrecognized character {ch:?} at byte offset {offset}")]
    Lex { ch: char, offset: usize },

    #[error("invalid syntax: {message}")]
    Syntax { message: String, span: Option<Span> },

    #[error("left-recursion: recursion depth exceeded while matching rule `{rule}`")]
    LeftRecursion { rule: String },

    #[error("undefined macro `{0}`")]
    UndefinedMacro(String),

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("constant `{0}` is already declared")]
    DuplicateConstant(String),

    #[error("{what}: expected size {expected}, found size {found}")]
    SizeMismatch {
        what: String,
        expected: String,
        found: String,
    },

    #[error("wrong number of compile-time arguments to `{name}`: expected {expected}, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown type keyword `{0}`")]
    UnknownType(String),

    #[error("value error: {0}")]
    Value(String),
}

impl Error {
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax {
            message: message.into(),
            span: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
