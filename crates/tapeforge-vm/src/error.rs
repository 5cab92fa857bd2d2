/// Errors raised while expanding macro-language text into raw instructions,
/// or while executing the resulting program.
///
/// `tapeforge-isa`'s own lex/syntax errors pass straight through (the
/// expander has to parse macro text before it can walk it), and the
/// expander/interpreter add the kinds that only make sense once a program
/// is being built or run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] tapeforge_isa::MacroSyntaxError),

    #[error("undefined macro `{0}`")]
    UndefinedMacro(String),

    #[error("builtin `{0}` is recognized but not implemented by this expander")]
    UnimplementedBuiltin(String),

    #[error("builtin `{name}` expects {expected} argument(s), found {found}")]
    ArityMismatch { name: String, expected: usize, found: usize },

    #[error("pointer moved out of range (offset {offset}) while running the tape")]
    PointerOutOfRange { offset: i64 },

    #[error("tape of size {size} is too small to run this program (needs at least {needed})")]
    TapeTooSmall { size: usize, needed: usize },

    #[error("program ran for {0} steps without halting (fuel exhausted)")]
    FuelExhausted(u64),

    #[error("unmatched `{0}` in expanded instruction stream")]
    UnmatchedBracket(char),
}

pub type Result<T> = std::result::Result<T, Error>;
