//! Core data structures shared by the Tapeforge compiler and VM: the token
//! model, the grammar intermediate representation, the concrete syntax tree,
//! and the string interner used to cheaply compare rule and variable names.

pub mod cst;
pub mod error;
pub mod grammar;
pub mod interner;
pub mod token;

pub use cst::CstNode;
pub use error::CoreError;
pub use grammar::{CountType, Grammar, GrammarArena, GrammarNode, NodeId};
pub use interner::{Interner, Symbol};
pub use token::{Name, Span, Token, TokenKind, TokenPattern};
