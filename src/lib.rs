// CloudLang Interpreter Library
//
// A small expression-oriented language with first-class functions and
// closures: lexer, Pratt parser, and a tree-walking evaluator.

// Public modules
pub mod ast;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{BlockStatement, Expr, Identifier, Program, Stmt};
pub use environment::{Env, Environment};
pub use error::{EvalError, ParseError, Span};
pub use evaluator::{evaluate, Evaluator, Node};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use value::Object;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
