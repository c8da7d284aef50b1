//! SQL front end
//!
//! This module turns SQL text into a statement tree:
//! - Tokens and the lexer
//! - The statement AST
//! - The recursive-descent parser

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::{parse_sql, Parser};
pub use token::Token;
