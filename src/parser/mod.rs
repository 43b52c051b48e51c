//! Parser for the anchor expression language

pub mod ast;
pub mod bind;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use bind::{bind_expression, bind_guard, Scope};
pub use grammar::{parse_expression, parse_guard};
