//! WSL output and tokenizing.
//!
//! [`WslEmitter`] renders a loaded document as WSL; [`Lexer`] splits WSL text
//! back into tokens.

mod emitter;
mod lexer;

pub use emitter::{to_wsl_string, wsl_local_name, WslEmitter, WslOptions, DECLARATION_MARKER};
pub use lexer::{Lexer, Token, TokenKind};
