//! Example: dump the tokens of a WSL document
//!
//! Reads WSL from stdin and prints every non-whitespace token as
//! `line:col:token`, stopping at the end of input or the first error.
//!
//! Usage: cargo run --example tokens < document.wsl

use std::io::{self, Read};

use xml_wsl::{Lexer, TokenKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    for token in Lexer::new(&input) {
        if token.kind != TokenKind::Whitespace {
            println!("{}:{}:{}", token.line, token.col + 1, token);
        }
        if token.kind == TokenKind::Error {
            std::process::exit(1);
        }
    }

    Ok(())
}
